//! Outbound HTTP with SSRF protection.
//!
//! Every hostname the client connects to (the original request and each
//! redirect hop) goes through [`GuardedResolver`], which rejects the lookup
//! when any resolved address is private or reserved. IP-literal hosts never
//! reach a resolver, so they are classified by URL validation before the
//! request and on every redirect.

mod client;
mod connector;
mod redirect;
mod resolver;

pub use client::{map_transport_error, SecureFetcher};
pub use connector::{resolve_checked, GuardedResolver};
pub use redirect::redirect_policy;
pub use resolver::TokioHostResolver;
