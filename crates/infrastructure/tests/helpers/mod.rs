#![allow(dead_code)]

mod images;
mod mock_resolver;
mod redirect_server;

pub use images::*;
pub use mock_resolver::MockHostResolver;
pub use redirect_server::spawn_redirect_server;
