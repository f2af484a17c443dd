//! Guarded Fetch Domain Layer
pub mod config;
pub mod content;
pub mod errors;
pub mod ip_classifier;
pub mod page_metadata;
pub mod security_options;
pub mod url_policy;

pub use config::{CliOverrides, Config, ConfigError};
pub use content::{
    ContentFormat, ContentKind, FetchRequest, FetchedResource, ValidatedImage, MAX_DOCUMENT_BYTES,
    MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION, MAX_IMAGE_PIXELS,
};
pub use errors::FetchError;
pub use ip_classifier::{classify, is_private_or_reserved, IpClassification};
pub use page_metadata::PageMetadata;
pub use security_options::SecurityOptions;
pub use url_policy::validate_url;
