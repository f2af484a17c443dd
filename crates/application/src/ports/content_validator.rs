use bytes::Bytes;
use guarded_fetch_domain::{FetchError, SecurityOptions, ValidatedImage};

/// Validates an image body before it is handed to callers.
///
/// CPU bound; async callers should run it on a blocking thread.
pub trait ContentValidatorPort: Send + Sync {
    fn validate(
        &self,
        body: &Bytes,
        declared_type: Option<&str>,
        options: &SecurityOptions,
    ) -> Result<ValidatedImage, FetchError>;
}
