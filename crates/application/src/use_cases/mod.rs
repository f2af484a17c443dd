mod fetch_document;
mod fetch_image;
mod fetch_page_metadata;

pub use fetch_document::FetchDocumentUseCase;
pub use fetch_image::FetchImageUseCase;
pub use fetch_page_metadata::FetchPageMetadataUseCase;
