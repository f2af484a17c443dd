mod fetch;
mod use_cases;

pub use fetch::FetchServices;
pub use use_cases::UseCases;
