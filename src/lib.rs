pub mod config;
pub mod errors;
pub mod export;
pub mod extractor;
pub mod fetcher;
pub mod patterns;
pub mod pipeline;
pub mod ratelimit;
pub mod record;
pub mod registry;
pub mod renderer;
pub mod requests;
pub mod scraping_context;
pub mod store;
mod text_manipulators;

pub use config::ScrapingConfig;
pub use extractor::extract;
pub use fetcher::{ContentFetcher, FetchedContent, HttpFetcher};
pub use patterns::{BankPatterns, FieldPattern, PatternTable};
pub use pipeline::RunSummary;
pub use record::{CanonicalField, ExtractionRecord, FieldValues};
pub use registry::{ExtractionMode, SourceDescriptor, SourceRegistry};
pub use scraping_context::ScrapingContext;
pub use store::RecordStore;
