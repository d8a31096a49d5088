pub mod filter;
pub mod record;

pub use filter::{facets, Facets, RecordFilter, StatusFilter};
pub use record::{Dataset, DatasetStats, Locale, Record};
