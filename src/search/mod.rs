

pub mod cache;
pub mod engine;
pub mod excluding;
pub mod models;
pub mod summary;

pub use cache::{CacheStats, CachedSearch, SearchCache};
pub use engine::{ComponentSearch, SemanticSearchEngine};
pub use excluding::ExcludingSearch;
pub use models::{CostRange, SearchHit, SearchQuery};
pub use summary::SearchSummary;
