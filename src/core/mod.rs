pub mod cache;
pub mod codec;
pub mod debounce;
pub mod fallback;
pub mod hasher;
pub mod orchestrator;
pub mod query;

pub use cache::QueryCache;
pub use codec::FilterCodec;
pub use debounce::DebouncedStore;
pub use fallback::{FallbackPolicy, ResultSource};
pub use hasher::{FilterHash, StableHash};
pub use orchestrator::{FetchOutcome, PoiQueryOrchestrator, ResultsView};
pub use query::PoiQuery;
