pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{InMemoryPoiStore, RestPoiStore};
pub use app::{DiscoverySession, DiscoveryViewModel};
pub use config::{AppConfig, CategoryCatalog};
pub use core::{FallbackPolicy, FilterCodec, PoiQueryOrchestrator, ResultsView};
pub use domain::filters::FilterState;
pub use domain::ports::PoiStore;
pub use utils::error::{DiscoveryError, Result};
