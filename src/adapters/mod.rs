// Adapters layer: concrete implementations of the data store port.

pub mod memory_store;
pub mod rest_store;

pub use memory_store::InMemoryPoiStore;
pub use rest_store::RestPoiStore;
