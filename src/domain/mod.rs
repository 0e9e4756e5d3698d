// Domain layer: filter and POI models plus the port to the external data store.

pub mod filters;
pub mod model;
pub mod ports;
