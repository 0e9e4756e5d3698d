pub mod session;
pub mod view_model;

pub use session::DiscoverySession;
pub use view_model::{DiscoveryViewModel, MapMarker, PoiCard};
