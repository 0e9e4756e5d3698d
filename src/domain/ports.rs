use crate::core::query::PoiQuery;
use crate::domain::model::Poi;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read side of the external POI table.
///
/// Dropping the returned future is the transport-level cancellation signal;
/// implementations need not do anything else for it.
#[async_trait]
pub trait PoiStore: Send + Sync {
    async fn query(&self, query: &PoiQuery) -> Result<Vec<Poi>>;
}
