use crate::core::query::PoiQuery;
use crate::domain::model::Poi;
use crate::domain::ports::PoiStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Evaluates queries locally over a fixed list of POIs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoiStore {
    pois: Vec<Poi>,
}

impl InMemoryPoiStore {
    pub fn new(pois: Vec<Poi>) -> Self {
        Self { pois }
    }

    /// Loads a JSON array of POI records, as exported from the store.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let pois: Vec<Poi> = serde_json::from_slice(&data)?;
        Ok(Self::new(pois))
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }
}

#[async_trait]
impl PoiStore for InMemoryPoiStore {
    async fn query(&self, query: &PoiQuery) -> Result<Vec<Poi>> {
        let mut matched: Vec<Poi> = self
            .pois
            .iter()
            .filter(|poi| query.matches(poi))
            .cloned()
            .collect();

        // same ordering the remote store applies: best rated first, unrated last
        matched.sort_by(|a, b| {
            let a = a.avg_rating.unwrap_or(f64::NEG_INFINITY);
            let b = b.avg_rating.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
