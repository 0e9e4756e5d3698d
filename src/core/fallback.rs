//! Decides between real results and the static fallback list.

use crate::domain::filters::FilterState;
use crate::domain::model::{Poi, TargetAudience};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Nothing has settled yet.
    #[default]
    Pending,
    Live,
    Cached,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    fallback: Arc<Vec<Poi>>,
}

impl FallbackPolicy {
    pub fn new(fallback: Vec<Poi>) -> Self {
        Self {
            fallback: Arc::new(fallback),
        }
    }

    pub fn fallback(&self) -> &[Poi] {
        &self.fallback
    }

    /// The fallback list replaces an empty result only when nothing was
    /// filtered. A narrowed query that matched nothing stays empty.
    pub fn resolve(
        &self,
        results: Vec<Poi>,
        filters: &FilterState,
        source: ResultSource,
    ) -> (Vec<Poi>, ResultSource) {
        if results.is_empty() && !filters.has_active_restriction() && !self.fallback.is_empty() {
            tracing::info!(
                "Store returned no points of interest for unfiltered query, showing {} fallback entries",
                self.fallback.len()
            );
            return (self.fallback.as_ref().clone(), ResultSource::Fallback);
        }
        (results, source)
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(default_fallback_pois())
    }
}

/// A handful of well-known places shown when the store has nothing to offer.
pub fn default_fallback_pois() -> Vec<Poi> {
    let entry = |id: &str,
                 name: &str,
                 category: &str,
                 latitude: f64,
                 longitude: f64,
                 address: &str,
                 description: &str| Poi {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        category: category.to_string(),
        latitude,
        longitude,
        address: Some(address.to_string()),
        target_audience: Some(TargetAudience::Everyone),
        images: Vec::new(),
        price_info: None,
        avg_rating: None,
        start_datetime: None,
        end_datetime: None,
    };

    vec![
        entry(
            "fallback-ponte-tiberio",
            "Ponte di Tiberio",
            "Monumenti",
            44.0627,
            12.5630,
            "Corso d'Augusto, Rimini",
            "Roman bridge completed in 21 AD, still open to traffic.",
        ),
        entry(
            "fallback-san-vitale",
            "Basilica di San Vitale",
            "Chiese",
            44.4206,
            12.1966,
            "Via San Vitale 17, Ravenna",
            "Sixth-century basilica with Byzantine mosaics.",
        ),
        entry(
            "fallback-porto-canale",
            "Porto Canale Leonardesco",
            "Borghi",
            44.1996,
            12.3990,
            "Cesenatico",
            "Harbour canal with the floating maritime museum.",
        ),
        entry(
            "fallback-rocca-malatestiana",
            "Rocca Malatestiana",
            "Monumenti",
            44.1365,
            12.2430,
            "Via Cia degli Ordelaffi 8, Cesena",
            "Fortress overlooking the old town.",
        ),
        entry(
            "fallback-saline-cervia",
            "Salina di Cervia",
            "Riserve Naturali",
            44.2440,
            12.3330,
            "Via Bova 61, Cervia",
            "Salt pans and nature reserve with flamingos.",
        ),
    ]
}
