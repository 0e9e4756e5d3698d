use crate::core::fallback::ResultSource;
use crate::core::orchestrator::ResultsView;
use crate::domain::filters::GeoBounds;
use crate::domain::model::Poi;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub address: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
    pub rating: Option<f64>,
    pub dates: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub name: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Read-only projection of the orchestrator's results for the card carousel
/// and the map. Both are built from the same `ResultsView`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryViewModel {
    pub cards: Vec<PoiCard>,
    pub markers: Vec<MapMarker>,
    pub showing_fallback: bool,
    pub loading: bool,
    pub error_banner: Option<String>,
    pub empty: bool,
}

fn date_label(poi: &Poi) -> Option<String> {
    let (start, end) = poi.time_window()?;
    let start_label = start.format("%d/%m/%Y").to_string();
    let end_label = end.format("%d/%m/%Y").to_string();
    if start_label == end_label {
        Some(start_label)
    } else {
        Some(format!("{} - {}", start_label, end_label))
    }
}

impl PoiCard {
    fn from_poi(poi: &Poi) -> Self {
        Self {
            id: poi.id.clone(),
            title: poi.name.clone(),
            category: poi.category.clone(),
            address: poi.address.clone(),
            image: poi.images.first().cloned(),
            price: poi.price_info.clone(),
            rating: poi.avg_rating,
            dates: date_label(poi),
        }
    }
}

impl DiscoveryViewModel {
    /// Markers are limited to POIs with usable coordinates inside `viewport`
    /// (all of them when there is no viewport yet).
    pub fn build(view: &ResultsView, viewport: Option<&GeoBounds>) -> Self {
        let cards = view.pois.iter().map(PoiCard::from_poi).collect();
        let markers = view
            .pois
            .iter()
            .filter(|poi| poi.has_valid_coordinates())
            .filter(|poi| viewport.map_or(true, |b| b.contains(poi.latitude, poi.longitude)))
            .map(|poi| MapMarker {
                id: poi.id.clone(),
                name: poi.name.clone(),
                category: poi.category.clone(),
                latitude: poi.latitude,
                longitude: poi.longitude,
            })
            .collect();

        Self {
            cards,
            markers,
            showing_fallback: view.source == ResultSource::Fallback,
            loading: view.loading,
            error_banner: view.error.clone(),
            empty: view.pois.is_empty() && !view.loading && view.source != ResultSource::Pending,
        }
    }
}
