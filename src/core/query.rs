//! Translation of a filter snapshot into clauses the data store understands.
//!
//! Clauses compose conjunctively; a `None` clause is always true.

use crate::config::catalog::CategoryCatalog;
use crate::domain::filters::{FilterState, GeoBounds, WithChildren};
use crate::domain::model::{Poi, TargetAudience};
use chrono::{DateTime, Utc};

/// Audiences accepted when the user travels with children.
pub const CHILD_FRIENDLY_AUDIENCES: [TargetAudience; 2] =
    [TargetAudience::Families, TargetAudience::Everyone];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// POIs without time bounds always match; otherwise the intervals must overlap.
    pub fn admits(&self, poi: &Poi) -> bool {
        match poi.time_window() {
            None => true,
            Some((start, end)) => start <= self.to && end >= self.from,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoiQuery {
    pub categories: Option<Vec<String>>,
    pub audiences: Option<Vec<TargetAudience>>,
    pub window: Option<TimeWindow>,
    pub bounds: Option<GeoBounds>,
    pub limit: Option<usize>,
}

impl PoiQuery {
    pub fn from_filters(filters: &FilterState, catalog: &CategoryCatalog) -> Self {
        let filters = filters.normalized();

        let mut categories: Vec<String> = Vec::new();
        for tag in filters.categories.iter() {
            for category in catalog.expand(tag) {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
        }

        let audiences = match filters.with_children {
            WithChildren::Yes => Some(CHILD_FRIENDLY_AUDIENCES.to_vec()),
            WithChildren::No => None,
        };

        let window = filters.period.map(|period| TimeWindow {
            from: period.from,
            to: period.end(),
        });

        Self {
            categories: (!categories.is_empty()).then_some(categories),
            audiences,
            window,
            bounds: filters.zone.bounds(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.categories.is_none()
            && self.audiences.is_none()
            && self.window.is_none()
            && self.bounds.is_none()
    }

    /// Local evaluation of the same clauses the remote store applies.
    pub fn matches(&self, poi: &Poi) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.iter().any(|c| *c == poi.category) {
                return false;
            }
        }
        if let Some(audiences) = &self.audiences {
            match poi.target_audience {
                Some(audience) if audiences.contains(&audience) => {}
                _ => return false,
            }
        }
        if let Some(window) = &self.window {
            if !window.admits(poi) {
                return false;
            }
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.contains(poi.latitude, poi.longitude) {
                return false;
            }
        }
        true
    }
}
