use crate::domain::filters::FilterState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    Families,
    Everyone,
    Adults,
    Couples,
    #[serde(other)]
    Other,
}

impl TargetAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetAudience::Families => "families",
            TargetAudience::Everyone => "everyone",
            TargetAudience::Adults => "adults",
            TargetAudience::Couples => "couples",
            TargetAudience::Other => "other",
        }
    }
}

/// A point of interest as served by the data store. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub target_audience: Option<TargetAudience>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price_info: Option<String>,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
}

impl Poi {
    /// Event window, with a missing bound collapsed onto the other one.
    pub fn time_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_datetime, self.end_datetime) {
            (None, None) => None,
            (Some(start), Some(end)) => Some((start, end)),
            (Some(at), None) | (None, Some(at)) => Some((at, at)),
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// One issued query for a stabilized filter snapshot.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub filters: FilterState,
    pub request_id: RequestId,
    pub issued_at: DateTime<Utc>,
}

impl QueryRequest {
    pub fn new(request_id: RequestId, filters: FilterState) -> Self {
        Self {
            filters,
            request_id,
            issued_at: Utc::now(),
        }
    }
}
