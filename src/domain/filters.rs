//! Filter state the user edits, plus the closed enumerations it is built from.

use crate::config::catalog::CategoryCatalog;
use chrono::{DateTime, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token meaning "no restriction" inside any tag set.
pub const ALL_SENTINEL: &str = "all";

/// Ordered set of tag tokens.
///
/// Iteration follows insertion order so encoded URLs stay stable, while
/// equality ignores order: `{a, b}` and `{b, a}` are the same selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token unless it is blank or already present.
    ///
    /// `,` separates tokens in URL state, so `"a,b"` adds `a` and `b`.
    /// Returns true when anything was added.
    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        let mut added = false;
        for part in token.split(',').map(str::trim) {
            if part.is_empty() || self.contains(part) {
                continue;
            }
            self.0.push(part.to_string());
            added = true;
        }
        added
    }

    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != token);
        before != self.0.len()
    }

    /// Adds the token if absent, removes it otherwise.
    pub fn toggle(&mut self, token: &str) {
        if !self.remove(token) {
            self.insert(token);
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the set imposes no restriction (empty or only the "all" sentinel).
    pub fn is_unrestricted(&self) -> bool {
        self.iter().all(|t| t.eq_ignore_ascii_case(ALL_SENTINEL))
    }

    /// Drops the "all" sentinel; a set holding only the sentinel becomes empty.
    ///
    /// Tokens are re-inserted, so sets deserialized with `,` inside a token
    /// come out split.
    pub fn without_sentinel(&self) -> Self {
        self.iter()
            .filter(|t| !t.eq_ignore_ascii_case(ALL_SENTINEL))
            .collect()
    }

    pub fn sorted(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.iter().collect();
        tokens.sort_unstable();
        tokens
    }

    /// Comma-joined tokens in insertion order.
    pub fn join(&self) -> String {
        self.0.join(",")
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }
}

impl Eq for TagSet {}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for token in iter {
            set.insert(token);
        }
        set
    }
}

/// Geographic zone of the Romagna coast and hinterland.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zone {
    #[default]
    AllZones,
    Rimini,
    Riccione,
    Cattolica,
    Bellaria,
    Cesenatico,
    Cervia,
    Ravenna,
    Forli,
    Cesena,
    Faenza,
    Entroterra,
}

impl Zone {
    pub const ALL: [Zone; 12] = [
        Zone::AllZones,
        Zone::Rimini,
        Zone::Riccione,
        Zone::Cattolica,
        Zone::Bellaria,
        Zone::Cesenatico,
        Zone::Cervia,
        Zone::Ravenna,
        Zone::Forli,
        Zone::Cesena,
        Zone::Faenza,
        Zone::Entroterra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::AllZones => "all-zones",
            Zone::Rimini => "rimini",
            Zone::Riccione => "riccione",
            Zone::Cattolica => "cattolica",
            Zone::Bellaria => "bellaria",
            Zone::Cesenatico => "cesenatico",
            Zone::Cervia => "cervia",
            Zone::Ravenna => "ravenna",
            Zone::Forli => "forli",
            Zone::Cesena => "cesena",
            Zone::Faenza => "faenza",
            Zone::Entroterra => "entroterra",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Zone::AllZones
    }

    /// Approximate bounding box used to restrict results to the zone.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let (south, west, north, east) = match self {
            Zone::AllZones => return None,
            Zone::Rimini => (43.98, 12.45, 44.12, 12.65),
            Zone::Riccione => (43.97, 12.62, 44.02, 12.70),
            Zone::Cattolica => (43.93, 12.68, 43.99, 12.76),
            Zone::Bellaria => (44.12, 12.40, 44.18, 12.50),
            Zone::Cesenatico => (44.16, 12.35, 44.23, 12.43),
            Zone::Cervia => (44.22, 12.30, 44.31, 12.38),
            Zone::Ravenna => (44.30, 12.10, 44.55, 12.35),
            Zone::Forli => (44.15, 11.95, 44.28, 12.12),
            Zone::Cesena => (44.08, 12.18, 44.20, 12.32),
            Zone::Faenza => (44.24, 11.82, 44.33, 11.95),
            Zone::Entroterra => (43.70, 11.60, 44.10, 12.45),
        };
        Some(GeoBounds {
            south,
            west,
            north,
            east,
        })
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Zone::ALL
            .into_iter()
            .find(|z| z.as_str().eq_ignore_ascii_case(token))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithChildren {
    Yes,
    #[default]
    No,
}

impl WithChildren {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithChildren::Yes => "yes",
            WithChildren::No => "no",
        }
    }
}

impl FromStr for WithChildren {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "si" => Ok(WithChildren::Yes),
            "no" | "false" => Ok(WithChildren::No),
            _ => Err(()),
        }
    }
}

/// Requested date interval. A missing `to` means the end of `from`'s day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

impl Period {
    pub fn new(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn starting(from: DateTime<Utc>) -> Self {
        Self { from, to: None }
    }

    /// Inclusive upper bound of the interval.
    pub fn end(&self) -> DateTime<Utc> {
        self.to.unwrap_or_else(|| end_of_day(self.from))
    }

    /// Millisecond precision, `to` dropped when it is implied or precedes `from`.
    pub fn normalized(&self) -> Self {
        let from = self.from.trunc_subsecs(3);
        let to = self
            .to
            .map(|to| to.trunc_subsecs(3))
            .filter(|to| *to >= from && *to != end_of_day(from));
        Self { from, to }
    }
}

pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| dt.and_utc())
        .unwrap_or(at)
}

/// Rectangular WGS84 area, used for zones and the map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

/// Everything the user can narrow results by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub categories: TagSet,
    pub zone: Zone,
    pub period: Option<Period>,
    pub time_slots: TagSet,
    pub budgets: TagSet,
    pub special_preferences: TagSet,
    pub with_children: WithChildren,
}

impl FilterState {
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_children(mut self, with_children: WithChildren) -> Self {
        self.with_children = with_children;
        self
    }

    /// Collapses default-equivalent representations into one canonical form.
    ///
    /// Category spelling is left alone; see [`normalized_with`](Self::normalized_with).
    pub fn normalized(&self) -> Self {
        Self {
            categories: self.categories.without_sentinel(),
            zone: self.zone,
            period: self.period.map(|p| p.normalized()),
            time_slots: self.time_slots.without_sentinel(),
            budgets: self.budgets.without_sentinel(),
            special_preferences: self.special_preferences.without_sentinel(),
            with_children: self.with_children,
        }
    }

    /// Canonical form under `catalog`: categories take the catalog's spelling
    /// and tokens the catalog does not know are dropped. Equal results here
    /// mean the same URL, the same hash and the same store query.
    pub fn normalized_with(&self, catalog: &CategoryCatalog) -> Self {
        let mut filters = self.normalized();
        filters.categories = catalog.canonicalize(&filters.categories);
        filters
    }

    /// True when at least one field narrows the result set.
    pub fn has_active_restriction(&self) -> bool {
        !self.categories.is_unrestricted()
            || !self.zone.is_default()
            || self.period.is_some()
            || !self.time_slots.is_unrestricted()
            || !self.budgets.is_unrestricted()
            || !self.special_preferences.is_unrestricted()
            || self.with_children == WithChildren::Yes
    }
}
