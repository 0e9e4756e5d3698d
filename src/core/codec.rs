//! Shareable URL state: `FilterState` <-> flat query string.
//!
//! Fields at their default are omitted on encode and restored on decode.
//! Anything unparseable decodes to the field's default; a corrupt shared link
//! must never be an error.

use crate::config::catalog::CategoryCatalog;
use crate::domain::filters::{
    end_of_day, FilterState, Period, TagSet, WithChildren, Zone, ALL_SENTINEL,
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use std::sync::Arc;
use url::form_urlencoded;

pub const KEY_CATEGORIES: &str = "categories";
pub const KEY_ZONE: &str = "zone";
pub const KEY_PERIOD_FROM: &str = "periodFrom";
pub const KEY_PERIOD_TO: &str = "periodTo";
pub const KEY_TIME_SLOTS: &str = "timeSlots";
pub const KEY_BUDGETS: &str = "budgets";
pub const KEY_SPECIAL_PREFERENCES: &str = "specialPreferences";
pub const KEY_WITH_CHILDREN: &str = "withChildren";

#[derive(Debug, Clone)]
pub struct FilterCodec {
    catalog: Arc<CategoryCatalog>,
}

impl FilterCodec {
    pub fn new(catalog: Arc<CategoryCatalog>) -> Self {
        Self { catalog }
    }

    /// Canonical form of `filters`: what `decode(encode(filters))` returns.
    pub fn normalize(&self, filters: &FilterState) -> FilterState {
        filters.normalized_with(&self.catalog)
    }

    pub fn encode(&self, filters: &FilterState) -> String {
        let filters = self.normalize(filters);
        let mut out = form_urlencoded::Serializer::new(String::new());

        if !filters.categories.is_empty() {
            out.append_pair(KEY_CATEGORIES, &filters.categories.join());
        }
        if !filters.zone.is_default() {
            out.append_pair(KEY_ZONE, filters.zone.as_str());
        }
        if let Some(period) = &filters.period {
            out.append_pair(KEY_PERIOD_FROM, &format_timestamp(period.from));
            if let Some(to) = period.to {
                out.append_pair(KEY_PERIOD_TO, &format_timestamp(to));
            }
        }
        for (key, tags) in [
            (KEY_TIME_SLOTS, &filters.time_slots),
            (KEY_BUDGETS, &filters.budgets),
            (KEY_SPECIAL_PREFERENCES, &filters.special_preferences),
        ] {
            if !tags.is_empty() {
                out.append_pair(key, &tags.join());
            }
        }
        if filters.with_children == WithChildren::Yes {
            out.append_pair(KEY_WITH_CHILDREN, WithChildren::Yes.as_str());
        }

        out.finish()
    }

    /// Always returns a normalized state. Unknown keys are ignored; for a
    /// repeated key the first occurrence wins.
    pub fn decode(&self, query: &str) -> FilterState {
        let query = query.trim().trim_start_matches('?');
        let mut filters = FilterState::default();
        let mut period_from: Option<String> = None;
        let mut period_to: Option<String> = None;
        let mut seen: Vec<String> = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if seen.iter().any(|k| *k == key) {
                continue;
            }
            seen.push(key.to_string());

            match &*key {
                KEY_CATEGORIES => filters.categories = self.decode_categories(&value),
                KEY_ZONE => {
                    filters.zone = value.parse().unwrap_or_else(|_| {
                        tracing::warn!("Ignoring unknown zone '{}' in URL state", value);
                        Zone::default()
                    })
                }
                KEY_PERIOD_FROM => period_from = Some(value.into_owned()),
                KEY_PERIOD_TO => period_to = Some(value.into_owned()),
                KEY_TIME_SLOTS => filters.time_slots = decode_tags(&value),
                KEY_BUDGETS => filters.budgets = decode_tags(&value),
                KEY_SPECIAL_PREFERENCES => filters.special_preferences = decode_tags(&value),
                KEY_WITH_CHILDREN => {
                    filters.with_children = value.parse().unwrap_or_else(|_| {
                        tracing::warn!("Ignoring invalid withChildren '{}' in URL state", value);
                        WithChildren::default()
                    })
                }
                other => tracing::debug!("Ignoring unknown URL parameter '{}'", other),
            }
        }

        filters.period = decode_period(period_from.as_deref(), period_to.as_deref());
        self.normalize(&filters)
    }

    fn decode_categories(&self, value: &str) -> TagSet {
        let mut categories = TagSet::new();
        for token in split_tokens(value) {
            if token.eq_ignore_ascii_case(ALL_SENTINEL) {
                continue;
            }
            match self.catalog.resolve(token) {
                Some(canonical) => {
                    categories.insert(canonical);
                }
                None => tracing::warn!("Ignoring unknown category '{}' in URL state", token),
            }
        }
        categories
    }
}

fn split_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn decode_tags(value: &str) -> TagSet {
    split_tokens(value).collect::<TagSet>().without_sentinel()
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Copy)]
enum DayEdge {
    Start,
    End,
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
fn parse_timestamp(raw: &str, edge: DayEdge) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Some(match edge {
        DayEdge::Start => start,
        DayEdge::End => end_of_day(start),
    })
}

fn decode_period(from: Option<&str>, to: Option<&str>) -> Option<Period> {
    let Some(raw_from) = from else {
        if to.is_some() {
            tracing::warn!("Ignoring periodTo without periodFrom in URL state");
        }
        return None;
    };
    let Some(from) = parse_timestamp(raw_from, DayEdge::Start) else {
        tracing::warn!("Ignoring malformed periodFrom '{}' in URL state", raw_from);
        return None;
    };
    let to = to.and_then(|raw| {
        let parsed = parse_timestamp(raw, DayEdge::End);
        if parsed.is_none() {
            tracing::warn!("Ignoring malformed periodTo '{}' in URL state", raw);
        }
        parsed
    });
    Some(Period::new(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec() -> FilterCodec {
        FilterCodec::new(Arc::new(CategoryCatalog::default()))
    }

    #[test]
    fn test_default_filters_encode_to_empty_string() {
        assert_eq!(codec().encode(&FilterState::default()), "");
        let sentinel = FilterState::default().with_categories(["all"]);
        assert_eq!(codec().encode(&sentinel), "");
    }

    #[test]
    fn test_encode_keeps_insertion_order() {
        let filters = FilterState::default()
            .with_categories(["cultura", "cibo"])
            .with_zone(Zone::Rimini);
        assert_eq!(
            codec().encode(&filters),
            "categories=cultura%2Ccibo&zone=rimini"
        );
    }

    #[test]
    fn test_encode_period_as_iso_timestamps() {
        let from = Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 7, 10, 0, 0, 0).unwrap();
        let filters = FilterState::default().with_period(Period::new(from, Some(to)));
        assert_eq!(
            codec().encode(&filters),
            "periodFrom=2024-07-02T00%3A00%3A00.000Z&periodTo=2024-07-10T00%3A00%3A00.000Z"
        );
    }

    #[test]
    fn test_round_trip_equals_normalized() {
        let codec = codec();
        let from = Utc.with_ymd_and_hms(2024, 7, 2, 8, 15, 30).unwrap()
            + chrono::Duration::microseconds(1_234_567);
        let mut filters = FilterState::default()
            .with_categories(["all", "cibo", "Musei"])
            .with_zone(Zone::Cesenatico)
            .with_period(Period::starting(from))
            .with_children(WithChildren::Yes);
        filters.time_slots.insert("mattina");
        filters.budgets.insert("all");
        filters.special_preferences.insert("pet-friendly");
        filters.special_preferences.insert("accessibile");

        let decoded = codec.decode(&codec.encode(&filters));
        assert_eq!(decoded, codec.normalize(&filters));
        assert_eq!(decoded, filters.normalized());
        assert!(decoded.budgets.is_empty());
    }

    #[test]
    fn test_round_trip_respells_categories_like_normalize() {
        let codec = codec();
        let filters = FilterState::default().with_categories(["Cibo", "street food", "astronavi"]);

        let decoded = codec.decode(&codec.encode(&filters));
        assert_eq!(decoded, codec.normalize(&filters));
        assert_eq!(decoded.categories.join(), "cibo,Street Food");
        assert_eq!(codec.encode(&filters), codec.encode(&decoded));
    }

    #[test]
    fn test_round_trip_of_comma_tokens() {
        let codec = codec();
        let mut filters = FilterState::default();
        filters.time_slots.insert("sera,tardi");
        filters.budgets.insert("medio");

        let decoded = codec.decode(&codec.encode(&filters));
        assert_eq!(decoded, codec.normalize(&filters));
        assert_eq!(decoded.time_slots.len(), 2);
        assert_eq!(codec.encode(&filters), "timeSlots=sera%2Ctardi&budgets=medio");
    }

    #[test]
    fn test_round_trip_of_defaults() {
        let codec = codec();
        assert_eq!(codec.decode(&codec.encode(&FilterState::default())), FilterState::default());
    }

    #[test]
    fn test_decode_missing_keys_resolve_to_defaults() {
        let filters = codec().decode("?zone=ravenna");
        assert_eq!(filters.zone, Zone::Ravenna);
        assert!(filters.categories.is_empty());
        assert!(filters.period.is_none());
        assert_eq!(filters.with_children, WithChildren::No);
    }

    #[test]
    fn test_decode_ignores_unknown_keys_and_tokens() {
        let filters =
            codec().decode("utm_source=newsletter&categories=cibo,astronavi,all&zone=atlantide");
        assert_eq!(filters.categories, ["cibo"].into_iter().collect::<TagSet>());
        assert_eq!(filters.zone, Zone::AllZones);
    }

    #[test]
    fn test_malformed_dates_fail_closed() {
        let filters = codec().decode("periodFrom=not-a-date&periodTo=2024-07-10");
        assert!(filters.period.is_none());

        let filters = codec().decode("periodFrom=2024-07-02&periodTo=yesterday");
        let period = filters.period.unwrap();
        assert_eq!(period.from, Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap());
        assert_eq!(period.to, None);
    }

    #[test]
    fn test_decode_date_only_period_bounds() {
        let filters = codec().decode("periodFrom=2024-07-02&periodTo=2024-07-10");
        let period = filters.period.unwrap();
        assert_eq!(period.from, Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap());
        assert_eq!(period.end(), end_of_day(Utc.with_ymd_and_hms(2024, 7, 10, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_decode_canonicalizes_category_spelling() {
        let filters = codec().decode("categories=CIBO,street%20food");
        assert_eq!(filters.categories.join(), "cibo,Street Food");
    }
}
