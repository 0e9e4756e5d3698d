//! PostgREST-style HTTP access to the hosted POI table.

use crate::config::toml_config::StoreConfig;
use crate::core::query::{PoiQuery, TimeWindow};
use crate::domain::filters::GeoBounds;
use crate::domain::model::Poi;
use crate::domain::ports::PoiStore;
use crate::utils::error::{DiscoveryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;

pub struct RestPoiStore {
    client: Client,
    table_url: String,
    api_key: Option<String>,
}

impl RestPoiStore {
    pub fn new(endpoint: &str, table: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", endpoint.trim_end_matches('/'), table),
            api_key,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            &config.table,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }
}

/// PostgREST reserves `,.:()"` and whitespace inside list and logic filters.
fn quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain && !value.is_empty() {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    quote(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn in_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let items: Vec<String> = values.into_iter().map(quote).collect();
    format!("in.({})", items.join(","))
}

/// Undated POIs, or an event window overlapping `window` (a missing bound
/// collapses onto the other one).
fn window_clause(window: &TimeWindow) -> String {
    let from = timestamp(window.from);
    let to = timestamp(window.to);
    format!(
        "(and(start_datetime.is.null,end_datetime.is.null),\
         and(start_datetime.lte.{to},end_datetime.gte.{from}),\
         and(end_datetime.is.null,start_datetime.gte.{from},start_datetime.lte.{to}),\
         and(start_datetime.is.null,end_datetime.gte.{from},end_datetime.lte.{to}))"
    )
}

fn bounds_params(bounds: &GeoBounds, params: &mut Vec<(String, String)>) {
    params.push(("latitude".to_string(), format!("gte.{}", bounds.south)));
    params.push(("latitude".to_string(), format!("lte.{}", bounds.north)));
    params.push(("longitude".to_string(), format!("gte.{}", bounds.west)));
    params.push(("longitude".to_string(), format!("lte.{}", bounds.east)));
}

/// Query-string parameters for a `PoiQuery`, in a stable order.
pub fn query_params(query: &PoiQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    if let Some(categories) = &query.categories {
        params.push((
            "category".to_string(),
            in_list(categories.iter().map(String::as_str)),
        ));
    }
    if let Some(audiences) = &query.audiences {
        params.push((
            "target_audience".to_string(),
            in_list(audiences.iter().map(|a| a.as_str())),
        ));
    }
    if let Some(window) = &query.window {
        params.push(("or".to_string(), window_clause(window)));
    }
    if let Some(bounds) = &query.bounds {
        bounds_params(bounds, &mut params);
    }

    params.push(("order".to_string(), "avg_rating.desc.nullslast".to_string()));
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl PoiStore for RestPoiStore {
    async fn query(&self, query: &PoiQuery) -> Result<Vec<Poi>> {
        let params = query_params(query);
        tracing::debug!("Querying {} with {} parameters", self.table_url, params.len());

        let mut request = self.client.get(&self.table_url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Store response status: {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::StoreError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let pois: Vec<Poi> = serde_json::from_slice(&body)?;
        Ok(pois)
    }
}
