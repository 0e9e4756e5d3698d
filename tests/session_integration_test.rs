use httpmock::prelude::*;
use mia_romagna::core::fallback::ResultSource;
use mia_romagna::domain::filters::Zone;
use mia_romagna::{AppConfig, DiscoverySession, RestPoiStore, ResultsView};
use std::time::Duration;
use tokio::sync::watch;

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.endpoint = server.base_url();
    config.store.api_key = Some("anon-key".to_string());
    config.debounce.filters_ms = 30;
    config.debounce.map_bounds_ms = 30;
    config
}

fn session(config: &AppConfig, query: &str) -> DiscoverySession<RestPoiStore> {
    let store = RestPoiStore::from_config(&config.store).unwrap();
    DiscoverySession::start(config, store, query)
}

async fn wait_until(
    rx: &mut watch::Receiver<ResultsView>,
    done: impl Fn(&ResultsView) -> bool,
) -> ResultsView {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let view = rx.borrow_and_update();
                if done(&view) {
                    return view.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("view did not settle in time")
}

fn settled(view: &ResultsView) -> bool {
    view.request_id.is_some() && !view.loading
}

#[tokio::test]
async fn test_shared_url_loads_matching_cards() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/points_of_interest")
                .query_param("category", "in.(Ristoranti,Agriturismi,Cantine,\"Street Food\",Mercati)");
            then.status(200).json_body(serde_json::json!([
                {"id": "piadineria", "name": "Piadineria Lella", "category": "Street Food",
                 "latitude": 44.0594, "longitude": 12.5683, "avg_rating": 4.6}
            ]));
        })
        .await;

    let config = config(&server);
    let session = session(&config, "categories=cibo&utm_source=share");
    let mut rx = session.subscribe();
    let view = wait_until(&mut rx, settled).await;

    mock.assert_async().await;
    assert_eq!(view.source, ResultSource::Live);
    assert_eq!(session.query_string(), "categories=cibo");

    let model = session.view_model();
    assert_eq!(model.cards.len(), 1);
    assert_eq!(model.cards[0].title, "Piadineria Lella");
    assert_eq!(model.markers.len(), 1);
    assert!(!model.showing_fallback);
}

#[tokio::test]
async fn test_empty_unfiltered_result_falls_back() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/points_of_interest");
            then.status(200).json_body(serde_json::json!([]));
        })
        .await;

    let config = config(&server);
    let session = session(&config, "");
    let mut rx = session.subscribe();
    let view = wait_until(&mut rx, settled).await;

    assert_eq!(view.source, ResultSource::Fallback);
    assert!(!view.pois.is_empty());
    assert!(session.view_model().showing_fallback);
}

#[tokio::test]
async fn test_equivalent_filters_do_not_query_again() {
    let server = MockServer::start_async().await;
    let food = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/points_of_interest")
                .query_param_exists("category");
            then.status(200).json_body(serde_json::json!([
                {"id": "cantina", "name": "Cantina", "category": "Cantine",
                 "latitude": 44.28, "longitude": 11.88}
            ]));
        })
        .await;
    let rimini = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/points_of_interest")
                .query_param("latitude", "gte.43.98");
            then.status(200).json_body(serde_json::json!([
                {"id": "ponte", "name": "Ponte di Tiberio", "category": "Monumenti",
                 "latitude": 44.0627, "longitude": 12.5630}
            ]));
        })
        .await;

    let config = config(&server);
    let session = session(&config, "categories=cibo,cultura");
    let mut rx = session.subscribe();
    let first = wait_until(&mut rx, settled).await;
    food.assert_hits_async(1).await;

    // same set in a different order hashes the same
    session.edit(|f| {
        f.categories.remove("cibo");
        f.categories.insert("cibo");
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    food.assert_hits_async(1).await;
    assert_eq!(session.results().request_id, first.request_id);

    session.edit(|f| {
        f.categories = Default::default();
        f.zone = Zone::Rimini;
    });
    let view = wait_until(&mut rx, |v| settled(v) && v.request_id != first.request_id).await;

    rimini.assert_hits_async(1).await;
    food.assert_hits_async(1).await;
    assert_eq!(view.pois[0].id, "ponte");
    assert_eq!(session.query_string(), "zone=rimini");
}

#[tokio::test]
async fn test_failure_keeps_previous_results_and_retry_recovers() {
    let server = MockServer::start_async().await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/points_of_interest");
            then.status(200).json_body(serde_json::json!([
                {"id": "rocca", "name": "Rocca Malatestiana", "category": "Monumenti",
                 "latitude": 44.1396, "longitude": 12.2464}
            ]));
        })
        .await;

    let config = config(&server);
    let session = session(&config, "");
    let mut rx = session.subscribe();
    let first = wait_until(&mut rx, settled).await;
    assert_eq!(first.pois.len(), 1);

    ok.delete_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/points_of_interest");
            then.status(500).body("boom");
        })
        .await;

    session.edit(|f| f.zone = Zone::Cesena);
    let failed = wait_until(&mut rx, |v| settled(v) && v.error.is_some()).await;
    failing.assert_hits_async(1).await;
    assert_eq!(failed.pois, first.pois);
    assert!(session.view_model().error_banner.is_some());

    failing.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/points_of_interest")
                .query_param("latitude", "gte.44.08");
            then.status(200).json_body(serde_json::json!([]));
        })
        .await;

    session.retry().await.unwrap();
    let recovered = session.results();
    assert!(recovered.error.is_none());
    assert!(recovered.pois.is_empty());
    assert_eq!(recovered.source, ResultSource::Live);
    assert!(session.view_model().empty);
}
