use anyhow::Context;
use clap::Parser;
use mia_romagna::adapters::rest_store;
use mia_romagna::config::LogFormat;
use mia_romagna::core::hasher::StableHash;
use mia_romagna::core::orchestrator::FetchOutcome;
use mia_romagna::utils::error::{DiscoveryError, ErrorSeverity};
use mia_romagna::utils::{logger, validation::Validate};
use mia_romagna::{
    AppConfig, CliConfig, DiscoveryViewModel, FallbackPolicy, FilterCodec, InMemoryPoiStore,
    PoiQueryOrchestrator, PoiStore, RestPoiStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => AppConfig::default(),
    };

    let log_format = if cli.log_json {
        LogFormat::Json
    } else {
        config.logging.format
    };
    logger::init_logger(&config.logging, log_format, cli.verbose);

    tracing::info!("Starting mia-romagna CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let catalog = Arc::new(config.catalog());
    let codec = FilterCodec::new(Arc::clone(&catalog));
    let filters = codec.decode(&cli.query);
    let canonical = codec.encode(&filters);
    let hash = filters.stable_hash();
    tracing::info!("Filters: '{}' (hash {})", canonical, hash);

    let fallback = if config.fallback.is_empty() {
        FallbackPolicy::default()
    } else {
        FallbackPolicy::new(config.fallback.clone())
    };

    if cli.dry_run {
        let orchestrator = PoiQueryOrchestrator::new(InMemoryPoiStore::default(), catalog, fallback)
            .with_max_results(config.store.max_results);
        let query = orchestrator.query_for(&filters);
        println!("query: {}", canonical);
        println!("hash: {}", hash);
        for (key, value) in rest_store::query_params(&query) {
            println!("  {}={}", key, value);
        }
        return Ok(());
    }

    let result = match &cli.data {
        Some(path) => {
            let store = InMemoryPoiStore::from_json_file(path)
                .with_context(|| format!("failed to read POIs from {}", path))?;
            tracing::info!("Loaded {} POIs from {}", store.len(), path);
            run(store, &config, catalog, fallback, filters, cli.json).await
        }
        None => {
            let store = RestPoiStore::from_config(&config.store)?;
            run(store, &config, catalog, fallback, filters, cli.json).await
        }
    };

    if let Err(e) = result {
        tracing::error!(
            "Query failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        eprintln!("Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run<S: PoiStore + 'static>(
    store: S,
    config: &AppConfig,
    catalog: Arc<mia_romagna::CategoryCatalog>,
    fallback: FallbackPolicy,
    filters: mia_romagna::FilterState,
    json: bool,
) -> Result<(), DiscoveryError> {
    let orchestrator =
        PoiQueryOrchestrator::new(store, catalog, fallback).with_max_results(config.store.max_results);

    let view = match orchestrator.fetch(filters).await? {
        FetchOutcome::Applied(view) => view,
        FetchOutcome::Unchanged | FetchOutcome::Discarded => orchestrator.view(),
    };
    tracing::info!("{} results ({:?})", view.pois.len(), view.source);

    let model = DiscoveryViewModel::build(&view, None);
    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    if model.showing_fallback {
        println!("No results yet, showing suggested places:");
    } else if model.empty {
        println!("No places match these filters.");
    }
    for card in &model.cards {
        let mut line = format!("{} [{}]", card.title, card.category);
        if let Some(rating) = card.rating {
            line.push_str(&format!(" {:.1}", rating));
        }
        if let Some(dates) = &card.dates {
            line.push_str(&format!(" {}", dates));
        }
        if let Some(address) = &card.address {
            line.push_str(&format!(" - {}", address));
        }
        println!("{}", line);
    }
    Ok(())
}
