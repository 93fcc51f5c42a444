use region_search::config::Settings;
use region_search::core::{AggregationError, MultiRegionAggregator};
use region_search::models::SearchRequest;
use region_search::services::{AnalyticsSink, CacheManager, HttpRegionBackend, OutcomeCache, StaticRegionRegistry, TracingAnalyticsSink};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Read the request JSON from the given path, or stdin when absent
fn read_request(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging; stdout is reserved for the response
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting region search...");

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration loaded successfully ({} regions)", settings.regions.len());

    let engine_config = settings.aggregator_config();

    let registry = Arc::new(StaticRegionRegistry::new(settings.region_definitions()));

    let backend = match HttpRegionBackend::new(
        settings.region_endpoints(),
        Duration::from_millis(engine_config.default_timeout_ms),
    ) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("Failed to build region backend client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize cache manager (optional - Redis falls back to in-process only)
    let l1_cache_size = settings.cache.l1_cache_size;
    let cache_ttl = settings.cache.ttl_secs;

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis enabled)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };
    let cache: Arc<dyn OutcomeCache> = Arc::new(cache);
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(TracingAnalyticsSink);

    let aggregator = MultiRegionAggregator::new(registry, backend, Some(cache), Some(analytics), engine_config);

    // Read and parse the request
    let path = std::env::args().nth(1);
    let raw = match read_request(path.as_deref()) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read request: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request: SearchRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid request JSON: {}", e);
            return ExitCode::from(2);
        }
    };

    let response = match aggregator.execute_multi_region_search(request).await {
        Ok(response) => response,
        Err(AggregationError::Validation(e)) => {
            error!("Request rejected: {}", e);
            return ExitCode::from(2);
        }
        Err(e) => {
            error!("Search failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return ExitCode::FAILURE;
        }
    }

    // Give the fire-and-forget analytics task a chance to flush
    tokio::task::yield_now().await;

    ExitCode::SUCCESS
}
