use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use tripsmith::api::AppState;
use tripsmith::config::TripSmithConfig;
use tripsmith::planner::TravelPlanner;
use tripsmith::providers::{
    AirportDirectory, AirportResolver, AmadeusClient, OllamaGenerator, PricingService,
};
use tripsmith::validator::PlanValidator;
use tripsmith::{cache, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = TripSmithConfig::load()?;
    init_tracing(&config)?;

    let cache_dir = config.cache_dir();
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
    let fare_ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 60 * 60);
    cache::init(cache_dir.join("lookups"), fare_ttl)?;

    let amadeus = Arc::new(
        AmadeusClient::new(&config.amadeus).context("Failed to set up the Amadeus client")?,
    );

    let pricing: Arc<dyn PricingService> = amadeus.clone();
    let airports: Arc<dyn AirportResolver> = match config.airports.source.as_str() {
        "directory" => match &config.airports.data_file {
            Some(path) => Arc::new(AirportDirectory::from_file(path)?),
            None => Arc::new(AirportDirectory::bundled()?),
        },
        _ => amadeus,
    };

    let validator = PlanValidator::with_settings(
        pricing,
        airports.clone(),
        config.validation.surface_transport_cost,
        config.validation.lead_time_days,
    );

    let generator = Arc::new(OllamaGenerator::new(&config.generator)?);
    let planner = TravelPlanner::new(generator, validator)
        .with_max_attempts(config.validation.max_attempts);

    let state = AppState {
        planner: Arc::new(planner),
        airports,
    };

    web::run(&config.server, state).await
}

fn init_tracing(config: &TripSmithConfig) -> Result<()> {
    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
