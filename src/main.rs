use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ghcn_climate_service::app::Application;
use ghcn_climate_service::config::Config;
use ghcn_climate_service::db::PgClimateStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ghcn_climate_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting GHCN climate service with config: {:?}", config);

    let store = PgClimateStore::connect(&config.database_url, config.db_max_connections).await?;
    info!("Database ready");

    let app = Application::build(config, store).await?;
    app.run_until_stopped().await
}
