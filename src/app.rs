use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::PgClimateStore;
use crate::services::{ClimateQueryService, IngestOptions, IngestService};

/// Running HTTP server plus the optional startup ingestion task
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub ingest_handle: Option<JoinHandle<()>>,
}

impl Application {
    pub async fn build(
        config: Config,
        store: PgClimateStore,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let ingest_handle = if config.ingest_on_startup {
            let ingest_service =
                IngestService::new(store.clone(), config.fetcher(), config.daily_source());
            let options = IngestOptions {
                concurrency: config.ingest_concurrency,
                ..Default::default()
            };

            info!("Spawning background ingestion");
            Some(tokio::spawn(async move {
                if let Err(e) = ingest_service.run(&options).await {
                    error!("Startup ingestion failed: {}", e);
                }
            }))
        } else {
            None
        };

        let app_state = AppState {
            query_service: ClimateQueryService::new(store),
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        Ok(Self {
            server_handle,
            ingest_handle,
        })
    }

    /// Run until the server stops. Ingestion keeps running in the background.
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
