use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::db::{ClimateStore, DbError};
use crate::fetch_error::FetchError;
use crate::fetcher::{DailySource, GhcnFetcher};
use crate::ghcn::{build_catalog, parse_daily_datapoints, parse_station_names};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] FetchError),

    #[error(transparent)]
    Database(#[from] DbError),
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Re-run a phase even if its table already holds rows
    pub force: bool,
    /// Stations loaded in parallel during the datapoint phase
    pub concurrency: usize,
    /// Only load datapoints for the first N stations (by id)
    pub station_limit: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            force: false,
            concurrency: 8,
            station_limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIngest {
    pub skipped: bool,
    pub stations_built: usize,
    pub stations_inserted: usize,
    pub stations_without_tmax: usize,
    pub stations_without_name: usize,
    pub lines_skipped: usize,
}

/// Outcome of loading one station's `.dly` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationIngest {
    pub station_id: String,
    pub datapoints_derived: usize,
    pub datapoints_inserted: usize,
    pub lines_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatapointIngest {
    pub skipped: bool,
    pub stations_processed: usize,
    pub stations_failed: usize,
    pub datapoints_inserted: usize,
    pub lines_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub catalog: CatalogIngest,
    pub datapoints: DatapointIngest,
    pub duration: Duration,
}

/// Loads the GHCN catalog and monthly datapoints into a [`ClimateStore`]
#[derive(Clone)]
pub struct IngestService<S> {
    store: S,
    fetcher: GhcnFetcher,
    daily_source: DailySource,
}

impl<S: ClimateStore> IngestService<S> {
    pub fn new(store: S, fetcher: GhcnFetcher, daily_source: DailySource) -> Self {
        Self {
            store,
            fetcher,
            daily_source,
        }
    }

    /// Catalog then datapoints
    pub async fn run(&self, options: &IngestOptions) -> Result<IngestStats, IngestError> {
        let start = Instant::now();
        let catalog = self.ingest_catalog(options.force).await?;
        let datapoints = self.ingest_datapoints(options, |_| {}).await?;

        let stats = IngestStats {
            catalog,
            datapoints,
            duration: start.elapsed(),
        };
        info!(
            "Ingestion finished in {:.2}s: {} stations, {} datapoints",
            stats.duration.as_secs_f64(),
            stats.catalog.stations_inserted,
            stats.datapoints.datapoints_inserted
        );
        Ok(stats)
    }

    /// Download station names and inventory, then insert the catalog.
    ///
    /// Both files are fetched before anything is written, so a failed download
    /// leaves the store untouched.
    #[instrument(skip(self))]
    pub async fn ingest_catalog(&self, force: bool) -> Result<CatalogIngest, IngestError> {
        let existing = self.store.count_stations().await?;
        if existing > 0 && !force {
            info!("Station table already holds {} rows, skipping catalog", existing);
            return Ok(CatalogIngest {
                skipped: true,
                ..Default::default()
            });
        }

        let names_text = self.fetcher.fetch_station_names().await.map_err(|e| {
            error!("Failed to download station names: {}", e);
            e
        })?;
        let inventory_text = self.fetcher.fetch_inventory().await.map_err(|e| {
            error!("Failed to download inventory: {}", e);
            e
        })?;

        let names = parse_station_names(&names_text);
        let catalog = build_catalog(&inventory_text, &names);
        let stations_inserted = self.store.upsert_stations(&catalog.stations).await?;

        Ok(CatalogIngest {
            skipped: false,
            stations_built: catalog.stats.stations_built,
            stations_inserted,
            stations_without_tmax: catalog.stats.stations_without_tmax,
            stations_without_name: catalog.stats.stations_without_name,
            lines_skipped: catalog.stats.lines_skipped,
        })
    }

    /// Load and insert the datapoints of every stored station.
    ///
    /// A station that fails is logged and counted; it never aborts the run.
    /// `on_station` is called once per finished station, in completion order.
    #[instrument(skip(self, on_station))]
    pub async fn ingest_datapoints<F>(
        &self,
        options: &IngestOptions,
        mut on_station: F,
    ) -> Result<DatapointIngest, IngestError>
    where
        F: FnMut(&Result<StationIngest, IngestError>) + Send,
    {
        let existing = self.store.count_datapoints().await?;
        if existing > 0 && !options.force {
            info!("Datapoint table already holds {} rows, skipping datapoints", existing);
            return Ok(DatapointIngest {
                skipped: true,
                ..Default::default()
            });
        }

        let mut station_ids = self.store.list_station_ids().await?;
        if let Some(limit) = options.station_limit {
            station_ids.truncate(limit);
        }
        info!(
            "Loading datapoints for {} stations ({} in parallel)",
            station_ids.len(),
            options.concurrency
        );

        let mut results = stream::iter(station_ids)
            .map(|station_id| async move { self.ingest_station(&station_id).await })
            .buffer_unordered(options.concurrency.max(1));

        let mut summary = DatapointIngest::default();
        while let Some(result) = results.next().await {
            summary.stations_processed += 1;
            match &result {
                Ok(station) => {
                    summary.datapoints_inserted += station.datapoints_inserted;
                    summary.lines_skipped += station.lines_skipped;
                }
                Err(e) => {
                    summary.stations_failed += 1;
                    warn!("Station failed: {}", e);
                }
            }
            on_station(&result);
        }

        info!(
            "Inserted {} datapoints from {} stations ({} failed)",
            summary.datapoints_inserted, summary.stations_processed, summary.stations_failed
        );
        Ok(summary)
    }

    /// Load one station's `.dly` file and insert its datapoints
    #[instrument(skip(self))]
    pub async fn ingest_station(&self, station_id: &str) -> Result<StationIngest, IngestError> {
        let text = self.daily_source.load(station_id).await?;
        let parsed = parse_daily_datapoints(station_id, &text);
        let datapoints_inserted = self.store.upsert_datapoints(&parsed.datapoints).await?;

        Ok(StationIngest {
            station_id: station_id.to_string(),
            datapoints_derived: parsed.datapoints.len(),
            datapoints_inserted,
            lines_skipped: parsed.lines_skipped,
        })
    }
}
