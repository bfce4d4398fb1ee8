use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ghcn_climate_service::db::{ClimateStore, PgClimateStore};
use ghcn_climate_service::fetcher::{DailySource, GhcnFetcher, DEFAULT_BASE_URL};
use ghcn_climate_service::services::{IngestOptions, IngestService};

#[derive(Parser)]
#[command(name = "ghcn-import")]
#[command(about = "Import GHCN-Daily stations and monthly temperatures into Postgres", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Root URL holding ghcnd-stations.txt, ghcnd-inventory.txt and all/<id>.dly
    #[arg(long, env = "GHCN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Read <id>.dly files from this directory instead of downloading them
    #[arg(long, env = "GHCN_DAILY_DIR")]
    daily_dir: Option<PathBuf>,

    /// Number of stations loaded in parallel
    #[arg(long, env = "INGEST_CONCURRENCY", default_value = "8")]
    parallel: usize,

    /// Only load datapoints for the first N stations
    #[arg(long)]
    limit: Option<usize>,

    /// Import even if the tables already hold rows
    #[arg(long)]
    force: bool,

    /// Only build and store the station catalog
    #[arg(long)]
    stations_only: bool,

    /// Maximum pool connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "5")]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ghcn_climate_service=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let start_time = Instant::now();

    let store = PgClimateStore::connect(&cli.database_url, cli.max_connections).await?;

    let fetcher = GhcnFetcher::with_base_url(&cli.base_url);
    let daily_source = match &cli.daily_dir {
        Some(dir) => {
            info!("Reading .dly files from {}", dir.display());
            DailySource::Local(dir.clone())
        }
        None => DailySource::Remote(fetcher.clone()),
    };
    let service = IngestService::new(store.clone(), fetcher, daily_source);
    let options = IngestOptions {
        force: cli.force,
        concurrency: cli.parallel,
        station_limit: cli.limit,
    };

    // Phase 1: station catalog
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Downloading station list and inventory...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let catalog = service.ingest_catalog(cli.force).await;
    spinner.finish_and_clear();
    let catalog = catalog.map_err(|e| {
        error!("Catalog import failed: {}", e);
        e
    })?;

    if catalog.skipped {
        println!("Station catalog already present (use --force to re-import)");
    } else {
        println!(
            "Stations: {} built, {} inserted, {} dropped without TMAX, {} without name, {} lines skipped",
            catalog.stations_built,
            catalog.stations_inserted,
            catalog.stations_without_tmax,
            catalog.stations_without_name,
            catalog.lines_skipped
        );
    }

    if cli.stations_only {
        return Ok(());
    }

    // Phase 2: monthly datapoints
    let total = match cli.limit {
        Some(limit) => (store.count_stations().await? as usize).min(limit),
        None => store.count_stations().await? as usize,
    };
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stations ({msg})")?
            .progress_chars("##-"),
    );

    let mut inserted = 0;
    let mut failed = Vec::new();
    let datapoints = service
        .ingest_datapoints(&options, |result| {
            match result {
                Ok(station) => inserted += station.datapoints_inserted,
                Err(e) => failed.push(e.to_string()),
            }
            pb.set_message(format!("{} datapoints, {} failed", inserted, failed.len()));
            pb.inc(1);
        })
        .await?;
    pb.finish_with_message(format!(
        "Complete: {} datapoints, {} failed",
        inserted,
        failed.len()
    ));

    let total_duration = start_time.elapsed();

    println!("\n============================================================");
    println!("GHCN Import Summary");
    println!("============================================================");
    if datapoints.skipped {
        println!("Datapoints already present (use --force to re-import)");
    } else {
        println!("Stations processed:  {}", datapoints.stations_processed);
        println!("Stations failed:     {}", datapoints.stations_failed);
        println!("Datapoints inserted: {}", datapoints.datapoints_inserted);
        println!("Lines skipped:       {}", datapoints.lines_skipped);
    }
    println!("------------------------------------------------------------");
    println!("Total Time:          {:.2}s", total_duration.as_secs_f64());
    println!("============================================================");

    if !failed.is_empty() {
        println!("\nFailed stations:");
        for e in failed.iter().take(20) {
            println!("  {e}");
        }
        if failed.len() > 20 {
            println!("  ... and {} more", failed.len() - 20);
        }
    }

    Ok(())
}
