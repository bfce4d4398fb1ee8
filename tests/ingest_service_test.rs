// Ingestion tests: mocked GHCN server or local .dly directory, in-memory store

mod common;

use common::{sample_dir, sample_file, BERLIN, BREMEN, HAMBURG, SCHWERIN};
use ghcn_climate_service::db::{ClimateStore, MemoryClimateStore};
use ghcn_climate_service::fetcher::{DailySource, GhcnFetcher};
use ghcn_climate_service::services::{
    ClimateQueryService, IngestError, IngestOptions, IngestService,
};
use mockito::{Mock, Server, ServerGuard};
use std::time::Duration;

fn test_fetcher(server: &ServerGuard) -> GhcnFetcher {
    GhcnFetcher::with_base_url(&server.url()).with_retry(1, Duration::from_millis(1))
}

async fn mock_file(server: &mut ServerGuard, path: &str, body: String) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

async fn mock_catalog(server: &mut ServerGuard) -> (Mock, Mock) {
    let names = mock_file(server, "/ghcnd-stations.txt", sample_file("ghcnd-stations.txt")).await;
    let inventory =
        mock_file(server, "/ghcnd-inventory.txt", sample_file("ghcnd-inventory.txt")).await;
    (names, inventory)
}

#[tokio::test]
async fn test_catalog_ingest_from_sample_files() {
    let mut server = Server::new_async().await;
    let (names, inventory) = mock_catalog(&mut server).await;

    let store = MemoryClimateStore::new();
    let fetcher = test_fetcher(&server);
    let service = IngestService::new(store.clone(), fetcher.clone(), DailySource::Remote(fetcher));

    let catalog = service.ingest_catalog(false).await.unwrap();
    names.assert_async().await;
    inventory.assert_async().await;

    assert!(!catalog.skipped);
    assert_eq!(catalog.stations_built, 3);
    assert_eq!(catalog.stations_inserted, 3);
    assert_eq!(catalog.stations_without_tmax, 1);
    assert_eq!(catalog.stations_without_name, 1);
    assert_eq!(catalog.lines_skipped, 1);

    assert_eq!(
        store.list_station_ids().await.unwrap(),
        vec![HAMBURG.to_string(), BREMEN.to_string(), BERLIN.to_string()]
    );
    assert!(store.find_station(SCHWERIN).await.unwrap().is_none());

    let bremen = store.find_station(BREMEN).await.unwrap().unwrap();
    assert_eq!(bremen.name, "Unknown");
    let berlin = store.find_station(BERLIN).await.unwrap().unwrap();
    assert_eq!(berlin.name, "BERLIN-DAHLEM");
    assert_eq!((berlin.first_measure_tmax, berlin.last_measure_tmax), (1876, 2024));
}

#[tokio::test]
async fn test_catalog_ingest_skipped_when_filled() {
    let mut server = Server::new_async().await;
    let names = server
        .mock("GET", "/ghcnd-stations.txt")
        .with_status(200)
        .with_body(sample_file("ghcnd-stations.txt"))
        .expect(1)
        .create_async()
        .await;
    let _inventory =
        mock_file(&mut server, "/ghcnd-inventory.txt", sample_file("ghcnd-inventory.txt")).await;

    let store = MemoryClimateStore::new();
    let fetcher = test_fetcher(&server);
    let service = IngestService::new(store.clone(), fetcher.clone(), DailySource::Remote(fetcher));

    service.ingest_catalog(false).await.unwrap();
    let second = service.ingest_catalog(false).await.unwrap();
    assert!(second.skipped);
    names.assert_async().await;
}

#[tokio::test]
async fn test_upstream_failure_leaves_store_untouched() {
    let mut server = Server::new_async().await;
    let _names =
        mock_file(&mut server, "/ghcnd-stations.txt", sample_file("ghcnd-stations.txt")).await;
    let _inventory = server
        .mock("GET", "/ghcnd-inventory.txt")
        .with_status(503)
        .expect_at_least(1)
        .create_async()
        .await;

    let store = MemoryClimateStore::new();
    let fetcher = test_fetcher(&server);
    let service = IngestService::new(store.clone(), fetcher.clone(), DailySource::Remote(fetcher));

    let result = service.run(&IngestOptions::default()).await;
    assert!(matches!(result, Err(IngestError::Upstream(_))));
    assert_eq!(store.count_stations().await.unwrap(), 0);
    assert_eq!(store.count_datapoints().await.unwrap(), 0);
}

#[tokio::test]
async fn test_full_ingest_over_http() {
    let mut server = Server::new_async().await;
    let _catalog = mock_catalog(&mut server).await;
    let _hamburg = mock_file(
        &mut server,
        &format!("/all/{HAMBURG}.dly"),
        sample_file(&format!("{HAMBURG}.dly")),
    )
    .await;
    let _berlin = mock_file(
        &mut server,
        &format!("/all/{BERLIN}.dly"),
        sample_file(&format!("{BERLIN}.dly")),
    )
    .await;
    let _bremen = server
        .mock("GET", format!("/all/{BREMEN}.dly").as_str())
        .with_status(404)
        .create_async()
        .await;

    let store = MemoryClimateStore::new();
    let fetcher = test_fetcher(&server);
    let service = IngestService::new(store.clone(), fetcher.clone(), DailySource::Remote(fetcher));

    let stats = service
        .run(&IngestOptions {
            concurrency: 2,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.catalog.stations_inserted, 3);
    assert_eq!(stats.datapoints.stations_processed, 3);
    assert_eq!(stats.datapoints.stations_failed, 1);
    // Hamburg: Dec, Jan, Feb, Jul (March lacks TMIN). Berlin: Jul.
    assert_eq!(stats.datapoints.datapoints_inserted, 5);
    assert_eq!(store.count_datapoints().await.unwrap(), 5);

    let query = ClimateQueryService::new(store);
    let history = query
        .get_datapoints_for_station(HAMBURG, 2020, 2020)
        .await
        .unwrap();
    let winter_tmin = history.series[8].value_for(2020).unwrap();
    assert!((winter_tmin - 180.0 / 91.0).abs() < 1e-9);
    assert_eq!(history.series[5].value_for(2020), Some(24.0));
}

#[tokio::test]
async fn test_datapoint_ingest_from_local_directory() {
    let mut server = Server::new_async().await;
    let _catalog = mock_catalog(&mut server).await;

    let store = MemoryClimateStore::new();
    let service = IngestService::new(
        store.clone(),
        test_fetcher(&server),
        DailySource::Local(sample_dir()),
    );
    service.ingest_catalog(false).await.unwrap();

    let mut seen = Vec::new();
    let summary = service
        .ingest_datapoints(&IngestOptions::default(), |result| {
            seen.push(result.as_ref().map(|s| s.station_id.clone()).ok());
        })
        .await
        .unwrap();

    assert_eq!(seen.len(), 3);
    // Bremen has no .dly file in the sample directory
    assert_eq!(summary.stations_failed, 1);
    assert_eq!(summary.datapoints_inserted, 5);

    let rerun = service
        .ingest_datapoints(&IngestOptions::default(), |_| {})
        .await
        .unwrap();
    assert!(rerun.skipped);

    let forced = service
        .ingest_datapoints(
            &IngestOptions {
                force: true,
                ..Default::default()
            },
            |_| {},
        )
        .await
        .unwrap();
    assert!(!forced.skipped);
    assert_eq!(forced.datapoints_inserted, 0);
}

#[tokio::test]
async fn test_station_limit() {
    let mut server = Server::new_async().await;
    let _catalog = mock_catalog(&mut server).await;

    let store = MemoryClimateStore::new();
    let service = IngestService::new(
        store.clone(),
        test_fetcher(&server),
        DailySource::Local(sample_dir()),
    );
    service.ingest_catalog(false).await.unwrap();

    let summary = service
        .ingest_datapoints(
            &IngestOptions {
                station_limit: Some(1),
                ..Default::default()
            },
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(summary.stations_processed, 1);
    assert_eq!(summary.datapoints_inserted, 4);
}
