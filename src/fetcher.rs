use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::fetch_error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://www1.ncdc.noaa.gov/pub/data/ghcn/daily/";
pub const STATIONS_FILE: &str = "ghcnd-stations.txt";
pub const INVENTORY_FILE: &str = "ghcnd-inventory.txt";
/// Subdirectory of the base URL holding one `<id>.dly` per station
pub const DAILY_SUBDIR: &str = "all/";

const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_MIN_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Downloads the GHCN-Daily text files over HTTP
#[derive(Clone)]
pub struct GhcnFetcher {
    client: Client,
    base_url: String,
    max_retries: usize,
    min_retry_delay: Duration,
}

impl GhcnFetcher {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Use a different root, e.g. a mirror or a mock server
    pub fn with_base_url(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                Client::new()
            });

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            client,
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
            min_retry_delay: DEFAULT_MIN_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, max_retries: usize, min_retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.min_retry_delay = min_retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `ghcnd-stations.txt`
    pub async fn fetch_station_names(&self) -> Result<String, FetchError> {
        self.fetch_text(STATIONS_FILE).await
    }

    /// `ghcnd-inventory.txt`
    pub async fn fetch_inventory(&self) -> Result<String, FetchError> {
        self.fetch_text(INVENTORY_FILE).await
    }

    /// `all/<station_id>.dly`
    pub async fn fetch_daily(&self, station_id: &str) -> Result<String, FetchError> {
        validate_station_id(station_id)?;
        self.fetch_text(&format!("{DAILY_SUBDIR}{station_id}.dly"))
            .await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_retry_delay)
            .with_max_times(self.max_retries);

        let text = (|| self.get_once(&url))
            .retry(backoff)
            .when(FetchError::is_transient)
            .notify(|e, delay| warn!("Fetching {} failed ({}), retrying in {:?}", path, e, delay))
            .await?;

        info!("Downloaded {} ({} bytes)", path, text.len());
        Ok(text)
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        debug!("Sending HTTP request to {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if status.is_success() {
            Ok(response.text().await?)
        } else if status.as_u16() == 404 {
            Err(FetchError::NotFound(url.to_string()))
        } else {
            Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}

impl Default for GhcnFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Where `<station_id>.dly` files come from
#[derive(Clone)]
pub enum DailySource {
    Remote(GhcnFetcher),
    /// A directory holding an unpacked `ghcnd_all` archive
    Local(PathBuf),
}

impl DailySource {
    pub async fn load(&self, station_id: &str) -> Result<String, FetchError> {
        match self {
            DailySource::Remote(fetcher) => fetcher.fetch_daily(station_id).await,
            DailySource::Local(dir) => read_local_daily(dir, station_id).await,
        }
    }
}

async fn read_local_daily(dir: &Path, station_id: &str) -> Result<String, FetchError> {
    validate_station_id(station_id)?;
    let path = dir.join(format!("{station_id}.dly"));
    debug!("Reading {}", path.display());

    tokio::fs::read_to_string(&path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            FetchError::NotFound(path.display().to_string())
        } else {
            FetchError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

// Station ids end up in URLs and file paths
fn validate_station_id(station_id: &str) -> Result<(), FetchError> {
    if station_id.is_empty() || !station_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FetchError::InvalidStationId(station_id.to_string()));
    }
    Ok(())
}
