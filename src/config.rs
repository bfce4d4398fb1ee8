use std::env;
use std::path::PathBuf;

use crate::fetcher::{DailySource, GhcnFetcher, DEFAULT_BASE_URL};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub ghcn_base_url: String,
    /// Read `.dly` files from here instead of downloading them
    pub ghcn_daily_dir: Option<PathBuf>,
    pub ingest_on_startup: bool,
    pub ingest_concurrency: usize,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            ghcn_base_url: env::var("GHCN_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ghcn_daily_dir: env::var("GHCN_DAILY_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            ingest_on_startup: env::var("INGEST_ON_STARTUP")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            ingest_concurrency: env::var("INGEST_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn fetcher(&self) -> GhcnFetcher {
        GhcnFetcher::with_base_url(&self.ghcn_base_url)
    }

    pub fn daily_source(&self) -> DailySource {
        match &self.ghcn_daily_dir {
            Some(dir) => DailySource::Local(dir.clone()),
            None => DailySource::Remote(self.fetcher()),
        }
    }
}
