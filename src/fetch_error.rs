#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid station id: '{0}'")]
    InvalidStationId(String),
}

impl FetchError {
    /// Failures worth retrying: timeouts, connection problems, 5xx and 429
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let server_error = FetchError::UpstreamStatus {
            status: 503,
            url: "x".to_string(),
        };
        let throttled = FetchError::UpstreamStatus {
            status: 429,
            url: "x".to_string(),
        };
        let forbidden = FetchError::UpstreamStatus {
            status: 403,
            url: "x".to_string(),
        };
        assert!(server_error.is_transient());
        assert!(throttled.is_transient());
        assert!(!forbidden.is_transient());
        assert!(!FetchError::NotFound("a.dly".to_string()).is_transient());
    }
}
