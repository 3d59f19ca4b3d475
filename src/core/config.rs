use std::path::PathBuf;
use std::time::Duration;

const SERVICE_BASE: &str = "https://meuagendamentopro.com.br";

/// Immutable application configuration, built once at startup and passed to
/// each component at construction.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Login endpoint, accepting a JSON `{username, password}` body.
    pub auth_url: String,
    /// Candidate base URLs for the data file, tried in order.
    pub base_urls: Vec<String>,
    /// Name of the data file, remotely and in the local cache.
    pub filename: String,
    /// Overrides the probed cache directory when set.
    pub data_dir: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Responses smaller than this are rejected as error pages.
    pub min_file_bytes: u64,
    pub status_poll_interval: Duration,
    pub refresh_interval: Duration,
    /// Skip authentication entirely and browse local data.
    pub offline: bool,
    /// Refuse to start when no local data file exists yet.
    pub strict_startup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth_url: format!("{SERVICE_BASE}/api/login"),
            base_urls: vec![
                format!("{SERVICE_BASE}/api/files"),
                format!("{SERVICE_BASE}/files"),
                format!("{SERVICE_BASE}/public/files"),
                format!("{SERVICE_BASE}/download"),
                format!("{SERVICE_BASE}/data"),
            ],
            filename: "dados.csv".to_string(),
            data_dir: None,
            request_timeout: Duration::from_secs(30),
            min_file_bytes: 100,
            status_poll_interval: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(300),
            offline: false,
            strict_startup: false,
        }
    }
}
