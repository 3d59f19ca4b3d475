use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::client::ApiClient;
use crate::core::config::AppConfig;
use crate::core::dataset::Dataset;
use crate::core::paths;
use crate::error::{PrecoError, Result};

/// Where the current dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Cache,
    Placeholder,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Remote => "server",
            DataSource::Cache => "local cache",
            DataSource::Placeholder => "demonstration data",
        }
    }
}

/// Successful outcome of the acquisition chain.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub dataset: Dataset,
    pub source: DataSource,
    pub path: PathBuf,
}

/// Resolved location of the cached data file.
pub fn cache_path(config: &AppConfig) -> PathBuf {
    match &config.data_dir {
        Some(dir) => dir.join(&config.filename),
        None => paths::resolve_data_dir().join(&config.filename),
    }
}

/// Run the full remote → cache → placeholder chain. Each stage is entered
/// only after the previous one has fully failed.
pub async fn acquire(client: &ApiClient, config: &AppConfig) -> Result<Acquired> {
    // Stage 1: remote fetch across every candidate URL.
    if let Some(acquired) = fetch_remote(client, config).await {
        return Ok(acquired);
    }

    // Stage 2: a previously saved copy, with no freshness check.
    let cache = cache_path(config);
    if cache.exists() {
        match Dataset::from_csv_path(&cache) {
            Ok(dataset) => {
                info!("Using cached data file: {}", cache.display());
                return Ok(Acquired {
                    dataset,
                    source: DataSource::Cache,
                    path: cache,
                });
            }
            Err(e) => {
                // The cache exists but does not parse. Deleting it is the
                // caller's call, not ours.
                warn!("Cached data file is corrupted: {e}");
                return Err(PrecoError::CorruptData(cache));
            }
        }
    }

    // Stage 3: the fixed placeholder dataset, persisted for next time.
    let dataset = Dataset::placeholder();
    let path = persist_dataset(&dataset, &cache, &config.filename)?;
    info!("No data source reachable, created placeholder at {}", path.display());
    Ok(Acquired {
        dataset,
        source: DataSource::Placeholder,
        path,
    })
}

/// Stage 1 alone: try every base URL with both path conventions and return
/// the first attempt that survives validation. Used directly by the
/// periodic refresh, which must never fall back to cache or placeholder.
pub async fn fetch_remote(client: &ApiClient, config: &AppConfig) -> Option<Acquired> {
    for base in &config.base_urls {
        let base = base.trim_end_matches('/');
        let urls = [
            format!("{base}/{}", config.filename),
            format!("{base}/download/{}", config.filename),
        ];
        for url in urls {
            match remote_attempt(client, config, &url).await {
                Ok(acquired) => {
                    info!("Downloaded data file from {url}");
                    return Some(acquired);
                }
                Err(e) => debug!("Attempt failed for {url}: {e}"),
            }
        }
    }
    info!("All download attempts failed");
    None
}

async fn remote_attempt(client: &ApiClient, config: &AppConfig, url: &str) -> Result<Acquired> {
    let (status, body) = client.fetch_file(url).await?;
    if status != 200 {
        return Err(PrecoError::Server(status));
    }
    // A JSON body with status 200 is still a server-side error payload,
    // never a usable data file.
    if looks_like_json(&body) {
        return Err(PrecoError::Validation(
            "server returned a JSON error payload".to_string(),
        ));
    }
    if (body.len() as u64) < config.min_file_bytes {
        return Err(PrecoError::Validation(format!(
            "response too small ({} bytes)",
            body.len()
        )));
    }

    let path = persist_bytes(&body, &cache_path(config), &config.filename)?;
    Dataset::validate_csv_file(&path)?;
    let dataset = Dataset::from_csv_path(&path)?;
    Ok(Acquired {
        dataset,
        source: DataSource::Remote,
        path,
    })
}

/// The caller chose to re-download after a corruption report: delete the bad
/// cache and re-run the remote stage. This is the only place a cache file is
/// ever deleted.
pub async fn redownload_after_corruption(
    client: &ApiClient,
    config: &AppConfig,
    corrupted: &Path,
) -> Result<Acquired> {
    if let Err(e) = std::fs::remove_file(corrupted) {
        debug!("Could not remove corrupted file {}: {e}", corrupted.display());
    } else {
        info!("Removed corrupted data file: {}", corrupted.display());
    }
    fetch_remote(client, config)
        .await
        .ok_or(PrecoError::DataUnavailable)
}

/// True when the bytes parse as a complete JSON document.
pub fn looks_like_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
}

/// Write bytes to the primary path, retrying at the bare temp directory on
/// failure. Both failing fails the write.
fn persist_bytes(bytes: &[u8], primary: &Path, filename: &str) -> Result<PathBuf> {
    match std::fs::write(primary, bytes) {
        Ok(()) => Ok(primary.to_path_buf()),
        Err(first) => {
            let fallback = paths::temp_fallback_path(filename);
            warn!(
                "Write to {} failed ({first}), retrying at {}",
                primary.display(),
                fallback.display()
            );
            std::fs::write(&fallback, bytes)?;
            Ok(fallback)
        }
    }
}

fn persist_dataset(dataset: &Dataset, primary: &Path, filename: &str) -> Result<PathBuf> {
    match dataset.write_csv(primary) {
        Ok(()) => Ok(primary.to_path_buf()),
        Err(first) => {
            let fallback = paths::temp_fallback_path(filename);
            warn!(
                "Write to {} failed ({first}), retrying at {}",
                primary.display(),
                fallback.display()
            );
            dataset.write_csv(&fallback)?;
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payloads_are_recognized() {
        assert!(looks_like_json(br#"{"error":"arquivo indisponivel"}"#));
        assert!(looks_like_json(b"[1,2,3]"));
        assert!(!looks_like_json(b"Codigo,Produto\n1,Mouse\n"));
        assert!(!looks_like_json(b"<html>404</html>"));
    }

    #[test]
    fn persist_falls_back_to_temp_dir() {
        let missing_parent = Path::new("/nonexistent-precoview-dir/dados.csv");
        let written = persist_bytes(b"a,b\n1,2\n", missing_parent, "precoview-test-persist.csv")
            .unwrap();
        assert_eq!(
            written,
            std::env::temp_dir().join("precoview-test-persist.csv")
        );
        assert!(written.exists());
        std::fs::remove_file(written).unwrap();
    }

    #[test]
    fn persist_prefers_the_primary_path() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("dados.csv");
        let written = persist_bytes(b"a,b\n1,2\n", &primary, "dados.csv").unwrap();
        assert_eq!(written, primary);
    }

    #[test]
    fn placeholder_persist_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("dados.csv");
        let path = persist_dataset(&Dataset::placeholder(), &primary, "dados.csv").unwrap();
        let reread = Dataset::from_csv_path(&path).unwrap();
        assert_eq!(reread.len(), 3);
        assert_eq!(reread.columns[1], "Produto");
    }
}
