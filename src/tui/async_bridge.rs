use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::auth::{Credentials, LoginOutcome};
use crate::core::client::ApiClient;
use crate::core::config::AppConfig;
use crate::core::fetch::{self, Acquired};
use crate::error::PrecoError;

/// Messages sent from the TUI to the async runtime.
#[derive(Debug)]
pub enum AsyncRequest {
    Login(Credentials),
    /// Run the full remote → cache → placeholder chain.
    Acquire,
    /// Remote stage only; used by the periodic refresh.
    RefreshRemote,
    /// Re-run the credential gate with the original credentials.
    PollStatus(Credentials),
    /// The user chose to delete a corrupted cache and download again.
    RedownloadCorrupt(PathBuf),
}

/// Why the acquisition chain produced no dataset.
#[derive(Debug, Clone)]
pub enum AcquireFailure {
    /// The cache file exists but does not parse; the user decides whether
    /// to delete it and re-download.
    Corrupt(PathBuf),
    /// Every stage failed.
    Failed(String),
}

/// Messages sent from the async runtime back to the TUI.
#[derive(Debug)]
pub enum AsyncResponse {
    LoginFinished(Result<LoginOutcome, String>),
    DatasetReady(Result<Acquired, AcquireFailure>),
    /// `None` keeps the previous dataset unchanged.
    RefreshFinished(Option<Acquired>),
    /// `None` marks a transient poll error; only a real outcome is acted on.
    StatusPolled(Option<LoginOutcome>),
}

/// Bridge between the sync TUI and async operations. Requests are handled
/// strictly one at a time, so two fetches can never overlap.
pub struct AsyncBridge {
    request_rx: mpsc::Receiver<AsyncRequest>,
    response_tx: mpsc::Sender<AsyncResponse>,
    client: ApiClient,
    config: AppConfig,
}

impl AsyncBridge {
    pub fn new(
        request_rx: mpsc::Receiver<AsyncRequest>,
        response_tx: mpsc::Sender<AsyncResponse>,
        client: ApiClient,
        config: AppConfig,
    ) -> Self {
        Self {
            request_rx,
            response_tx,
            client,
            config,
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            debug!("Received async request: {request:?}");

            let response = match request {
                AsyncRequest::Login(credentials) => {
                    let result = self
                        .client
                        .login(&credentials)
                        .await
                        .map_err(|e| e.to_string());
                    AsyncResponse::LoginFinished(result)
                }
                AsyncRequest::Acquire => {
                    let result = fetch::acquire(&self.client, &self.config)
                        .await
                        .map_err(|e| match e {
                            PrecoError::CorruptData(path) => AcquireFailure::Corrupt(path),
                            other => AcquireFailure::Failed(other.to_string()),
                        });
                    AsyncResponse::DatasetReady(result)
                }
                AsyncRequest::RefreshRemote => {
                    let result = fetch::fetch_remote(&self.client, &self.config).await;
                    AsyncResponse::RefreshFinished(result)
                }
                AsyncRequest::PollStatus(credentials) => {
                    let outcome = match self.client.check_status(&credentials).await {
                        Ok(outcome) => Some(outcome),
                        Err(e) => {
                            debug!("Status poll failed: {e}");
                            None
                        }
                    };
                    AsyncResponse::StatusPolled(outcome)
                }
                AsyncRequest::RedownloadCorrupt(path) => {
                    let result =
                        fetch::redownload_after_corruption(&self.client, &self.config, &path)
                            .await
                            .map_err(|e| AcquireFailure::Failed(e.to_string()));
                    AsyncResponse::DatasetReady(result)
                }
            };

            if self.response_tx.send(response).await.is_err() {
                break;
            }
        }
    }
}
