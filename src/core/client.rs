use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info};

use crate::core::auth::{Credentials, LoginOutcome, classify_login};
use crate::core::config::AppConfig;
use crate::error::{PrecoError, Result};

const USER_AGENT: &str = concat!("precoview/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the price service. The cookie store holds the session
/// established by a successful login; a session is only ever re-created by
/// logging in again.
pub struct ApiClient {
    http: reqwest::Client,
    config: AppConfig,
    logged_in: bool,
}

impl ApiClient {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            logged_in: false,
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Submit credentials to the login endpoint and classify the result.
    /// Empty fields are rejected before any network traffic.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<LoginOutcome> {
        if !credentials.is_complete() {
            return Err(PrecoError::Auth(
                "username and password are required".to_string(),
            ));
        }
        info!("Logging in as {}", credentials.username);
        let outcome = post_login(&self.http, &self.config.auth_url, credentials).await?;
        if matches!(outcome, LoginOutcome::Authenticated(_)) {
            self.logged_in = true;
        }
        Ok(outcome)
    }

    /// Re-run the credential gate for the status poll. Uses a fresh client
    /// on purpose: the poll validates the credentials themselves, not the
    /// session cookie.
    pub async fn check_status(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        debug!("Checking account status for {}", credentials.username);
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.config.request_timeout)
            .build()?;
        post_login(&http, &self.config.auth_url, credentials).await
    }

    /// GET one candidate file URL through the (possibly authenticated)
    /// session, streaming the body into memory. Returns the status code and
    /// the raw bytes; the caller decides whether the attempt counts.
    pub async fn fetch_file(&self, url: &str) -> Result<(u16, Vec<u8>)> {
        debug!("Fetching {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        debug!("Fetched {url}: HTTP {status}, {} bytes", body.len());
        Ok((status, body))
    }
}

async fn post_login(
    http: &reqwest::Client,
    auth_url: &str,
    credentials: &Credentials,
) -> Result<LoginOutcome> {
    let response = match http
        .post(auth_url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .json(credentials)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_connect() || e.is_timeout() => {
            debug!("Login endpoint unreachable: {e}");
            return Ok(LoginOutcome::Unreachable);
        }
        Err(e) => return Err(e.into()),
    };

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    debug!("Login response: HTTP {status}");
    Ok(classify_login(status, &body))
}
