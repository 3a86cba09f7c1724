use log::warn;
use reqwest::{Client, ClientBuilder, StatusCode, header};

use crate::{config::FetchConfig, errors::FetchError};

pub struct RequestClient {
    client: Client,
    config: FetchConfig,
}

impl RequestClient {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client, config })
    }

    /// GETs `url` and returns the body, retrying transient failures with
    /// exponential backoff up to the configured number of attempts.
    pub async fn fetch_url_body(&self, url: &str) -> Result<String, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let failure = match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };
            let retryable = failure.is_retryable();
            warn!("attempt {attempt}/{max_attempts} for {url} failed: {failure}");
            if !retryable || attempt >= max_attempts {
                return Err(failure.into_fetch_error(url, attempt));
            }
            tokio::time::sleep(self.config.backoff_for(attempt)).await;
            attempt += 1;
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, AttemptFailure> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/html,application/json;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(AttemptFailure::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Status(status));
        }
        response.text().await.map_err(AttemptFailure::Request)
    }
}

#[derive(Debug)]
enum AttemptFailure {
    Request(reqwest::Error),
    Status(StatusCode),
}

impl AttemptFailure {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptFailure::Request(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            AttemptFailure::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }

    fn into_fetch_error(self, url: &str, attempts: u32) -> FetchError {
        match self {
            AttemptFailure::Request(source) => FetchError::Request {
                url: url.to_string(),
                attempts,
                source,
            },
            AttemptFailure::Status(status) => FetchError::Status {
                url: url.to_string(),
                status,
                attempts,
            },
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Request(e) => write!(f, "{e}"),
            AttemptFailure::Status(status) => write!(f, "status {status}"),
        }
    }
}
