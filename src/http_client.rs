use crate::error::CheckError;
use reqwest::{Client, Response, header};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("docs-check/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Async HTTP client for the few remote data files the checks need
/// (the emoji catalog).
pub struct AsyncHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    /// Create a new async HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, CheckError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()
            .map_err(CheckError::from)?;

        Ok(Self { client, config })
    }

    /// Download a body with retry logic and exponential backoff
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, CheckError> {
        let response = self.get_response_with_retry(url).await?;
        let bytes = response.bytes().await.map_err(CheckError::from)?;
        Ok(bytes.to_vec())
    }

    /// Get response with retry logic
    async fn get_response_with_retry(&self, url: &str) -> Result<Response, CheckError> {
        let mut current_attempt = 0;

        loop {
            match self.make_request(url).await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    let status = response.status();
                    let error = CheckError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    };

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && current_attempt < self.config.retry_attempts {
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }

                    return Err(error);
                }
                Err(error) => {
                    if current_attempt < self.config.retry_attempts
                        && self.is_retryable_error(&error)
                    {
                        tracing::debug!(url, attempt = current_attempt, %error, "retrying request");
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Make a single HTTP request with timeout
    async fn make_request(&self, url: &str) -> Result<Response, CheckError> {
        let request_future = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send();

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request_future,
        )
        .await
        .map_err(|_| CheckError::Timeout {
            url: url.to_string(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(CheckError::from)
    }

    /// Backoff delay before retry number `attempt`
    fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.config.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }

    /// Wait before retry with exponential backoff
    async fn wait_before_retry(&self, attempt: u32) {
        sleep(self.retry_delay(attempt)).await;
    }

    /// Check if an error is retryable
    fn is_retryable_error(&self, error: &CheckError) -> bool {
        match error {
            CheckError::Http(reqwest_error) => {
                reqwest_error.is_timeout() || reqwest_error.is_connect() || reqwest_error.is_request()
            }
            CheckError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
