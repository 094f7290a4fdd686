//! Tally HTTP Client
//!
//! A type-safe client for the parsing backend of the inventory console.
//!
//! Request/response endpoints go over HTTP with reqwest; live job status is
//! received over a WebSocket subscription. The [`ParsingBackend`] trait
//! bundles the operations the synchronization layer needs so it can be
//! driven by a fake in tests.
//!
//! # Example
//!
//! ```no_run
//! use tally_client::BackendClient;
//! use tally_core::domain::job::JobId;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BackendClient::new("http://localhost:8000");
//!
//!     let snapshot = client.parsing_status(JobId(42)).await?;
//!     println!("Job 42 is {}", snapshot.status);
//!     Ok(())
//! }
//! ```

mod backend;
pub mod error;
mod parsing;
mod stream;

// Re-export commonly used types
pub use backend::ParsingBackend;
pub use error::{ClientError, Result};
pub use stream::{SnapshotStream, decode_snapshot};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the parsing backend
///
/// Endpoints are grouped as:
/// - Reference data (sources, styles, modes)
/// - Job lifecycle (start, special imports, stop, status)
/// - Parsing history
/// - Live status subscription
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8000")
    ///
    /// # Example
    /// ```
    /// use tally_client::BackendClient;
    ///
    /// let client = BackendClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use tally_client::BackendClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = BackendClient::with_client("http://localhost:8000", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// WebSocket counterpart of the base URL
    pub fn ws_base_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
