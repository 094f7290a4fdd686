//! Parsing-related API endpoints

use crate::BackendClient;
use crate::error::Result;
use tally_core::domain::catalog::{ParsingMode, ParsingSource, ParsingStyle, ReferenceCatalog};
use tally_core::domain::descriptor::JobDescriptor;
use tally_core::domain::job::{JobId, SpecialImport, StatusSnapshot};
use tally_core::domain::log::ParsingLog;
use tally_core::dto::job::{CancelAck, StartParsingRequest, StartedJob};

impl BackendClient {
    // =============================================================================
    // Reference Data
    // =============================================================================

    /// List all parsing sources
    pub async fn list_sources(&self) -> Result<Vec<ParsingSource>> {
        let url = format!("{}/api/parsing/sources", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all parsing styles
    pub async fn list_styles(&self) -> Result<Vec<ParsingStyle>> {
        let url = format!("{}/api/parsing/styles", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List the parsing modes and their parameter schemas
    pub async fn list_modes(&self) -> Result<Vec<ParsingMode>> {
        let url = format!("{}/api/parsing/modes", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Fetch sources, styles and modes concurrently
    pub async fn fetch_catalog(&self) -> Result<ReferenceCatalog> {
        let (sources, styles, modes) =
            tokio::try_join!(self.list_sources(), self.list_styles(), self.list_modes())?;

        Ok(ReferenceCatalog {
            sources,
            styles,
            modes,
        })
    }

    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a general parsing job
    ///
    /// The descriptor is sent as-is; validate it against a catalog first.
    ///
    /// # Example
    /// ```no_run
    /// # use tally_client::BackendClient;
    /// # use tally_core::domain::descriptor::JobDescriptor;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = BackendClient::new("http://localhost:8000");
    /// let started = client
    ///     .start_parsing(&JobDescriptor::new(1, 1).with_option("days", 7))
    ///     .await?;
    /// println!("started job {}", started.job_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start_parsing(&self, descriptor: &JobDescriptor) -> Result<StartedJob> {
        let url = format!("{}/api/parsing/start", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&StartParsingRequest::from(descriptor))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Start one of the fixed import scripts
    pub async fn start_special(&self, import: SpecialImport) -> Result<StartedJob> {
        let endpoint = match import {
            SpecialImport::Orders => "orders",
            SpecialImport::GoogleSheets => "googlesheets",
        };
        let url = format!("{}/api/parsing/{}", self.base_url, endpoint);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Ask the backend to stop a running job
    ///
    /// Acceptance does not mean the job has stopped; watch its status for a
    /// terminal value.
    pub async fn stop_parsing(&self, job_id: JobId) -> Result<CancelAck> {
        let url = format!("{}/api/parsing/stop/{}", self.base_url, job_id);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get the current status of a job
    pub async fn parsing_status(&self, job_id: JobId) -> Result<StatusSnapshot> {
        let url = format!("{}/api/parsing/status/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // History
    // =============================================================================

    /// List the most recent parsing jobs
    ///
    /// # Arguments
    /// * `limit` - Maximum number of records to return
    pub async fn parsing_logs(&self, limit: u32) -> Result<Vec<ParsingLog>> {
        let url = format!("{}/api/parsing/logs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
