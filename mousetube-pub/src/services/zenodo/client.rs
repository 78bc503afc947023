//! Zenodo deposition API client
//!
//! Thin client over the deposition endpoints the pipeline drives: create a
//! draft, upload a file, replace metadata, publish, and list/delete files.
//! Every request carries the access token as a query parameter and runs
//! under an explicit timeout so a stalled remote call cannot hang a worker.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Zenodo client errors
#[derive(Debug, Error)]
pub enum ZenodoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Zenodo API error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected Zenodo response: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Draft deposition as returned by Zenodo
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Deposition {
    /// Deposition identifier
    pub id: i64,
    /// Minted DOI, present after publish
    pub doi: Option<String>,
}

/// A file attached to a deposition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepositionFile {
    pub id: String,
    pub filename: String,
}

/// Zenodo API client
pub struct ZenodoClient {
    http_client: reqwest::Client,
    api_base: String,
    token: String,
}

impl ZenodoClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self, ZenodoError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn depositions_url(&self) -> String {
        format!("{}/deposit/depositions", self.api_base)
    }

    /// Public record base URL, derived by stripping the `/api` suffix
    pub fn records_base(&self) -> String {
        match self.api_base.find("/api") {
            Some(idx) => self.api_base[..idx].to_string(),
            None => self.api_base.clone(),
        }
    }

    /// Create an empty draft deposition and return its identifier
    pub async fn create_deposition(&self) -> Result<i64, ZenodoError> {
        let response = self
            .http_client
            .post(self.depositions_url())
            .query(&[("access_token", &self.token)])
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        let deposition: Deposition = response
            .json()
            .await
            .map_err(|e| ZenodoError::Parse(e.to_string()))?;

        tracing::info!(deposition_id = deposition.id, "Created Zenodo draft deposition");
        Ok(deposition.id)
    }

    /// Upload a local file into a draft deposition
    pub async fn upload_file(
        &self,
        deposition_id: &str,
        filename: &str,
        local_path: &Path,
    ) -> Result<(), ZenodoError> {
        let bytes = tokio::fs::read(local_path).await?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/{}/files", self.depositions_url(), deposition_id);
        let response = self
            .http_client
            .post(&url)
            .query(&[("access_token", &self.token)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        check_status(response).await?;

        tracing::debug!(deposition_id = %deposition_id, filename = %filename, "Uploaded file to deposition");
        Ok(())
    }

    /// Replace the descriptive metadata of a draft deposition
    pub async fn put_metadata(
        &self,
        deposition_id: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), ZenodoError> {
        let url = format!("{}/{}", self.depositions_url(), deposition_id);
        let response = self
            .http_client
            .put(&url)
            .query(&[("access_token", &self.token)])
            .json(&serde_json::json!({ "metadata": metadata }))
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    /// Publish a deposition, returning the record with its minted DOI
    pub async fn publish(&self, deposition_id: &str) -> Result<Deposition, ZenodoError> {
        let url = format!("{}/{}/actions/publish", self.depositions_url(), deposition_id);
        let response = self
            .http_client
            .post(&url)
            .query(&[("access_token", &self.token)])
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ZenodoError::Parse(e.to_string()))
    }

    /// List the files attached to a deposition
    pub async fn list_files(
        &self,
        deposition_id: &str,
    ) -> Result<Vec<DepositionFile>, ZenodoError> {
        let url = format!("{}/{}/files", self.depositions_url(), deposition_id);
        let response = self
            .http_client
            .get(&url)
            .query(&[("access_token", &self.token)])
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ZenodoError::Parse(e.to_string()))
    }

    /// Remove a file from a draft deposition
    pub async fn delete_file(
        &self,
        deposition_id: &str,
        file_id: &str,
    ) -> Result<(), ZenodoError> {
        let url = format!("{}/{}/files/{}", self.depositions_url(), deposition_id, file_id);
        let response = self
            .http_client
            .delete(&url)
            .query(&[("access_token", &self.token)])
            .send()
            .await
            .map_err(|e| ZenodoError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ZenodoError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ZenodoError::Api(status.as_u16(), body));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_base_strips_api_suffix() {
        let client = ZenodoClient::new("https://sandbox.zenodo.org/api", "token").unwrap();
        assert_eq!(client.records_base(), "https://sandbox.zenodo.org");

        let client = ZenodoClient::new("https://sandbox.zenodo.org/api/", "token").unwrap();
        assert_eq!(client.records_base(), "https://sandbox.zenodo.org");
    }

    #[test]
    fn depositions_url_shape() {
        let client = ZenodoClient::new("https://zenodo.org/api", "token").unwrap();
        assert_eq!(
            client.depositions_url(),
            "https://zenodo.org/api/deposit/depositions"
        );
    }
}
