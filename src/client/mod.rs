use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::records::{EditField, Record};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("failed to build HTTP client: {source}")]
    Build {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server answered {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode record list: {source}")]
    Decode {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Serialize)]
struct EditBody<'a> {
    field: &'static str,
    value: &'a str,
}

/// Client side of the record API. All calls are best-effort from the UI's
/// point of view: the caller has already applied the edit locally before
/// `submit_edit` runs, and a failure only produces a notice.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: reqwest::Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ClientError> {
        let base = reqwest::Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: e.to_string(),
            }
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|source| ClientError::Build { source })?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base
    }

    fn records_url(&self) -> String {
        format!("{}/records", self.base.as_str().trim_end_matches('/'))
    }

    fn record_url(&self, id: i64) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    /// Fetch the full record list. Callers treat any error as an empty list;
    /// the error is still returned so the presentation layer can raise a
    /// notice.
    pub async fn fetch_all(&self) -> Result<Vec<Record>, ClientError> {
        let url = self.records_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                url,
                status: response.status(),
            });
        }
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|source| ClientError::Decode { source })
    }

    /// Push one field edit for one record. The local record was already
    /// updated; nothing is rolled back on failure.
    pub async fn submit_edit(
        &self,
        id: i64,
        field: EditField,
        value: &str,
    ) -> Result<(), ClientError> {
        let url = self.record_url(id);
        let body = EditBody {
            field: field.as_str(),
            value,
        };
        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                url,
                status: response.status(),
            });
        }
        Ok(())
    }
}
