//! HTTP client for the extraction API and its pre-signed storage URLs

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::api::types::{PresignedUrlPair, UrlRequest, UrlResponse};
use crate::error::{error_chain, WorkflowError};
use crate::poller::Probe;
use crate::session::Session;

const API_KEY_HEADER: &str = "x-api-key";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Client wrapper issuing exactly one request per operation
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Ask the API for an upload URL and a download URL for `file_name`.
    ///
    /// A 401 revokes `session` before returning [`WorkflowError::Authentication`].
    pub async fn request_urls(
        &self,
        session: &mut Session,
        file_name: &str,
    ) -> Result<PresignedUrlPair, WorkflowError> {
        tracing::debug!("Requesting presigned URLs for {}", file_name);

        let response = self
            .client
            .post(session.endpoint())
            .header(API_KEY_HEADER, session.api_key())
            .json(&UrlRequest { file_name })
            .send()
            .await
            .map_err(|e| WorkflowError::transport(&e))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| WorkflowError::transport(&e))?;
                let parsed: UrlResponse = serde_json::from_slice(&body)
                    .map_err(|e| WorkflowError::MalformedResponse(e.to_string()))?;
                PresignedUrlPair::try_from(parsed)
            }
            StatusCode::UNAUTHORIZED => {
                session.revoke();
                Err(WorkflowError::Authentication)
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("Presigned URL request failed with {}: {}", status, body);
                Err(WorkflowError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// PUT the raw PDF bytes to a pre-signed upload URL
    pub async fn upload_file(&self, upload_url: &str, content: Bytes) -> Result<(), WorkflowError> {
        tracing::debug!("Uploading {} bytes", content.len());

        let response = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, PDF_CONTENT_TYPE)
            .body(content)
            .send()
            .await
            .map_err(|e| WorkflowError::Upload {
                reason: error_chain(&e),
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(WorkflowError::Upload {
                reason: format!("storage responded with HTTP {}", status.as_u16()),
            }),
        }
    }

    /// Fetch the processed result once it is available
    pub async fn download(&self, download_url: &str) -> Result<Bytes, WorkflowError> {
        let response = self
            .client
            .get(download_url)
            .send()
            .await
            .map_err(|e| WorkflowError::Download {
                reason: error_chain(&e),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Download {
                reason: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        response.bytes().await.map_err(|e| WorkflowError::Download {
            reason: error_chain(&e),
        })
    }
}

impl Probe for ApiClient {
    async fn probe(&self, url: &str) -> Result<StatusCode> {
        let response = self.client.head(url).send().await?;
        Ok(response.status())
    }
}
