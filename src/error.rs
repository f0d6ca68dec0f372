//! Error taxonomy for the upload workflow
//!
//! Every failure a user can see maps onto one [`WorkflowError`] variant. Polling
//! running out of attempts is not an error; see [`crate::poller::Outcome`].

use thiserror::Error;

/// Rejected user input (missing credentials, unreadable or non-PDF file)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Both API Endpoint and API Key are required")]
    MissingCredentials,

    #[error("Only PDF files can be uploaded: {0}")]
    NotPdf(String),

    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Failure of one step of the upload workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The API rejected the key. The session has been de-authenticated.
    #[error("Authentication failed. Please check your API key.")]
    Authentication,

    #[error("Error getting presigned URL (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Error calling API: {message}")]
    Transport { message: String },

    #[error("Unexpected response from API: {0}")]
    MalformedResponse(String),

    #[error("Failed to upload file: {reason}")]
    Upload { reason: String },

    #[error("Failed to download result: {reason}")]
    Download { reason: String },
}

impl WorkflowError {
    /// Build a transport error from a reqwest failure, keeping the source chain
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        WorkflowError::Transport {
            message: error_chain(err),
        }
    }

    /// Whether this failure revoked the session
    pub fn is_authentication(&self) -> bool {
        matches!(self, WorkflowError::Authentication)
    }
}

/// Render an error and all of its sources on one line
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_workflow_error() {
        let err: WorkflowError = ValidationError::MissingCredentials.into();
        assert_eq!(err, WorkflowError::Validation(ValidationError::MissingCredentials));
        assert_eq!(err.to_string(), "Both API Endpoint and API Key are required");
    }

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let err = WorkflowError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error getting presigned URL (HTTP 503): service unavailable"
        );
        assert!(!err.is_authentication());
    }

    #[test]
    fn test_error_chain_joins_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = anyhow::Error::new(inner).context("error sending request");
        let err: &(dyn std::error::Error + 'static) = outer.as_ref();
        let message = error_chain(err);
        assert_eq!(message, "error sending request: refused");
    }

    #[test]
    fn test_download_message_names_the_download() {
        let err = WorkflowError::Download {
            reason: "HTTP 404: NoSuchKey".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to download result: HTTP 404: NoSuchKey");
    }

    #[test]
    fn test_authentication_flag() {
        assert!(WorkflowError::Authentication.is_authentication());
        assert!(!WorkflowError::MalformedResponse("x".into()).is_authentication());
    }
}
