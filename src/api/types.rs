//! API data types

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WorkflowError};

/// Body of the presigned-URL request
#[derive(Debug, Clone, Serialize)]
pub struct UrlRequest<'a> {
    pub file_name: &'a str,
}

/// Raw presigned-URL response; fields are checked in [`PresignedUrlPair::try_from`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlResponse {
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Upload and download locations for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrlPair {
    pub upload_url: String,
    pub download_url: String,
}

impl TryFrom<UrlResponse> for PresignedUrlPair {
    type Error = WorkflowError;

    fn try_from(response: UrlResponse) -> Result<Self, Self::Error> {
        match (response.upload_url, response.download_url) {
            (Some(upload_url), Some(download_url)) => Ok(Self {
                upload_url,
                download_url,
            }),
            (None, _) => Err(WorkflowError::MalformedResponse(
                "missing field `upload_url`".to_string(),
            )),
            (_, None) => Err(WorkflowError::MalformedResponse(
                "missing field `download_url`".to_string(),
            )),
        }
    }
}

impl PresignedUrlPair {
    /// File name to save the result under, taken from the download URL path
    pub fn result_file_name(&self) -> String {
        url::Url::parse(&self.download_url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "transactions.csv".to_string())
    }
}

/// A selected statement file
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub content: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a PDF from disk. Other extensions are rejected before any I/O.
    pub async fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let display = path.display().to_string();

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            return Err(ValidationError::NotPdf(display));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| ValidationError::Unreadable {
                path: display.clone(),
                reason: "no file name".to_string(),
            })?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable {
                path: display,
                reason: e.to_string(),
            })?;

        Ok(Self::new(name, content))
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Get a human-readable size string
    pub fn size_string(&self) -> String {
        const KB: usize = 1024;
        const MB: usize = KB * 1024;

        let size = self.size();
        if size >= MB {
            format!("{:.2} MB", size as f64 / MB as f64)
        } else if size >= KB {
            format!("{:.2} KB", size as f64 / KB as f64)
        } else {
            format!("{} B", size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_url_request_body() {
        let body = serde_json::to_value(UrlRequest { file_name: "stmt.pdf" }).unwrap();
        assert_eq!(body, serde_json::json!({ "file_name": "stmt.pdf" }));
    }

    #[test]
    fn test_pair_from_complete_response() {
        let response: UrlResponse = serde_json::from_str(
            r#"{"upload_url": "https://s3/up", "download_url": "https://s3/down.csv", "extra": 1}"#,
        )
        .unwrap();
        let pair = PresignedUrlPair::try_from(response).unwrap();
        assert_eq!(pair.upload_url, "https://s3/up");
        assert_eq!(pair.download_url, "https://s3/down.csv");
    }

    #[test]
    fn test_pair_missing_fields() {
        let response: UrlResponse =
            serde_json::from_str(r#"{"upload_url": "https://s3/up"}"#).unwrap();
        let err = PresignedUrlPair::try_from(response).unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedResponse(ref m) if m.contains("download_url")));

        let err = PresignedUrlPair::try_from(UrlResponse::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedResponse(ref m) if m.contains("upload_url")));
    }

    #[test]
    fn test_result_file_name() {
        let pair = PresignedUrlPair {
            upload_url: String::new(),
            download_url: "https://bucket.s3.amazonaws.com/output/stmt.csv?X-Amz-Signature=abc"
                .to_string(),
        };
        assert_eq!(pair.result_file_name(), "stmt.csv");

        let pair = PresignedUrlPair {
            upload_url: String::new(),
            download_url: "not a url".to_string(),
        };
        assert_eq!(pair.result_file_name(), "transactions.csv");
    }

    #[test]
    fn test_size_string() {
        assert_eq!(FileHandle::new("a.pdf", vec![0u8; 512]).size_string(), "512 B");
        assert_eq!(FileHandle::new("a.pdf", vec![0u8; 2048]).size_string(), "2.00 KB");
        assert_eq!(
            FileHandle::new("a.pdf", vec![0u8; 3 * 1024 * 1024]).size_string(),
            "3.00 MB"
        );
    }

    #[tokio::test]
    async fn test_from_path_reads_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Statement.PDF");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let handle = FileHandle::from_path(&path).await.unwrap();
        assert_eq!(handle.name, "Statement.PDF");
        assert_eq!(&handle.content[..], b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_from_path_rejects_other_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = FileHandle::from_path(&path).await.unwrap_err();
        assert!(matches!(err, ValidationError::NotPdf(_)));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.pdf");

        let err = FileHandle::from_path(&path).await.unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }
}
