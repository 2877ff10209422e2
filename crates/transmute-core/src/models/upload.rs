use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::ClientError;

/// A single file to submit for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Read a local file into a payload named after its final path component.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(ClientError::InvalidInput(format!(
                "Refusing path with parent components: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path).map_err(|e| {
            ClientError::InvalidInput(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self::new(filename, bytes))
    }
}

/// Metadata returned for a freshly stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub id: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub sha256_checksum: Option<String>,
    /// Formats the server can convert this file into. Informational only.
    #[serde(default)]
    pub compatible_formats: Vec<String>,
}

/// Body of `POST /files/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub metadata: UploadMetadata,
}

/// Body of `GET /files/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<super::FileMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_upload_response_ignores_server_only_fields() {
        let json = r#"{
            "message": "File uploaded successfully",
            "metadata": {
                "id": "123e4567-e89b-12d3-a456-426614174000",
                "storage_path": "data/uploads/123e4567.jpg",
                "original_filename": "example.jpg",
                "media_type": "jpg",
                "extension": ".jpg",
                "size_bytes": 204800,
                "sha256_checksum": "abc123",
                "compatible_formats": ["png", "webp"]
            }
        }"#;

        let response: UploadResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.metadata.id, "123e4567-e89b-12d3-a456-426614174000");
        assert_eq!(response.metadata.compatible_formats, vec!["png", "webp"]);
        assert_eq!(response.metadata.size_bytes, Some(204800));
    }

    #[test]
    fn test_upload_response_minimal_metadata() {
        let response: UploadResponse =
            serde_json::from_str(r#"{"metadata": {"id": "x"}}"#).unwrap();
        assert!(response.metadata.compatible_formats.is_empty());
        assert_eq!(response.message, None);
    }

    #[test]
    fn test_payload_from_path() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"hello").unwrap();

        let payload = FilePayload::from_path(file.path()).unwrap();

        assert_eq!(payload.len(), 5);
        assert!(payload.filename.ends_with(".txt"));
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_payload_from_path_rejects_parent_components() {
        let err = FilePayload::from_path(Path::new("../secret.txt")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[test]
    fn test_payload_from_missing_path() {
        let err = FilePayload::from_path(Path::new("/definitely/not/here.bin")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
