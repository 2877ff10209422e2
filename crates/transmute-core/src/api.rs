//! Seam between the tracking client and the remote store.
//!
//! The HTTP client implements this trait; tests use an in-memory store. The
//! tracker only ever talks to the store through these four operations.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ClientError;
use crate::models::{ConversionListResponse, FilePayload, UploadResponse};

#[async_trait]
pub trait ConversionApi: Send + Sync {
    /// Submit one file. The reply carries the new id and its compatible formats.
    async fn upload_file(&self, payload: FilePayload) -> Result<UploadResponse, ClientError>;

    /// Fetch the files that have a completed conversion attached.
    async fn list_complete_conversions(&self) -> Result<ConversionListResponse, ClientError>;

    /// Fetch the raw bytes of an original or converted artifact.
    async fn download_file(&self, id: &str) -> Result<Bytes, ClientError>;

    /// Delete a file together with all of its conversions.
    async fn delete_file(&self, id: &str) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: ConversionApi + ?Sized> ConversionApi for std::sync::Arc<T> {
    async fn upload_file(&self, payload: FilePayload) -> Result<UploadResponse, ClientError> {
        (**self).upload_file(payload).await
    }

    async fn list_complete_conversions(&self) -> Result<ConversionListResponse, ClientError> {
        (**self).list_complete_conversions().await
    }

    async fn download_file(&self, id: &str) -> Result<Bytes, ClientError> {
        (**self).download_file(id).await
    }

    async fn delete_file(&self, id: &str) -> Result<(), ClientError> {
        (**self).delete_file(id).await
    }
}
