//! Domain methods for the Transmute API client.
//!
//! Response types live in `transmute_core::models`.

use async_trait::async_trait;
use bytes::Bytes;
use transmute_core::models::{
    parse_not_ready_body, AppInfo, ConversionListResponse, ConversionRequest,
    ConversionRequestResponse, FileListResponse, FileMetadata, FilePayload, HealthStatus,
    ReadinessResponse, UploadResponse,
};
use transmute_core::{ClientError, ConversionApi};

use crate::ApiClient;

/// Status reported when the processor answers 200 but refuses the conversion.
const UNPROCESSABLE: u16 = 422;

impl ApiClient {
    /// Upload a single file. Empty payloads are refused before any request is made.
    pub async fn upload_file(&self, payload: FilePayload) -> Result<UploadResponse, ClientError> {
        if payload.is_empty() {
            return Err(ClientError::EmptyInput);
        }

        let mut part = reqwest::multipart::Part::bytes(payload.bytes.to_vec())
            .file_name(payload.filename.clone());
        if let Some(content_type) = payload.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                ClientError::InvalidInput(format!("Invalid content type {}: {}", content_type, e))
            })?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart("/files/", form).await
    }

    /// List files that have a completed conversion attached.
    pub async fn list_complete_conversions(&self) -> Result<ConversionListResponse, ClientError> {
        self.get("/conversions/complete").await
    }

    /// List every uploaded file regardless of conversion state.
    pub async fn list_files(&self) -> Result<Vec<FileMetadata>, ClientError> {
        let response: FileListResponse = self.get("/files/").await?;
        Ok(response.files)
    }

    /// Download the raw bytes of an original or converted artifact.
    pub async fn download_file(&self, id: &str) -> Result<Bytes, ClientError> {
        let segment = Self::path_segment(id)?;
        self.get_bytes(&format!("/files/{}", segment)).await
    }

    /// Delete a file and its conversions.
    pub async fn delete_file(&self, id: &str) -> Result<(), ClientError> {
        let segment = Self::path_segment(id)?;
        self.delete(&format!("/files/{}", segment)).await
    }

    /// Ask the processor to convert a stored file into `output_format`.
    pub async fn request_conversion(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionRequestResponse, ClientError> {
        Self::path_segment(&request.id)?;
        if request.output_format.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "Output format must not be empty".to_string(),
            ));
        }

        let response: ConversionRequestResponse =
            self.post_json("/conversions/", request).await?;
        if let Some(error) = response.error {
            return Err(ClientError::rejected(UNPROCESSABLE, error));
        }
        Ok(response)
    }

    /// Application name and version.
    pub async fn app_info(&self) -> Result<AppInfo, ClientError> {
        self.get("/health/info").await
    }

    /// Liveness probe.
    pub async fn liveness(&self) -> Result<HealthStatus, ClientError> {
        self.get("/health/live").await
    }

    /// Readiness probe. A 503 with a readiness body is returned as a not-ready
    /// report rather than an error.
    pub async fn readiness(&self) -> Result<ReadinessResponse, ClientError> {
        let response = self.get_raw("/health/ready").await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(ClientError::from);
        }

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            if let Some(report) = parse_not_ready_body(&body) {
                return Ok(report);
            }
        }

        Err(ClientError::rejected(status.as_u16(), body))
    }
}

#[async_trait]
impl ConversionApi for ApiClient {
    async fn upload_file(&self, payload: FilePayload) -> Result<UploadResponse, ClientError> {
        ApiClient::upload_file(self, payload).await
    }

    async fn list_complete_conversions(&self) -> Result<ConversionListResponse, ClientError> {
        ApiClient::list_complete_conversions(self).await
    }

    async fn download_file(&self, id: &str) -> Result<Bytes, ClientError> {
        ApiClient::download_file(self, id).await
    }

    async fn delete_file(&self, id: &str) -> Result<(), ClientError> {
        ApiClient::delete_file(self, id).await
    }
}
