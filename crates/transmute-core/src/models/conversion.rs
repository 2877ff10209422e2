use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::file::FileRecord;

/// Lifecycle of one derived artifact.
///
/// Only `Complete` conversions are enumerable through the completed listing.
/// The processor may report `Failed`; the tracker treats it like `Pending` and
/// keeps such conversions out of its view.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,
    #[default]
    #[serde(alias = "completed")]
    Complete,
    Failed,
}

impl Display for ConversionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConversionStatus::Pending => write!(f, "pending"),
            ConversionStatus::Complete => write!(f, "complete"),
            ConversionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ConversionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConversionStatus::Pending),
            "complete" | "completed" => Ok(ConversionStatus::Complete),
            "failed" => Ok(ConversionStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid conversion status: {}", s)),
        }
    }
}

/// One derived artifact produced from a [`FileRecord`].
///
/// The listing embeds the converted file's own metadata; everything except
/// `id` and `extension` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub status: ConversionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
}

impl ConversionRecord {
    pub fn new(id: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extension: extension.into(),
            status: ConversionStatus::Complete,
            original_filename: None,
            media_type: None,
            size_bytes: None,
            sha256_checksum: None,
        }
    }

    pub fn with_status(mut self, status: ConversionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == ConversionStatus::Complete
    }
}

/// Body of `GET /conversions/complete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionListResponse {
    #[serde(default)]
    pub conversions: Vec<FileRecord>,
}

/// Body of `POST /conversions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    pub output_format: String,
}

/// Reply to a conversion request. The processor answers 200 with `error` set
/// when no converter handles the requested pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionRequestResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
