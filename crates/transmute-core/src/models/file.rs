use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversion::ConversionRecord;
use super::timestamp;

/// Immutable metadata captured by the store when a file is uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub original_filename: String,
    pub media_type: String,
    pub extension: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// One uploaded file together with the conversions derived from it.
///
/// The listing endpoint embeds a single `conversion` object per file; an
/// optional `conversions` array is accepted as well, and both are folded into
/// [`FileRecord::conversions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FileRecordWire")]
pub struct FileRecord {
    pub id: String,
    pub original_filename: String,
    pub media_type: String,
    pub extension: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub conversions: Vec<ConversionRecord>,
}

impl FileRecord {
    /// Whether at least one conversion of this file has completed.
    pub fn has_completed_conversion(&self) -> bool {
        self.conversions.iter().any(ConversionRecord::is_complete)
    }

    pub fn completed_conversions(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.conversions.iter().filter(|c| c.is_complete())
    }

    pub fn conversion(&self, conversion_id: &str) -> Option<&ConversionRecord> {
        self.conversions.iter().find(|c| c.id == conversion_id)
    }

    /// Add conversions not already present (matched by id).
    pub fn merge_conversions<I>(&mut self, conversions: I)
    where
        I: IntoIterator<Item = ConversionRecord>,
    {
        for conversion in conversions {
            if self.conversion(&conversion.id).is_none() {
                self.conversions.push(conversion);
            }
        }
    }
}

#[derive(Deserialize)]
struct FileRecordWire {
    id: String,
    #[serde(default)]
    original_filename: String,
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    extension: String,
    #[serde(default)]
    size_bytes: u64,
    #[serde(default)]
    sha256_checksum: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    conversion: Option<ConversionRecord>,
    #[serde(default)]
    conversions: Vec<ConversionRecord>,
}

impl From<FileRecordWire> for FileRecord {
    fn from(wire: FileRecordWire) -> Self {
        let mut record = FileRecord {
            id: wire.id,
            original_filename: wire.original_filename,
            media_type: wire.media_type,
            extension: wire.extension,
            size_bytes: wire.size_bytes,
            sha256_checksum: wire.sha256_checksum,
            // Records without a timestamp sort last.
            created_at: wire.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
            conversions: Vec::new(),
        };
        record.merge_conversions(wire.conversion);
        record.merge_conversions(wire.conversions);
        record
    }
}
