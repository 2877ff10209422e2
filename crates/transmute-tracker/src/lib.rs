//! Transmute tracker
//!
//! Client-side lifecycle tracking for uploads and their conversions: submit a
//! file, keep a newest-first list of files with completed conversions, and
//! download or delete entries with at most one operation in flight per id.

pub mod error;
pub mod list;
pub mod operation;
pub mod tracker;
pub mod upload;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{TrackerError, TrackerResult};
pub use list::{completed_view, ListPhase, RefreshOutcome};
pub use operation::{OperationKey, OperationKind, OperationRegistry, OperationToken};
pub use tracker::{ConversionTracker, DownloadedArtifact, TrackerSnapshot};
pub use upload::{UploadPhase, UploadReceipt, UploadSnapshot};
