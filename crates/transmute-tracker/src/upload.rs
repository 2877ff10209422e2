//! Upload submission state.
//!
//! Submission is single-flight per tracker: while one upload is outstanding
//! further submissions are refused. The slot is released by a guard, so the
//! state always returns to `Idle` once the request settles.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use transmute_core::models::UploadResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    Uploading { filename: String },
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub file_id: String,
    pub filename: String,
    /// Formats the server reported as reachable. Does not start a conversion.
    pub compatible_formats: Vec<String>,
}

impl UploadReceipt {
    pub(crate) fn from_response(filename: String, response: UploadResponse) -> Self {
        Self {
            file_id: response.metadata.id,
            filename: response.metadata.original_filename.unwrap_or(filename),
            compatible_formats: response.metadata.compatible_formats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSnapshot {
    pub phase: UploadPhase,
    pub error: Option<String>,
    pub last_receipt: Option<UploadReceipt>,
}

impl Default for UploadSnapshot {
    fn default() -> Self {
        Self {
            phase: UploadPhase::Idle,
            error: None,
            last_receipt: None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct UploadSlot {
    state: Mutex<UploadSnapshot>,
}

impl UploadSlot {
    fn lock(&self) -> MutexGuard<'_, UploadSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> UploadSnapshot {
        self.lock().clone()
    }

    /// Enter `Uploading` unless an upload is already outstanding.
    pub(crate) fn try_begin(self: &Arc<Self>, filename: &str) -> Option<UploadGuard> {
        let mut state = self.lock();
        if let UploadPhase::Uploading { .. } = state.phase {
            return None;
        }
        state.phase = UploadPhase::Uploading {
            filename: filename.to_string(),
        };
        state.error = None;
        Some(UploadGuard {
            slot: Arc::clone(self),
        })
    }

    pub(crate) fn succeed(&self, receipt: UploadReceipt) {
        let mut state = self.lock();
        state.last_receipt = Some(receipt);
        state.error = None;
    }

    pub(crate) fn fail(&self, message: String) {
        self.lock().error = Some(message);
    }

    pub(crate) fn clear_error(&self) {
        self.lock().error = None;
    }
}

pub(crate) struct UploadGuard {
    slot: Arc<UploadSlot>,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.slot.lock().phase = UploadPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_and_release() {
        let slot = Arc::new(UploadSlot::default());

        let guard = slot.try_begin("a.png").unwrap();
        assert_eq!(
            slot.snapshot().phase,
            UploadPhase::Uploading {
                filename: "a.png".to_string()
            }
        );
        assert!(slot.try_begin("b.png").is_none());

        drop(guard);
        assert_eq!(slot.snapshot().phase, UploadPhase::Idle);
        assert!(slot.try_begin("b.png").is_some());
    }

    #[test]
    fn test_new_upload_clears_previous_error() {
        let slot = Arc::new(UploadSlot::default());
        {
            let _guard = slot.try_begin("a.png").unwrap();
            slot.fail("Request failed (500)".to_string());
        }
        assert_eq!(slot.snapshot().error.as_deref(), Some("Request failed (500)"));
        assert_eq!(slot.snapshot().phase, UploadPhase::Idle);

        let _guard = slot.try_begin("a.png").unwrap();
        assert_eq!(slot.snapshot().error, None);
    }
}
