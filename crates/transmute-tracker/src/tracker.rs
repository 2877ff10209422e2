//! Conversion tracking client.
//!
//! Holds the local, newest-first view of files that have at least one completed
//! conversion, and mediates the operations a presentation layer can trigger:
//! upload, refresh, download and delete. Downloads and deletes are single-flight
//! per entity id; distinct ids proceed concurrently.
//!
//! The view is only as fresh as its last refresh. Nothing polls in the
//! background; the caller decides when to refresh.

use bytes::Bytes;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use transmute_core::models::{FilePayload, FileRecord};
use transmute_core::{derive_download_filename, ClientError, ConversionApi, ErrorMetadata, LogLevel};

use crate::error::{TrackerError, TrackerResult};
use crate::list::{ListPhase, ListState, RefreshOutcome};
use crate::operation::{OperationKey, OperationKind, OperationRegistry};
use crate::upload::{UploadReceipt, UploadSlot, UploadSnapshot};

/// Bytes of a converted artifact, ready to be saved locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub conversion_id: String,
    /// Original base name with the conversion's target extension.
    pub filename: String,
    pub bytes: Bytes,
}

/// Consistent view of the tracker for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub records: Arc<[FileRecord]>,
    pub phase: ListPhase,
    /// Last surfaced download/delete failure.
    pub error: Option<String>,
    pub upload: UploadSnapshot,
    pub busy: Vec<OperationKey>,
}

impl TrackerSnapshot {
    pub fn is_downloading(&self, conversion_id: &str) -> bool {
        self.is_busy(OperationKind::Download, conversion_id)
    }

    pub fn is_deleting(&self, file_id: &str) -> bool {
        self.is_busy(OperationKind::Delete, file_id)
    }

    fn is_busy(&self, kind: OperationKind, id: &str) -> bool {
        self.busy
            .iter()
            .any(|key| key.kind == kind && key.entity_id == id)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    list: ListState,
    error: Option<String>,
}

struct TrackerInner<A> {
    api: A,
    state: Mutex<TrackerState>,
    operations: Arc<OperationRegistry>,
    upload: Arc<UploadSlot>,
}

/// Client-side tracker for uploads and their completed conversions.
///
/// Cloning is cheap and every clone shares the same state, so operations can
/// be driven from several tasks at once.
pub struct ConversionTracker<A> {
    inner: Arc<TrackerInner<A>>,
}

impl<A> Clone for ConversionTracker<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ConversionApi> ConversionTracker<A> {
    pub fn new(api: A) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                api,
                state: Mutex::new(TrackerState::default()),
                operations: OperationRegistry::new(),
                upload: Arc::new(UploadSlot::default()),
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current list, phase, errors and busy markers, captured atomically with
    /// respect to list mutations.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let (records, phase, error) = {
            let state = self.state();
            (
                state.list.records(),
                state.list.phase().clone(),
                state.error.clone(),
            )
        };
        TrackerSnapshot {
            records,
            phase,
            error,
            upload: self.inner.upload.snapshot(),
            busy: self.inner.operations.active_keys(),
        }
    }

    pub fn records(&self) -> Arc<[FileRecord]> {
        self.state().list.records()
    }

    pub fn phase(&self) -> ListPhase {
        self.state().list.phase().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Dismiss the surfaced download/delete and upload errors.
    pub fn clear_error(&self) {
        self.state().error = None;
        self.inner.upload.clear_error();
    }

    pub fn is_busy(&self, kind: OperationKind, entity_id: &str) -> bool {
        self.inner.operations.is_active(kind, entity_id)
    }

    /// The listed file owning `conversion_id`, if it is in the current view.
    pub fn find_conversion(&self, conversion_id: &str) -> Option<FileRecord> {
        self.state().list.find_conversion(conversion_id).cloned()
    }

    /// Submit one file.
    ///
    /// `None` or a zero-byte payload is ignored (`Ok(None)`) without contacting
    /// the store. The payload is consumed either way, so the caller's input is
    /// cleared and the same file can be submitted again.
    pub async fn upload(&self, payload: Option<FilePayload>) -> TrackerResult<Option<UploadReceipt>> {
        let payload = match payload {
            Some(p) if !p.is_empty() => p,
            _ => {
                tracing::debug!("Upload ignored: no file provided");
                return Ok(None);
            }
        };

        let filename = payload.filename.clone();
        let _guard = self.inner.upload.try_begin(&filename).ok_or_else(|| {
            tracing::debug!(filename = %filename, "Upload refused: another upload is in flight");
            TrackerError::AlreadyInFlight {
                kind: OperationKind::Upload,
                id: filename.clone(),
            }
        })?;

        tracing::debug!(filename = %filename, size_bytes = payload.len(), "Uploading file");

        match self.inner.api.upload_file(payload).await {
            Ok(response) => {
                let receipt = UploadReceipt::from_response(filename, response);
                tracing::info!(
                    file_id = %receipt.file_id,
                    compatible_formats = ?receipt.compatible_formats,
                    "File uploaded"
                );
                self.inner.upload.succeed(receipt.clone());
                Ok(Some(receipt))
            }
            Err(ClientError::EmptyInput) => {
                tracing::debug!(filename = %filename, "Upload ignored: empty payload");
                Ok(None)
            }
            Err(err) => {
                log_failure(OperationKind::Upload, &filename, &err);
                self.inner.upload.fail(err.client_message());
                Err(err.into())
            }
        }
    }

    /// Replace the local list with the store's completed conversions.
    ///
    /// On failure the previous list is kept and the phase becomes `Errored`.
    /// A response that arrives after a newer refresh was applied is discarded.
    ///
    /// Dropping the returned future before it completes (for example under a
    /// timeout) abandons its ticket, so the phase still reaches a terminal state.
    pub async fn refresh(&self) -> TrackerResult<RefreshOutcome> {
        let ticket = self.state().list.begin_refresh();
        let _pending = PendingRefresh {
            state: &self.inner.state,
            ticket,
        };
        tracing::debug!(ticket, "Refreshing completed conversions");

        match self.inner.api.list_complete_conversions().await {
            Ok(response) => {
                let outcome = self.state().list.apply_refresh(ticket, response.conversions);
                match outcome {
                    RefreshOutcome::Applied { len, .. } => {
                        tracing::info!(ticket, records = len, "Completed conversions refreshed");
                    }
                    RefreshOutcome::Superseded { applied, .. } => {
                        tracing::debug!(ticket, applied, "Dropped out-of-order refresh response");
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                let applied = self.state().list.fail_refresh(ticket, err.client_message());
                if applied {
                    log_failure_message("refresh", &ticket.to_string(), &err);
                } else {
                    tracing::debug!(ticket, error = %err, "Dropped failure of superseded refresh");
                }
                Err(err.into())
            }
        }
    }

    /// Fetch the bytes of a converted artifact.
    ///
    /// A second call for the same conversion id while the first is outstanding
    /// is refused with [`TrackerError::AlreadyInFlight`] and issues no request.
    /// Failures never touch the list.
    pub async fn download(&self, conversion_id: &str) -> TrackerResult<DownloadedArtifact> {
        let _token = self
            .inner
            .operations
            .try_acquire(OperationKind::Download, conversion_id)
            .ok_or_else(|| refused(OperationKind::Download, conversion_id))?;

        let filename = {
            let state = self.state();
            let record = state.list.find_conversion(conversion_id);
            let extension = record
                .and_then(|r| r.conversion(conversion_id))
                .map(|c| c.extension.as_str())
                .unwrap_or("");
            derive_download_filename(record.map(|r| r.original_filename.as_str()), extension)
        };

        tracing::debug!(
            entity_id = %conversion_id,
            operation = %OperationKind::Download,
            filename = %filename,
            "Downloading conversion"
        );

        match self.inner.api.download_file(conversion_id).await {
            Ok(bytes) => {
                tracing::info!(
                    entity_id = %conversion_id,
                    size_bytes = bytes.len(),
                    "Conversion downloaded"
                );
                Ok(DownloadedArtifact {
                    conversion_id: conversion_id.to_string(),
                    filename,
                    bytes,
                })
            }
            Err(err) => Err(self.surface(OperationKind::Download, conversion_id, err)),
        }
    }

    /// Delete a file and its conversions.
    ///
    /// The entry is removed from the local list only after the store confirms;
    /// on failure the list is left exactly as it was.
    pub async fn delete(&self, file_id: &str) -> TrackerResult<()> {
        let _token = self
            .inner
            .operations
            .try_acquire(OperationKind::Delete, file_id)
            .ok_or_else(|| refused(OperationKind::Delete, file_id))?;

        tracing::debug!(
            entity_id = %file_id,
            operation = %OperationKind::Delete,
            "Deleting file"
        );

        match self.inner.api.delete_file(file_id).await {
            Ok(()) => {
                let removed = self.state().list.confirm_delete(file_id);
                tracing::info!(entity_id = %file_id, removed, "File deleted");
                Ok(())
            }
            Err(err) => Err(self.surface(OperationKind::Delete, file_id, err)),
        }
    }

    fn surface(&self, kind: OperationKind, entity_id: &str, err: ClientError) -> TrackerError {
        log_failure(kind, entity_id, &err);
        self.state().error = Some(err.client_message());
        TrackerError::Api(err)
    }
}

/// Abandons a refresh ticket on drop unless the response was already applied
/// or recorded as a failure.
struct PendingRefresh<'a> {
    state: &'a Mutex<TrackerState>,
    ticket: u64,
}

impl Drop for PendingRefresh<'_> {
    fn drop(&mut self) {
        let abandoned = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .abandon_refresh(self.ticket);
        if abandoned {
            tracing::debug!(ticket = self.ticket, "Refresh abandoned before completion");
        }
    }
}

fn refused(kind: OperationKind, entity_id: &str) -> TrackerError {
    tracing::debug!(
        entity_id = %entity_id,
        operation = %kind,
        "Operation refused: already in flight"
    );
    TrackerError::AlreadyInFlight {
        kind,
        id: entity_id.to_string(),
    }
}

fn log_failure(kind: OperationKind, entity_id: &str, err: &ClientError) {
    log_failure_message(&kind.to_string(), entity_id, err);
}

fn log_failure_message(operation: &str, entity_id: &str, err: &ClientError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            entity_id = %entity_id,
            operation = %operation,
            error_code = err.error_code(),
            error = %err,
            "Operation failed"
        ),
        LogLevel::Warn => tracing::warn!(
            entity_id = %entity_id,
            operation = %operation,
            error_code = err.error_code(),
            error = %err,
            "Operation failed"
        ),
        LogLevel::Error => tracing::error!(
            entity_id = %entity_id,
            operation = %operation,
            error_code = err.error_code(),
            error = %err,
            "Operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ApiCall, MemoryConversionApi};
    use transmute_core::models::ConversionStatus;

    fn tracker() -> (Arc<MemoryConversionApi>, ConversionTracker<Arc<MemoryConversionApi>>) {
        let api = Arc::new(MemoryConversionApi::new());
        let tracker = ConversionTracker::new(Arc::clone(&api));
        (api, tracker)
    }

    fn ids(tracker: &ConversionTracker<Arc<MemoryConversionApi>>) -> Vec<String> {
        tracker.records().iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_upload_then_refresh_excludes_unconverted_file() {
        let (api, tracker) = tracker();

        let receipt = tracker
            .upload(Some(FilePayload::new("report.docx", b"docx".to_vec())))
            .await
            .unwrap()
            .unwrap();
        tracker.refresh().await.unwrap();
        assert!(tracker.records().is_empty());
        assert_eq!(tracker.phase(), ListPhase::Loaded);

        let conversion_id = api.complete_conversion(&receipt.file_id, ".pdf");
        tracker.refresh().await.unwrap();

        let records = tracker.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, receipt.file_id);
        assert_eq!(records[0].conversions.len(), 1);
        assert_eq!(records[0].conversions[0].id, conversion_id);
    }

    #[tokio::test]
    async fn test_upload_reports_compatible_formats() {
        let (api, tracker) = tracker();
        api.set_compatible_formats("docx", &["pdf", "odt"]);

        let receipt = tracker
            .upload(Some(FilePayload::new("report.docx", b"docx".to_vec())))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(receipt.compatible_formats, vec!["pdf", "odt"]);
        assert_eq!(receipt.filename, "report.docx");
        assert_eq!(tracker.snapshot().upload.last_receipt, Some(receipt));
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let (api, tracker) = tracker();

        assert_eq!(tracker.upload(None).await.unwrap(), None);
        assert_eq!(
            tracker
                .upload(Some(FilePayload::new("empty.txt", Vec::new())))
                .await
                .unwrap(),
            None
        );

        assert_eq!(api.call_count(ApiCall::Upload), 0);
        assert_eq!(tracker.snapshot().upload.error, None);
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_and_resets() {
        let (api, tracker) = tracker();
        api.fail_next(ApiCall::Upload, ClientError::rejected(500, "Upload failed: disk full"));

        let err = tracker
            .upload(Some(FilePayload::new("a.png", b"png".to_vec())))
            .await
            .unwrap_err();

        assert_eq!(err.as_client_error().and_then(ClientError::status), Some(500));
        let upload = tracker.snapshot().upload;
        assert_eq!(upload.phase, crate::UploadPhase::Idle);
        assert_eq!(
            upload.error.as_deref(),
            Some("Request failed (500): Upload failed: disk full")
        );
    }

    #[tokio::test]
    async fn test_concurrent_upload_is_refused() {
        let (api, tracker) = tracker();
        let gate = api.gate(ApiCall::Upload, None);

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move {
                tracker
                    .upload(Some(FilePayload::new("a.png", b"png".to_vec())))
                    .await
            }
        });
        gate.wait_entered().await;

        let err = tracker
            .upload(Some(FilePayload::new("b.png", b"png".to_vec())))
            .await
            .unwrap_err();
        assert!(err.is_already_in_flight());

        gate.open(1);
        assert!(first.await.unwrap().unwrap().is_some());
        assert_eq!(api.call_count(ApiCall::Upload), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_list() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.docx");
        api.complete_conversion(&file_id, ".pdf");
        tracker.refresh().await.unwrap();

        api.fail_next(
            ApiCall::List,
            ClientError::TransportFailure("connection reset".to_string()),
        );
        assert!(tracker.refresh().await.is_err());

        assert_eq!(ids(&tracker), vec![file_id]);
        assert_eq!(
            tracker.phase().error(),
            Some("Could not reach the conversion service")
        );

        tracker.refresh().await.unwrap();
        assert_eq!(tracker.phase(), ListPhase::Loaded);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent_and_sorted() {
        let (api, tracker) = tracker();
        let first = api.insert_file("first.docx");
        let second = api.insert_file("second.docx");
        let third = api.insert_file("third.docx");
        for id in [&first, &second, &third] {
            api.complete_conversion(id, ".pdf");
        }

        tracker.refresh().await.unwrap();
        let once = tracker.records();
        tracker.refresh().await.unwrap();
        let twice = tracker.records();

        assert_eq!(once, twice);
        assert_eq!(ids(&tracker), vec![third, second, first]);
        assert!(once
            .windows(2)
            .all(|pair| pair[0].created_at > pair[1].created_at));
    }

    #[tokio::test]
    async fn test_client_filters_lax_listing() {
        let (api, tracker) = tracker();
        api.set_lax_listing(true);
        let bare = api.insert_file("bare.png");
        let pending = api.insert_file("pending.png");
        api.attach_conversion(&pending, ".jpg", ConversionStatus::Pending);
        let done = api.insert_file("done.png");
        api.complete_conversion(&done, ".jpg");

        tracker.refresh().await.unwrap();

        assert_eq!(ids(&tracker), vec![done]);
        assert!(!ids(&tracker).contains(&bare));
    }

    #[tokio::test]
    async fn test_download_derives_filename() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("report.docx");
        let conversion_id = api.complete_conversion(&file_id, ".pdf");
        api.set_content(&conversion_id, b"%PDF-1.7".to_vec());
        tracker.refresh().await.unwrap();

        let artifact = tracker.download(&conversion_id).await.unwrap();

        assert_eq!(artifact.filename, "report.pdf");
        assert_eq!(&artifact.bytes[..], b"%PDF-1.7");
        assert!(!tracker.is_busy(OperationKind::Download, &conversion_id));
    }

    #[tokio::test]
    async fn test_download_without_extension_in_original_name() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("noext");
        let conversion_id = api.complete_conversion(&file_id, ".pdf");
        tracker.refresh().await.unwrap();

        let artifact = tracker.download(&conversion_id).await.unwrap();

        assert_eq!(artifact.filename, "noext.pdf");
    }

    #[tokio::test]
    async fn test_duplicate_download_is_single_flight() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("clip.mp4");
        let conversion_id = api.complete_conversion(&file_id, ".gif");
        tracker.refresh().await.unwrap();
        let gate = api.gate(ApiCall::Download, Some(&conversion_id));

        let first = tokio::spawn({
            let tracker = tracker.clone();
            let id = conversion_id.clone();
            async move { tracker.download(&id).await }
        });
        gate.wait_entered().await;
        assert!(tracker.snapshot().is_downloading(&conversion_id));

        let err = tracker.download(&conversion_id).await.unwrap_err();
        assert_eq!(
            err,
            TrackerError::AlreadyInFlight {
                kind: OperationKind::Download,
                id: conversion_id.clone()
            }
        );
        assert_eq!(api.call_count(ApiCall::Download), 1);
        assert_eq!(tracker.last_error(), None);

        gate.open(1);
        assert_eq!(first.await.unwrap().unwrap().filename, "clip.gif");
        assert!(!tracker.snapshot().is_downloading(&conversion_id));
    }

    #[tokio::test]
    async fn test_distinct_ids_proceed_independently() {
        let (api, tracker) = tracker();
        let a = api.insert_file("a.png");
        let ca = api.complete_conversion(&a, ".jpg");
        let b = api.insert_file("b.png");
        let cb = api.complete_conversion(&b, ".jpg");
        tracker.refresh().await.unwrap();
        let gate = api.gate(ApiCall::Download, Some(&ca));

        let held = tokio::spawn({
            let tracker = tracker.clone();
            let id = ca.clone();
            async move { tracker.download(&id).await }
        });
        gate.wait_entered().await;

        // Neither a different download nor a delete waits for the held one.
        assert!(tracker.download(&cb).await.is_ok());
        tracker.delete(&b).await.unwrap();
        assert_eq!(ids(&tracker), vec![a.clone()]);

        gate.open(1);
        assert!(held.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_download_failure_releases_token_and_keeps_list() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.png");
        let conversion_id = api.complete_conversion(&file_id, ".jpg");
        tracker.refresh().await.unwrap();
        let before = tracker.records();

        api.fail_next(ApiCall::Download, ClientError::rejected(404, "File not found"));
        let err = tracker.download(&conversion_id).await.unwrap_err();

        assert_eq!(err.as_client_error().and_then(ClientError::status), Some(404));
        assert_eq!(tracker.records(), before);
        assert_eq!(
            tracker.last_error().as_deref(),
            Some("Request failed (404): File not found")
        );
        assert!(tracker.download(&conversion_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_entry_without_refresh() {
        let (api, tracker) = tracker();
        let keep = api.insert_file("keep.png");
        api.complete_conversion(&keep, ".jpg");
        let gone = api.insert_file("gone.png");
        api.complete_conversion(&gone, ".jpg");
        tracker.refresh().await.unwrap();
        let lists_before = api.call_count(ApiCall::List);

        tracker.delete(&gone).await.unwrap();

        assert_eq!(ids(&tracker), vec![keep]);
        assert_eq!(api.call_count(ApiCall::List), lists_before);
        assert!(!api.contains(&gone));
    }

    #[tokio::test]
    async fn test_rejected_delete_leaves_list_and_allows_retry() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.png");
        api.complete_conversion(&file_id, ".jpg");
        tracker.refresh().await.unwrap();
        let before = tracker.records();

        api.fail_next(ApiCall::Delete, ClientError::rejected(500, "locked"));
        let err = tracker.delete(&file_id).await.unwrap_err();

        assert!(!err.is_already_in_flight());
        assert_eq!(tracker.records(), before);
        assert_eq!(
            tracker.last_error().as_deref(),
            Some("Request failed (500): locked")
        );
        assert!(!tracker.snapshot().is_deleting(&file_id));

        tracker.delete(&file_id).await.unwrap();
        assert!(tracker.records().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_delete_is_refused() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.png");
        api.complete_conversion(&file_id, ".jpg");
        tracker.refresh().await.unwrap();
        let gate = api.gate(ApiCall::Delete, None);

        let first = tokio::spawn({
            let tracker = tracker.clone();
            let id = file_id.clone();
            async move { tracker.delete(&id).await }
        });
        gate.wait_entered().await;

        assert!(tracker.delete(&file_id).await.unwrap_err().is_already_in_flight());
        gate.open(1);
        first.await.unwrap().unwrap();
        assert_eq!(api.call_count(ApiCall::Delete), 1);
    }

    #[tokio::test]
    async fn test_stale_refresh_does_not_resurrect_deleted_file() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.png");
        api.complete_conversion(&file_id, ".jpg");
        tracker.refresh().await.unwrap();
        let gate = api.gate(ApiCall::List, None);

        // The refresh captures the listing before the delete lands.
        let refresh = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.refresh().await }
        });
        gate.wait_entered().await;

        tracker.delete(&file_id).await.unwrap();
        gate.open(1);
        refresh.await.unwrap().unwrap();

        assert!(tracker.records().is_empty());
        assert_eq!(tracker.phase(), ListPhase::Loaded);
    }

    #[tokio::test]
    async fn test_out_of_order_refresh_is_dropped() {
        let (api, tracker) = tracker();
        let gate = api.gate(ApiCall::List, None);

        let slow = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.refresh().await }
        });
        gate.wait_entered().await;
        api.ungate(ApiCall::List, None);

        let file_id = api.insert_file("late.png");
        api.complete_conversion(&file_id, ".jpg");
        tracker.refresh().await.unwrap();

        gate.open(1);
        let outcome = slow.await.unwrap().unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Superseded {
                ticket: 1,
                applied: 2
            }
        );
        assert_eq!(ids(&tracker), vec![file_id]);
    }

    #[tokio::test]
    async fn test_timed_out_refresh_does_not_leave_list_loading() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("a.png");
        api.complete_conversion(&file_id, ".jpg");
        let gate = api.gate(ApiCall::List, None);

        let held = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.refresh().await }
        });
        gate.wait_entered().await;

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), tracker.refresh()).await;
        assert!(timed_out.is_err());
        assert!(tracker.phase().is_loading());

        gate.open(1);
        let outcome = held.await.unwrap().unwrap();

        assert_eq!(outcome, RefreshOutcome::Applied { ticket: 1, len: 1 });
        assert_eq!(tracker.phase(), ListPhase::Loaded);
        assert_eq!(ids(&tracker), vec![file_id]);
    }

    #[tokio::test]
    async fn test_cancelled_sole_refresh_restores_previous_phase() {
        let (api, tracker) = tracker();
        tracker.refresh().await.unwrap();
        let _gate = api.gate(ApiCall::List, None);

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), tracker.refresh()).await;

        assert!(timed_out.is_err());
        assert_eq!(tracker.phase(), ListPhase::Loaded);
    }

    #[tokio::test]
    async fn test_clear_error() {
        let (api, tracker) = tracker();
        api.fail_next(ApiCall::Delete, ClientError::rejected(404, ""));
        assert!(tracker.delete("missing").await.is_err());
        assert_eq!(tracker.last_error().as_deref(), Some("Request failed (404)"));

        tracker.clear_error();
        assert_eq!(tracker.snapshot().error, None);
    }

    #[tokio::test]
    async fn test_delete_of_unlisted_file_succeeds() {
        let (api, tracker) = tracker();
        let file_id = api.insert_file("never-converted.png");

        tracker.delete(&file_id).await.unwrap();

        assert!(!api.contains(&file_id));
        assert!(tracker.records().is_empty());
    }
}
