//! In-memory conversion store for testing
//!
//! Behaves like the remote store: uploads get fresh ids, the listing returns
//! files that have a completed conversion, downloads return stored bytes and
//! deletes cascade to conversions. Calls can be failed on demand or held at a
//! [`Gate`] until the test releases them.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use transmute_core::models::{
    ConversionListResponse, ConversionRecord, ConversionStatus, FilePayload, FileRecord,
    UploadMetadata, UploadResponse,
};
use transmute_core::{ClientError, ConversionApi};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCall {
    Upload,
    List,
    Download,
    Delete,
}

struct GateInner {
    entered: Semaphore,
    release: Semaphore,
}

/// Holds matching calls until [`Gate::open`] releases them.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                entered: Semaphore::new(0),
                release: Semaphore::new(0),
            }),
        }
    }

    /// Wait until one more call has reached the gate.
    pub async fn wait_entered(&self) {
        self.inner
            .entered
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
    }

    /// Let `calls` held calls proceed.
    pub fn open(&self, calls: usize) {
        self.inner.release.add_permits(calls);
    }

    async fn pass(&self) {
        self.inner.entered.add_permits(1);
        self.inner
            .release
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
    }
}

struct StoredFile {
    record: FileRecord,
    content: Bytes,
}

#[derive(Default)]
struct Store {
    files: Vec<StoredFile>,
    conversion_content: HashMap<String, Bytes>,
    compatible_formats: HashMap<String, Vec<String>>,
    failures: HashMap<ApiCall, VecDeque<ClientError>>,
    calls: HashMap<ApiCall, usize>,
    gates: HashMap<(ApiCall, Option<String>), Gate>,
    lax_listing: bool,
    uploads: usize,
}

impl Store {
    fn file(&self, file_id: &str) -> Option<&StoredFile> {
        self.files.iter().find(|f| f.record.id == file_id)
    }

    fn file_mut(&mut self, file_id: &str) -> Option<&mut StoredFile> {
        self.files.iter_mut().find(|f| f.record.id == file_id)
    }

    fn next_created_at(&mut self) -> DateTime<Utc> {
        self.uploads += 1;
        let base = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        base + Duration::seconds(self.uploads as i64)
    }

    fn store(&mut self, filename: &str, content: Bytes) -> FileRecord {
        let extension = match filename.rfind('.') {
            Some(idx) if idx > 0 => filename[idx..].to_lowercase(),
            _ => String::new(),
        };
        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            original_filename: filename.to_string(),
            media_type: extension.trim_start_matches('.').to_string(),
            extension,
            size_bytes: content.len() as u64,
            sha256_checksum: None,
            created_at: self.next_created_at(),
            conversions: Vec::new(),
        };
        self.files.push(StoredFile {
            record: record.clone(),
            content,
        });
        record
    }

    fn listing(&self) -> Vec<FileRecord> {
        self.files
            .iter()
            .filter_map(|f| {
                let mut record = f.record.clone();
                if !self.lax_listing {
                    record.conversions.retain(|c| c.is_complete());
                    if record.conversions.is_empty() {
                        return None;
                    }
                }
                Some(record)
            })
            .collect()
    }

    fn not_found() -> ClientError {
        ClientError::rejected(404, "File not found")
    }
}

/// In-memory `ConversionApi` backed by a shared store.
#[derive(Clone, Default)]
pub struct MemoryConversionApi {
    store: Arc<Mutex<Store>>,
}

impl MemoryConversionApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file directly, bypassing the upload call. Returns its id.
    pub fn insert_file(&self, filename: &str) -> String {
        let mut store = self.store.lock().unwrap();
        store.store(filename, Bytes::from_static(b"original")).id
    }

    /// Attach a conversion in the given state, as the processor would.
    pub fn attach_conversion(
        &self,
        file_id: &str,
        extension: &str,
        status: ConversionStatus,
    ) -> String {
        let conversion_id = Uuid::new_v4().to_string();
        let mut store = self.store.lock().unwrap();
        let file = store
            .file_mut(file_id)
            .unwrap_or_else(|| panic!("unknown file {}", file_id));
        file.record
            .conversions
            .push(ConversionRecord::new(conversion_id.clone(), extension).with_status(status));
        store
            .conversion_content
            .insert(conversion_id.clone(), Bytes::from_static(b"converted"));
        conversion_id
    }

    pub fn complete_conversion(&self, file_id: &str, extension: &str) -> String {
        self.attach_conversion(file_id, extension, ConversionStatus::Complete)
    }

    pub fn set_content(&self, conversion_id: &str, content: impl Into<Bytes>) {
        self.store
            .lock()
            .unwrap()
            .conversion_content
            .insert(conversion_id.to_string(), content.into());
    }

    /// Formats reported for uploads of `media_type` (extension without dot).
    pub fn set_compatible_formats(&self, media_type: &str, formats: &[&str]) {
        self.store.lock().unwrap().compatible_formats.insert(
            media_type.to_string(),
            formats.iter().map(|f| f.to_string()).collect(),
        );
    }

    /// When set, the listing also returns files without a completed conversion.
    pub fn set_lax_listing(&self, lax: bool) {
        self.store.lock().unwrap().lax_listing = lax;
    }

    /// Fail the next `call` with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, call: ApiCall, error: ClientError) {
        self.store
            .lock()
            .unwrap()
            .failures
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Hold calls of `call` (optionally only for `entity_id`) at a gate.
    pub fn gate(&self, call: ApiCall, entity_id: Option<&str>) -> Gate {
        let gate = Gate::new();
        self.store
            .lock()
            .unwrap()
            .gates
            .insert((call, entity_id.map(str::to_string)), gate.clone());
        gate
    }

    /// Stop gating new calls. Calls already held stay held.
    pub fn ungate(&self, call: ApiCall, entity_id: Option<&str>) {
        self.store
            .lock()
            .unwrap()
            .gates
            .remove(&(call, entity_id.map(str::to_string)));
    }

    pub fn call_count(&self, call: ApiCall) -> usize {
        self.store
            .lock()
            .unwrap()
            .calls
            .get(&call)
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.store.lock().unwrap().file(file_id).is_some()
    }

    /// Count the call, pop an injected failure and find the matching gate.
    fn enter(&self, call: ApiCall, entity_id: Option<&str>) -> (Option<ClientError>, Option<Gate>) {
        let mut store = self.store.lock().unwrap();
        *store.calls.entry(call).or_default() += 1;
        let failure = store.failures.get_mut(&call).and_then(VecDeque::pop_front);
        let gate = entity_id
            .and_then(|id| store.gates.get(&(call, Some(id.to_string()))))
            .or_else(|| store.gates.get(&(call, None)))
            .cloned();
        (failure, gate)
    }

    async fn hold(gate: Option<Gate>) {
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }
}

#[async_trait]
impl ConversionApi for MemoryConversionApi {
    async fn upload_file(&self, payload: FilePayload) -> Result<UploadResponse, ClientError> {
        let (failure, gate) = self.enter(ApiCall::Upload, None);
        Self::hold(gate).await;
        if let Some(err) = failure {
            return Err(err);
        }
        if payload.is_empty() {
            return Err(ClientError::EmptyInput);
        }

        let mut store = self.store.lock().unwrap();
        let record = store.store(&payload.filename, payload.bytes);
        let compatible_formats = store
            .compatible_formats
            .get(&record.media_type)
            .cloned()
            .unwrap_or_default();

        Ok(UploadResponse {
            message: Some("File uploaded successfully".to_string()),
            metadata: UploadMetadata {
                id: record.id,
                original_filename: Some(record.original_filename),
                media_type: Some(record.media_type),
                extension: Some(record.extension),
                size_bytes: Some(record.size_bytes),
                sha256_checksum: None,
                compatible_formats,
            },
        })
    }

    async fn list_complete_conversions(&self) -> Result<ConversionListResponse, ClientError> {
        let (failure, gate) = self.enter(ApiCall::List, None);
        // The listing reflects the store as it was when the request arrived.
        let conversions = self.store.lock().unwrap().listing();
        Self::hold(gate).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(ConversionListResponse { conversions }),
        }
    }

    async fn download_file(&self, id: &str) -> Result<Bytes, ClientError> {
        let (failure, gate) = self.enter(ApiCall::Download, Some(id));
        Self::hold(gate).await;
        if let Some(err) = failure {
            return Err(err);
        }

        let store = self.store.lock().unwrap();
        if let Some(content) = store.conversion_content.get(id) {
            return Ok(content.clone());
        }
        store
            .file(id)
            .map(|f| f.content.clone())
            .ok_or_else(Store::not_found)
    }

    async fn delete_file(&self, id: &str) -> Result<(), ClientError> {
        let (failure, gate) = self.enter(ApiCall::Delete, Some(id));
        Self::hold(gate).await;
        if let Some(err) = failure {
            return Err(err);
        }

        let mut store = self.store.lock().unwrap();
        let idx = store
            .files
            .iter()
            .position(|f| f.record.id == id)
            .ok_or_else(Store::not_found)?;
        let removed = store.files.remove(idx);
        for conversion in &removed.record.conversions {
            store.conversion_content.remove(&conversion.id);
        }
        Ok(())
    }
}
