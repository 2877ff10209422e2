//! Operation tokens: per-entity single-flight markers.
//!
//! At most one token exists per `(kind, entity id)` pair. A token is released
//! when it is dropped, so an operation that fails, panics or is cancelled never
//! leaves its entity marked busy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Upload,
    Download,
    Delete,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OperationKind::Upload => write!(f, "upload"),
            OperationKind::Download => write!(f, "download"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationKey {
    pub kind: OperationKind,
    pub entity_id: String,
}

impl OperationKey {
    pub fn new(kind: OperationKind, entity_id: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveOperation {
    token_id: u64,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_token_id: u64,
    active: HashMap<OperationKey, ActiveOperation>,
}

/// Mapping from `(kind, entity id)` to the token currently holding it.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    inner: Mutex<RegistryInner>,
}

impl OperationRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `(kind, entity_id)`. Returns `None` while another token holds it.
    pub fn try_acquire(
        self: &Arc<Self>,
        kind: OperationKind,
        entity_id: &str,
    ) -> Option<OperationToken> {
        let key = OperationKey::new(kind, entity_id);
        let mut inner = self.lock();
        if inner.active.contains_key(&key) {
            return None;
        }

        inner.next_token_id += 1;
        let token_id = inner.next_token_id;
        inner.active.insert(
            key.clone(),
            ActiveOperation {
                token_id,
                started_at: Utc::now(),
            },
        );

        Some(OperationToken {
            registry: Arc::clone(self),
            key,
            token_id,
        })
    }

    pub fn is_active(&self, kind: OperationKind, entity_id: &str) -> bool {
        self.lock()
            .active
            .contains_key(&OperationKey::new(kind, entity_id))
    }

    /// Keys currently held, oldest first.
    pub fn active_keys(&self) -> Vec<OperationKey> {
        let inner = self.lock();
        let mut entries: Vec<(&OperationKey, &ActiveOperation)> = inner.active.iter().collect();
        entries.sort_by_key(|(_, op)| op.token_id);
        entries.into_iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn started_at(&self, kind: OperationKind, entity_id: &str) -> Option<DateTime<Utc>> {
        self.lock()
            .active
            .get(&OperationKey::new(kind, entity_id))
            .map(|op| op.started_at)
    }

    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &OperationKey, token_id: u64) {
        let mut inner = self.lock();
        // Only the token that claimed the key may clear it.
        if inner.active.get(key).map(|op| op.token_id) == Some(token_id) {
            inner.active.remove(key);
        }
    }
}

/// Proof that an operation holds its `(kind, entity id)` slot.
#[derive(Debug)]
pub struct OperationToken {
    registry: Arc<OperationRegistry>,
    key: OperationKey,
    token_id: u64,
}

impl OperationToken {
    pub fn key(&self) -> &OperationKey {
        &self.key
    }
}

impl Drop for OperationToken {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.token_id);
    }
}
