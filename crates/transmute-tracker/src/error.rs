//! Tracker error type.

use transmute_core::{ClientError, ErrorMetadata};

use crate::operation::OperationKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Api(#[from] ClientError),

    #[error("A {kind} is already in flight for {id}")]
    AlreadyInFlight { kind: OperationKind, id: String },
}

impl TrackerError {
    /// Human-readable text for the presentation layer.
    pub fn client_message(&self) -> String {
        match self {
            TrackerError::Api(err) => err.client_message(),
            TrackerError::AlreadyInFlight { .. } => self.to_string(),
        }
    }

    pub fn is_already_in_flight(&self) -> bool {
        matches!(self, TrackerError::AlreadyInFlight { .. })
    }

    pub fn as_client_error(&self) -> Option<&ClientError> {
        match self {
            TrackerError::Api(err) => Some(err),
            TrackerError::AlreadyInFlight { .. } => None,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
