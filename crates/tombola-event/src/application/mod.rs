//! Application layer: the transactional orchestrator and the documents
//! it writes alongside the event record.

pub mod event_service;
pub mod history;
pub mod notifications;
pub mod preferences;

pub(crate) mod paths;

use serde::Serialize;
use tombola_core::error::DomainError;

/// Serializes a document payload for the store.
pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::StoreUnavailable(format!("document serialization failed: {e}")))
}
