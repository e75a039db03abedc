//! Notification preference gate.
//!
//! Per-recipient opt-out records under `NotificationPreferences/{id}`.
//! The gate is consulted inside the same transaction as the mutation it
//! gates, so a preference change mid-operation either conflicts or is
//! observed consistently with the committed list state.

use serde::{Deserialize, Serialize};
use tombola_core::error::DomainError;
use tombola_core::store::Transaction;

use super::notifications::normalize_recipient;
use super::paths;

/// A recipient's stored notification preference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    /// Whether the recipient wants notifications.
    pub enabled: bool,
}

/// Returns whether notifications may be written for `recipient`.
///
/// A missing preference record defaults to enabled (opt-out model); a
/// blank recipient is never notified.
pub(crate) async fn is_enabled(
    tx: &mut Transaction<'_>,
    recipient: &str,
) -> Result<bool, DomainError> {
    let normalized = normalize_recipient(recipient);
    if normalized.is_empty() {
        return Ok(false);
    }
    Ok(tx
        .get(&paths::preference_doc(&normalized))
        .await?
        .and_then(|value| value.get("enabled").and_then(serde_json::Value::as_bool))
        .unwrap_or(true))
}
