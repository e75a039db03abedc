//! Audit history recorder.
//!
//! One append-only entry per lifecycle operation, written under
//! `Events/{id}/History` inside the same transaction as the list
//! mutation it describes. Entries are never updated or deleted by
//! lifecycle operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tombola_core::error::DomainError;
use tombola_core::store::Transaction;
use uuid::Uuid;

use super::{paths, to_document};

/// A recorded lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Operation name, e.g. `lottery_draw` or `accept_invitation`.
    pub operation: String,
    /// Entrant identifiers the operation affected.
    pub entrants: Vec<String>,
    /// When the operation ran.
    pub recorded_at: DateTime<Utc>,
}

/// Stages a history entry in the transaction.
pub(crate) fn record(
    tx: &mut Transaction<'_>,
    event_id: &str,
    operation: &str,
    entrants: &[String],
    recorded_at: DateTime<Utc>,
) -> Result<(), DomainError> {
    let entry = HistoryEntry {
        operation: operation.to_owned(),
        entrants: entrants.to_vec(),
        recorded_at,
    };
    tx.set(
        paths::history_entry(event_id, Uuid::new_v4()),
        to_document(&entry)?,
    );
    Ok(())
}
