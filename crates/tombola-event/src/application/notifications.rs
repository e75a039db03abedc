//! Notification documents written under `Events/{id}/Notifications`.
//!
//! The surrounding application delivers these however it likes; this
//! core only writes them, gated by the recipient's preference record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tombola_core::error::DomainError;
use tombola_core::store::Transaction;
use uuid::Uuid;

use crate::domain::event::Event;

use super::{paths, to_document};

/// Discriminator for the notification's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Draw winner.
    Win,
    /// Still waiting after a draw.
    Lose,
    /// Registration completed.
    SignupSuccess,
    /// Organizer message to the waiting list.
    OrgWaitlist,
    /// Organizer message to selected entrants.
    OrgSelected,
    /// Organizer message to cancelled entrants.
    OrgCancelled,
}

impl NotificationKind {
    /// Message used when the organizer does not supply one.
    #[must_use]
    pub fn default_message(self, event_name: &str) -> String {
        let name = if event_name.trim().is_empty() {
            "this event"
        } else {
            event_name
        };
        match self {
            Self::Win | Self::OrgSelected => format!(
                "Congratulations! You are a lottery winner and have been selected for {name}"
            ),
            Self::Lose => format!(
                "You were not selected this time for {name}, but you can still get a chance if a selected entrant declines"
            ),
            Self::SignupSuccess => {
                format!("You have successfully been registered to participate in {name}")
            }
            Self::OrgWaitlist => format!("You have been added to the waiting list for {name}"),
            Self::OrgCancelled => format!("Your selection has been cancelled for {name}"),
        }
    }
}

/// A notification document targeted at one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Normalized recipient identifier.
    pub recipient: String,
    /// Origin discriminator.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Event the notification belongs to.
    pub event_id: String,
    /// Event name at write time.
    pub event_name: String,
    /// Message body.
    pub message: String,
    /// Whether the recipient has seen it; always written as `false`.
    pub seen: bool,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

/// Normalizes a recipient identifier for preference keys and payloads.
#[must_use]
pub fn normalize_recipient(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Stages a notification document in the transaction. A blank or absent
/// message falls back to the kind's default.
pub(crate) fn stage(
    tx: &mut Transaction<'_>,
    event: &Event,
    kind: NotificationKind,
    recipient: &str,
    message: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<(), DomainError> {
    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| kind.default_message(event.name()), ToOwned::to_owned);
    let notification = Notification {
        recipient: normalize_recipient(recipient),
        kind,
        event_id: event.event_id().to_owned(),
        event_name: event.name().to_owned(),
        message,
        seen: false,
        created_at,
    };
    tx.set(
        paths::notification_doc(event.event_id(), Uuid::new_v4()),
        to_document(&notification)?,
    );
    Ok(())
}
