//! Store paths for the event record and its dependent documents.

use tombola_core::store::DocumentPath;
use uuid::Uuid;

pub(crate) fn event_doc(event_id: &str) -> DocumentPath {
    DocumentPath::new("Events", event_id)
}

pub(crate) fn history_entry(event_id: &str, entry_id: Uuid) -> DocumentPath {
    event_doc(event_id).child("History", &entry_id.to_string())
}

pub(crate) fn notification_doc(event_id: &str, doc_id: Uuid) -> DocumentPath {
    event_doc(event_id).child("Notifications", &doc_id.to_string())
}

pub(crate) fn preference_doc(normalized_recipient: &str) -> DocumentPath {
    DocumentPath::new("NotificationPreferences", normalized_recipient)
}
