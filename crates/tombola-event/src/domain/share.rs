//! Share payload builder for QR codes and other out-of-band sharing.

use super::event::Event;

/// Renders a plain-text block describing the event.
///
/// Name, location, start/end date text, description, and poster URL each
/// appear verbatim when present; rendering the block into an actual QR
/// image is the caller's concern.
#[must_use]
pub fn build_share_payload(event: &Event) -> String {
    let mut payload = String::new();
    payload.push_str(&format!("Event: {}\n", event.name()));
    payload.push_str(&format!("Location: {}\n", event.location()));
    payload.push_str(&format!(
        "Date: {}\n",
        event.start_at().map(|d| d.to_rfc3339()).unwrap_or_default()
    ));
    payload.push_str(&format!(
        "Deadline: {}\n",
        event.end_at().map(|d| d.to_rfc3339()).unwrap_or_default()
    ));
    payload.push_str(&format!("Description: {}\n", event.description()));
    if !event.poster_url().is_empty() {
        payload.push_str(&format!("Poster: {}", event.poster_url()));
    }
    payload
}
