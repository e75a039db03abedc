//! The `Event` aggregate and its entrant list manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tombola_core::clock::Clock;
use tombola_core::error::DomainError;
use uuid::Uuid;

/// The five entrant lists of an event. Membership is exclusive: an
/// entrant identifier appears in at most one list at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrantList {
    /// Joined, awaiting a draw.
    Waiting,
    /// Won a draw slot, awaiting response.
    Chosen,
    /// Accepted; holding a seat provisionally.
    Pending,
    /// Fully confirmed (terminal).
    Registered,
    /// Declined, swept, or withdrawn (terminal).
    Cancelled,
}

impl std::fmt::Display for EntrantList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Chosen => "chosen",
            Self::Pending => "pending",
            Self::Registered => "registered",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Aggregate root for one capacity-limited event.
///
/// Entrants are identified by email address. Each list preserves
/// insertion order for deterministic iteration and display; the mutation
/// methods below keep the lists mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    event_id: String,
    name: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    poster_url: String,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    waitlist_limit: u32,
    #[serde(default)]
    draw_complete: bool,
    #[serde(default)]
    draw_at: Option<DateTime<Utc>>,
    #[serde(default)]
    waiting: Vec<String>,
    #[serde(default)]
    chosen: Vec<String>,
    #[serde(default)]
    pending: Vec<String>,
    #[serde(default)]
    registered: Vec<String>,
    #[serde(default)]
    cancelled: Vec<String>,
}

impl Event {
    /// Creates an event with a fresh identifier, empty lists, and
    /// `draw_complete = false`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when the name is blank.
    pub fn new(name: &str, clock: &dyn Clock) -> Result<Self, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidState(
                "event name must not be blank".into(),
            ));
        }
        Ok(Self {
            event_id: Uuid::new_v4().to_string(),
            name: trimmed.to_owned(),
            genre: String::new(),
            description: String::new(),
            location: String::new(),
            created_at: clock.now(),
            start_at: None,
            end_at: None,
            poster_url: String::new(),
            capacity: 0,
            waitlist_limit: 0,
            draw_complete: false,
            draw_at: None,
            waiting: Vec::new(),
            chosen: Vec::new(),
            pending: Vec::new(),
            registered: Vec::new(),
            cancelled: Vec::new(),
        })
    }

    // --- identity & configuration ---

    /// Immutable unique identifier.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when the name is blank.
    pub fn set_name(&mut self, name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidState(
                "event name must not be blank".into(),
            ));
        }
        self.name = trimmed.to_owned();
        Ok(())
    }

    #[must_use]
    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn set_genre(&mut self, genre: &str) {
        self.genre = genre.trim().to_owned();
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.trim().to_owned();
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.trim().to_owned();
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        self.start_at
    }

    pub fn set_start_at(&mut self, start_at: Option<DateTime<Utc>>) {
        self.start_at = start_at;
    }

    #[must_use]
    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }

    pub fn set_end_at(&mut self, end_at: Option<DateTime<Utc>>) {
        self.end_at = end_at;
    }

    /// Poster URL; empty when not set.
    #[must_use]
    pub fn poster_url(&self) -> &str {
        &self.poster_url
    }

    /// Stores the poster URL, trimming whitespace; absent input
    /// normalizes to the empty string.
    pub fn set_poster_url(&mut self, poster_url: Option<&str>) {
        self.poster_url = poster_url.map_or_else(String::new, |url| url.trim().to_owned());
    }

    /// Maximum number of confirmed entrants.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Updates the capacity; negative values clamp to zero.
    pub fn set_capacity(&mut self, capacity: i64) {
        self.capacity = u32::try_from(capacity.max(0)).unwrap_or(u32::MAX);
    }

    /// Maximum number of entrants on the waiting list (0 = no explicit
    /// limit).
    #[must_use]
    pub fn waitlist_limit(&self) -> u32 {
        self.waitlist_limit
    }

    /// Updates the waitlist limit; negative values clamp to zero.
    pub fn set_waitlist_limit(&mut self, limit: i64) {
        self.waitlist_limit = u32::try_from(limit.max(0)).unwrap_or(u32::MAX);
    }

    /// Whether a lottery draw has executed for this event. A caller-facing
    /// signal only; it does not block repeat draws.
    #[must_use]
    pub fn draw_complete(&self) -> bool {
        self.draw_complete
    }

    pub fn set_draw_complete(&mut self, draw_complete: bool) {
        self.draw_complete = draw_complete;
    }

    /// Timestamp of the most recent draw, when one has run.
    #[must_use]
    pub fn draw_at(&self) -> Option<DateTime<Utc>> {
        self.draw_at
    }

    pub fn set_draw_at(&mut self, draw_at: Option<DateTime<Utc>>) {
        self.draw_at = draw_at;
    }

    // --- entrant list manager ---

    /// Returns the entrants of one list in insertion order.
    #[must_use]
    pub fn list(&self, which: EntrantList) -> &[String] {
        match which {
            EntrantList::Waiting => &self.waiting,
            EntrantList::Chosen => &self.chosen,
            EntrantList::Pending => &self.pending,
            EntrantList::Registered => &self.registered,
            EntrantList::Cancelled => &self.cancelled,
        }
    }

    fn list_mut(&mut self, which: EntrantList) -> &mut Vec<String> {
        match which {
            EntrantList::Waiting => &mut self.waiting,
            EntrantList::Chosen => &mut self.chosen,
            EntrantList::Pending => &mut self.pending,
            EntrantList::Registered => &mut self.registered,
            EntrantList::Cancelled => &mut self.cancelled,
        }
    }

    /// Returns the list currently holding `entrant`, if any.
    #[must_use]
    pub fn membership(&self, entrant: &str) -> Option<EntrantList> {
        [
            EntrantList::Waiting,
            EntrantList::Chosen,
            EntrantList::Pending,
            EntrantList::Registered,
            EntrantList::Cancelled,
        ]
        .into_iter()
        .find(|which| self.list(*which).iter().any(|e| e == entrant))
    }

    /// Adds `entrant` to the waiting list.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when the entrant is already on
    /// any list.
    pub fn join_waiting(&mut self, entrant: &str) -> Result<(), DomainError> {
        if let Some(which) = self.membership(entrant) {
            return Err(DomainError::InvalidState(format!(
                "{entrant} is already on the {which} list"
            )));
        }
        self.waiting.push(entrant.to_owned());
        Ok(())
    }

    /// Moves `entrant` from one list to another, preserving insertion
    /// order in the destination.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` when the entrant is not on `from`.
    pub fn move_entrant(
        &mut self,
        entrant: &str,
        from: EntrantList,
        to: EntrantList,
    ) -> Result<(), DomainError> {
        self.remove_from(entrant, from)?;
        let destination = self.list_mut(to);
        if !destination.iter().any(|e| e == entrant) {
            destination.push(entrant.to_owned());
        }
        Ok(())
    }

    /// Removes `entrant` from a list.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` when the entrant is not on the
    /// list.
    pub fn remove_from(&mut self, entrant: &str, which: EntrantList) -> Result<(), DomainError> {
        let list = self.list_mut(which);
        let Some(position) = list.iter().position(|e| e == entrant) else {
            return Err(DomainError::NotFound(format!(
                "{entrant} is not on the {which} list"
            )));
        };
        list.remove(position);
        Ok(())
    }

    /// Adds `entrant` directly to a terminal list without requiring a
    /// prior membership (administrative seeding). Strips the entrant
    /// from any other list first to keep membership exclusive.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when `which` is not a
    /// terminal list.
    pub fn add_terminal(&mut self, entrant: &str, which: EntrantList) -> Result<(), DomainError> {
        if !matches!(which, EntrantList::Cancelled | EntrantList::Registered) {
            return Err(DomainError::InvalidState(format!(
                "{which} is not a terminal list"
            )));
        }
        match self.membership(entrant) {
            Some(current) if current == which => Ok(()),
            Some(current) => self.move_entrant(entrant, current, which),
            None => {
                self.list_mut(which).push(entrant.to_owned());
                Ok(())
            }
        }
    }

    /// Seats already spoken for: chosen, pending, and registered.
    #[must_use]
    pub fn occupied_seats(&self) -> usize {
        self.chosen.len() + self.pending.len() + self.registered.len()
    }

    /// Seats still open for promotion from the waiting list.
    #[must_use]
    pub fn remaining_slots(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.occupied_seats())
    }
}
