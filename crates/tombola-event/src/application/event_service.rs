//! Transactional orchestrator for the entrant lifecycle.
//!
//! Every public operation runs as a single atomic transaction against
//! the store: read the event record, apply pure domain logic, stage the
//! updated event plus history and notification documents, commit. A
//! concurrent writer makes the commit fail with `Conflict`; the caller
//! decides whether to retry, there is no retry loop in here.

use std::sync::{Arc, Mutex};

use tombola_core::clock::Clock;
use tombola_core::error::DomainError;
use tombola_core::rng::DeterministicRng;
use tombola_core::store::{DocumentStore, Transaction};

use crate::domain::event::{EntrantList, Event};
use crate::domain::lottery;

use super::notifications::{self, NotificationKind, normalize_recipient};
use super::preferences::{self, NotificationPreference};
use super::{history, paths, to_document};

/// Entry point for all lifecycle mutations of an event record.
pub struct EventService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn DeterministicRng>>,
}

/// Organizer-triggered notification audiences.
#[derive(Debug, Clone, Copy)]
enum Audience {
    Waitlist,
    Selected,
    Cancelled,
}

impl Audience {
    fn kind(self) -> NotificationKind {
        match self {
            Self::Waitlist => NotificationKind::OrgWaitlist,
            Self::Selected => NotificationKind::OrgSelected,
            Self::Cancelled => NotificationKind::OrgCancelled,
        }
    }

    fn recipients(self, event: &Event) -> Vec<String> {
        match self {
            Self::Waitlist => event.list(EntrantList::Waiting).to_vec(),
            // Selected covers both entrants yet to respond and those who
            // already accepted.
            Self::Selected => {
                let mut recipients = event.list(EntrantList::Chosen).to_vec();
                recipients.extend_from_slice(event.list(EntrantList::Pending));
                recipients
            }
            Self::Cancelled => event.list(EntrantList::Cancelled).to_vec(),
        }
    }
}

impl EventService {
    /// Creates a service over the given store, clock, and randomness
    /// source.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        Self {
            store,
            clock,
            rng: Mutex::new(rng),
        }
    }

    fn begin(&self) -> Transaction<'_> {
        Transaction::new(self.store.as_ref())
    }

    async fn read_event(
        &self,
        tx: &mut Transaction<'_>,
        event_id: &str,
    ) -> Result<Event, DomainError> {
        let Some(value) = tx.get(&paths::event_doc(event_id)).await? else {
            return Err(DomainError::NotFound(format!("event {event_id}")));
        };
        serde_json::from_value(value)
            .map_err(|e| DomainError::StoreUnavailable(format!("event document corrupt: {e}")))
    }

    fn stage_event(&self, tx: &mut Transaction<'_>, event: &Event) -> Result<(), DomainError> {
        tx.set(paths::event_doc(event.event_id()), to_document(event)?);
        Ok(())
    }

    // --- lifecycle operations ---

    /// Runs the lottery draw: promotes up to the remaining capacity from
    /// the waiting list, chosen uniformly at random. Returns the
    /// promoted identifiers.
    ///
    /// When no slots remain the call is an idempotent no-op: no list,
    /// flag, history, or notification changes at all. Repeat draws on an
    /// event with vacated slots re-sample the remaining waiting list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event, `Conflict` when a
    /// concurrent transaction touched the record, or `StoreUnavailable`.
    pub async fn run_lottery_draw(&self, event_id: &str) -> Result<Vec<String>, DomainError> {
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        if event.remaining_slots() == 0 {
            return Ok(Vec::new());
        }

        // Lock the RNG only for the synchronous sampling, never across
        // an await.
        let winners = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| DomainError::StoreUnavailable("lottery rng mutex poisoned".into()))?;
            lottery::select_winners(&event, &mut **rng)
        };

        for winner in &winners {
            event.move_entrant(winner, EntrantList::Waiting, EntrantList::Chosen)?;
        }
        let now = self.clock.now();
        event.set_draw_complete(true);
        event.set_draw_at(Some(now));

        history::record(&mut tx, event_id, "lottery_draw", &winners, now)?;
        for winner in &winners {
            if preferences::is_enabled(&mut tx, winner).await? {
                notifications::stage(&mut tx, &event, NotificationKind::Win, winner, None, now)?;
            }
        }
        for loser in event.list(EntrantList::Waiting) {
            if preferences::is_enabled(&mut tx, loser).await? {
                notifications::stage(&mut tx, &event, NotificationKind::Lose, loser, None, now)?;
            }
        }

        self.stage_event(&mut tx, &event)?;
        tx.commit().await?;
        tracing::info!(event_id, promoted = winners.len(), "lottery draw complete");
        Ok(winners)
    }

    /// Sweeps every chosen entrant who never responded into the
    /// cancelled list. Previously-cancelled entries stay untouched and
    /// vacated slots are not refilled.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event, `Conflict`, or
    /// `StoreUnavailable`.
    pub async fn cancel_unregistered_entrants(&self, event_id: &str) -> Result<(), DomainError> {
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        let swept = event.list(EntrantList::Chosen).to_vec();
        if swept.is_empty() {
            return Ok(());
        }
        for entrant in &swept {
            event.move_entrant(entrant, EntrantList::Chosen, EntrantList::Cancelled)?;
        }

        history::record(
            &mut tx,
            event_id,
            "sweep_unregistered",
            &swept,
            self.clock.now(),
        )?;
        self.stage_event(&mut tx, &event)?;
        tx.commit().await?;
        tracing::info!(event_id, swept = swept.len(), "unregistered entrants swept");
        Ok(())
    }

    /// Records that a chosen entrant accepted their invitation, holding
    /// a seat provisionally.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the entrant is not currently chosen.
    pub async fn accept_invitation(
        &self,
        event_id: &str,
        entrant: &str,
    ) -> Result<(), DomainError> {
        let entrant = entrant.trim();
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        if event.membership(entrant) != Some(EntrantList::Chosen) {
            return Err(DomainError::InvalidState(format!(
                "{entrant} is not currently selected for this event"
            )));
        }
        event.move_entrant(entrant, EntrantList::Chosen, EntrantList::Pending)?;

        history::record(
            &mut tx,
            event_id,
            "accept_invitation",
            &[entrant.to_owned()],
            self.clock.now(),
        )?;
        self.stage_event(&mut tx, &event)?;
        tx.commit().await
    }

    /// Records that a chosen entrant declined their invitation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the entrant is not currently chosen.
    pub async fn decline_invitation(
        &self,
        event_id: &str,
        entrant: &str,
    ) -> Result<(), DomainError> {
        let entrant = entrant.trim();
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        if event.membership(entrant) != Some(EntrantList::Chosen) {
            return Err(DomainError::InvalidState(format!(
                "{entrant} is not currently selected for this event"
            )));
        }
        event.move_entrant(entrant, EntrantList::Chosen, EntrantList::Cancelled)?;

        history::record(
            &mut tx,
            event_id,
            "decline_invitation",
            &[entrant.to_owned()],
            self.clock.now(),
        )?;
        self.stage_event(&mut tx, &event)?;
        tx.commit().await
    }

    /// Converts a pending entrant into a fully registered participant
    /// and writes a gated confirmation notification.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the entrant has not accepted first.
    pub async fn complete_registration(
        &self,
        event_id: &str,
        entrant: &str,
    ) -> Result<(), DomainError> {
        let entrant = entrant.trim();
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        if event.membership(entrant) != Some(EntrantList::Pending) {
            return Err(DomainError::InvalidState(format!(
                "{entrant} must accept the invitation before registering"
            )));
        }
        event.move_entrant(entrant, EntrantList::Pending, EntrantList::Registered)?;

        let now = self.clock.now();
        history::record(
            &mut tx,
            event_id,
            "complete_registration",
            &[entrant.to_owned()],
            now,
        )?;
        if preferences::is_enabled(&mut tx, entrant).await? {
            notifications::stage(
                &mut tx,
                &event,
                NotificationKind::SignupSuccess,
                entrant,
                None,
                now,
            )?;
        }
        self.stage_event(&mut tx, &event)?;
        tx.commit().await
    }

    /// Adds an entrant to the waiting list, enforcing capacity and
    /// waitlist-limit rules. A waitlist limit of zero falls back to the
    /// event capacity; when both are zero the waiting list is unbounded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the entrant already holds a place on
    /// any list, when accepted entrants meet capacity, or when the
    /// waiting list is full.
    pub async fn join_waitlist(&self, event_id: &str, entrant: &str) -> Result<(), DomainError> {
        let entrant = entrant.trim();
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        let capacity = event.capacity() as usize;
        if capacity > 0 && event.list(EntrantList::Pending).len() >= capacity {
            return Err(DomainError::InvalidState("this event is full".into()));
        }
        let mut limit = event.waitlist_limit() as usize;
        if limit == 0 {
            limit = capacity;
        }
        if limit > 0 && event.list(EntrantList::Waiting).len() >= limit {
            return Err(DomainError::InvalidState("this waiting list is full".into()));
        }
        event.join_waiting(entrant)?;

        history::record(
            &mut tx,
            event_id,
            "join_waitlist",
            &[entrant.to_owned()],
            self.clock.now(),
        )?;
        self.stage_event(&mut tx, &event)?;
        tx.commit().await
    }

    /// Removes an entrant from the waiting list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the entrant is not on the waiting list.
    pub async fn leave_waitlist(&self, event_id: &str, entrant: &str) -> Result<(), DomainError> {
        let entrant = entrant.trim();
        let mut tx = self.begin();
        let mut event = self.read_event(&mut tx, event_id).await?;

        event.remove_from(entrant, EntrantList::Waiting)?;

        history::record(
            &mut tx,
            event_id,
            "leave_waitlist",
            &[entrant.to_owned()],
            self.clock.now(),
        )?;
        self.stage_event(&mut tx, &event)?;
        tx.commit().await
    }

    // --- organizer notifications ---

    /// Writes an organizer notification to every waiting entrant whose
    /// preference allows it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event, `Conflict`, or
    /// `StoreUnavailable`.
    pub async fn notify_waitlist_entrants(
        &self,
        event_id: &str,
        message: Option<&str>,
    ) -> Result<(), DomainError> {
        self.notify_group(event_id, Audience::Waitlist, message)
            .await
    }

    /// Writes an organizer notification to every chosen or pending
    /// entrant whose preference allows it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event, `Conflict`, or
    /// `StoreUnavailable`.
    pub async fn notify_selected_entrants(
        &self,
        event_id: &str,
        message: Option<&str>,
    ) -> Result<(), DomainError> {
        self.notify_group(event_id, Audience::Selected, message)
            .await
    }

    /// Writes an organizer notification to every cancelled entrant whose
    /// preference allows it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event, `Conflict`, or
    /// `StoreUnavailable`.
    pub async fn notify_cancelled_entrants(
        &self,
        event_id: &str,
        message: Option<&str>,
    ) -> Result<(), DomainError> {
        self.notify_group(event_id, Audience::Cancelled, message)
            .await
    }

    async fn notify_group(
        &self,
        event_id: &str,
        audience: Audience,
        message: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut tx = self.begin();
        let event = self.read_event(&mut tx, event_id).await?;

        let now = self.clock.now();
        for recipient in audience.recipients(&event) {
            if preferences::is_enabled(&mut tx, &recipient).await? {
                notifications::stage(&mut tx, &event, audience.kind(), &recipient, message, now)?;
            }
        }
        tx.commit().await
    }

    // --- record management ---

    /// Creates or replaces the backing document for the supplied event.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    pub async fn save_event(&self, event: &Event) -> Result<(), DomainError> {
        self.store
            .put(&paths::event_doc(event.event_id()), to_document(event)?)
            .await
    }

    /// Fetches an event by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown event.
    pub async fn load_event(&self, event_id: &str) -> Result<Event, DomainError> {
        let snapshot = self.store.get(&paths::event_doc(event_id)).await?;
        let Some(value) = snapshot.data else {
            return Err(DomainError::NotFound(format!("event {event_id}")));
        };
        serde_json::from_value(value)
            .map_err(|e| DomainError::StoreUnavailable(format!("event document corrupt: {e}")))
    }

    /// Deletes the event record. The record deletion itself propagates
    /// failure; dependent history and notification documents are removed
    /// best-effort afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the event document cannot be
    /// deleted.
    pub async fn delete_event(&self, event_id: &str) -> Result<(), DomainError> {
        let path = paths::event_doc(event_id);
        self.store.delete(&path).await?;

        for collection in ["History", "Notifications"] {
            match self.store.list(&path, collection).await {
                Ok(snapshots) => {
                    for snapshot in snapshots {
                        if let Err(err) = self.store.delete(&snapshot.path).await {
                            tracing::warn!(path = %snapshot.path, %err, "dependent document cleanup failed");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(event_id, collection, %err, "dependent document enumeration failed");
                }
            }
        }
        Ok(())
    }

    /// Stores a recipient's notification preference record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a blank recipient.
    pub async fn set_notification_preference(
        &self,
        recipient: &str,
        enabled: bool,
    ) -> Result<(), DomainError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Err(DomainError::InvalidState(
                "recipient must not be blank".into(),
            ));
        }
        self.store
            .put(
                &paths::preference_doc(&normalized),
                to_document(&NotificationPreference { enabled })?,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::history::HistoryEntry;
    use crate::application::notifications::Notification;
    use chrono::{TimeZone, Utc};
    use tombola_core::store::DocumentPath;
    use tombola_store::MemoryDocumentStore;
    use tombola_test_support::{FailingDocumentStore, FixedClock, MockRng, SequenceRng};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    fn service(rng: Box<dyn DeterministicRng>) -> (Arc<MemoryDocumentStore>, EventService) {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = EventService::new(store.clone(), Arc::new(fixed_clock()), rng);
        (store, service)
    }

    async fn seeded_event(service: &EventService, capacity: i64, waiting: &[&str]) -> String {
        let mut event = Event::new("Harvest Dinner", &fixed_clock()).unwrap();
        event.set_capacity(capacity);
        for entrant in waiting {
            event.join_waiting(entrant).unwrap();
        }
        service.save_event(&event).await.unwrap();
        event.event_id().to_owned()
    }

    async fn notifications(store: &MemoryDocumentStore, event_id: &str) -> Vec<Notification> {
        store
            .list(&DocumentPath::new("Events", event_id), "Notifications")
            .await
            .unwrap()
            .into_iter()
            .map(|snapshot| serde_json::from_value(snapshot.data.unwrap()).unwrap())
            .collect()
    }

    async fn history_entries(store: &MemoryDocumentStore, event_id: &str) -> Vec<HistoryEntry> {
        store
            .list(&DocumentPath::new("Events", event_id), "History")
            .await
            .unwrap()
            .into_iter()
            .map(|snapshot| serde_json::from_value(snapshot.data.unwrap()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_draw_promotes_up_to_capacity() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 3, &["a@x.io", "b@x.io", "c@x.io", "d@x.io"]).await;

        let winners = service.run_lottery_draw(&id).await.unwrap();
        assert_eq!(winners, ["a@x.io", "b@x.io", "c@x.io"]);

        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Chosen), winners.as_slice());
        assert_eq!(event.list(EntrantList::Waiting), ["d@x.io"]);
        assert!(event.draw_complete());
        assert_eq!(event.draw_at(), Some(fixed_clock().0));

        let entries = history_entries(&store, &id).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "lottery_draw");
        assert_eq!(entries[0].entrants, winners);

        let docs = notifications(&store, &id).await;
        let wins = docs.iter().filter(|n| n.kind == NotificationKind::Win);
        let losses = docs.iter().filter(|n| n.kind == NotificationKind::Lose);
        assert_eq!(wins.count(), 3);
        assert_eq!(losses.clone().count(), 1);
        assert_eq!(losses.clone().next().unwrap().recipient, "d@x.io");
    }

    #[tokio::test]
    async fn test_draw_with_scripted_rng_picks_exact_winners() {
        let (_, service) = service(Box::new(SequenceRng::new(vec![3, 2])));
        let id = seeded_event(
            &service,
            2,
            &["a@x.io", "b@x.io", "c@x.io", "d@x.io", "e@x.io"],
        )
        .await;

        let winners = service.run_lottery_draw(&id).await.unwrap();
        assert_eq!(winners, ["d@x.io", "c@x.io"]);

        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Chosen), ["d@x.io", "c@x.io"]);
        assert_eq!(event.list(EntrantList::Waiting), ["a@x.io", "b@x.io", "e@x.io"]);
    }

    #[tokio::test]
    async fn test_draw_on_full_event_is_a_no_op() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io", "b@x.io"]).await;

        service.run_lottery_draw(&id).await.unwrap();
        let winners = service.run_lottery_draw(&id).await.unwrap();
        assert!(winners.is_empty());

        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Chosen), ["a@x.io"]);
        assert_eq!(event.list(EntrantList::Waiting), ["b@x.io"]);
        // No second round of history or notifications.
        assert_eq!(history_entries(&store, &id).await.len(), 1);
        assert_eq!(notifications(&store, &id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_draw_missing_event_is_not_found() {
        let (_, service) = service(Box::new(MockRng));
        let result = service.run_lottery_draw("nope").await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_draw_skips_recipients_who_opted_out() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["a@x.io", "b@x.io", "c@x.io"]).await;
        service
            .set_notification_preference("a@x.io", false)
            .await
            .unwrap();

        service.run_lottery_draw(&id).await.unwrap();

        let docs = notifications(&store, &id).await;
        let mut recipients: Vec<_> = docs.iter().map(|n| n.recipient.clone()).collect();
        recipients.sort();
        // a@x.io won but opted out; b@x.io and c@x.io have no preference
        // record and default to enabled.
        assert_eq!(recipients, ["b@x.io", "c@x.io"]);
    }

    #[tokio::test]
    async fn test_accept_invitation_moves_chosen_to_pending() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io"]).await;
        service.run_lottery_draw(&id).await.unwrap();

        service.accept_invitation(&id, "a@x.io").await.unwrap();

        let event = service.load_event(&id).await.unwrap();
        assert!(event.list(EntrantList::Chosen).is_empty());
        assert_eq!(event.list(EntrantList::Pending), ["a@x.io"]);
        assert!(
            history_entries(&store, &id)
                .await
                .iter()
                .any(|e| e.operation == "accept_invitation")
        );
    }

    #[tokio::test]
    async fn test_accept_requires_a_current_selection() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io"]).await;

        let result = service.accept_invitation(&id, "a@x.io").await;
        assert!(matches!(result, Err(DomainError::InvalidState(_))));

        // Failed preconditions leave no trace.
        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Waiting), ["a@x.io"]);
        assert!(history_entries(&store, &id).await.is_empty());
    }

    #[tokio::test]
    async fn test_decline_invitation_moves_chosen_to_cancelled() {
        let (_, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io"]).await;
        service.run_lottery_draw(&id).await.unwrap();

        service.decline_invitation(&id, "a@x.io").await.unwrap();

        let event = service.load_event(&id).await.unwrap();
        assert!(event.list(EntrantList::Chosen).is_empty());
        assert_eq!(event.list(EntrantList::Cancelled), ["a@x.io"]);
    }

    #[tokio::test]
    async fn test_complete_registration_confirms_pending_entrant() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io"]).await;
        service.run_lottery_draw(&id).await.unwrap();
        service.accept_invitation(&id, "a@x.io").await.unwrap();

        service.complete_registration(&id, "a@x.io").await.unwrap();

        let event = service.load_event(&id).await.unwrap();
        assert!(event.list(EntrantList::Pending).is_empty());
        assert_eq!(event.list(EntrantList::Registered), ["a@x.io"]);
        assert!(
            notifications(&store, &id)
                .await
                .iter()
                .any(|n| n.kind == NotificationKind::SignupSuccess && n.recipient == "a@x.io")
        );

        let repeat = service.complete_registration(&id, "a@x.io").await;
        assert!(matches!(repeat, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_sweep_cancels_every_unresponsive_chosen_entrant() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["p@x.io", "q@x.io"]).await;
        service.run_lottery_draw(&id).await.unwrap();

        let mut event = service.load_event(&id).await.unwrap();
        event.add_terminal("r@x.io", EntrantList::Cancelled).unwrap();
        service.save_event(&event).await.unwrap();

        service.cancel_unregistered_entrants(&id).await.unwrap();

        let event = service.load_event(&id).await.unwrap();
        assert!(event.list(EntrantList::Chosen).is_empty());
        let mut cancelled = event.list(EntrantList::Cancelled).to_vec();
        cancelled.sort();
        assert_eq!(cancelled, ["p@x.io", "q@x.io", "r@x.io"]);
        assert!(
            history_entries(&store, &id)
                .await
                .iter()
                .any(|e| e.operation == "sweep_unregistered" && e.entrants.len() == 2)
        );
    }

    #[tokio::test]
    async fn test_sweep_with_no_chosen_is_a_no_op() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["a@x.io"]).await;

        service.cancel_unregistered_entrants(&id).await.unwrap();

        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Waiting), ["a@x.io"]);
        assert!(history_entries(&store, &id).await.is_empty());
    }

    #[tokio::test]
    async fn test_join_waitlist_enforces_limit_and_uniqueness() {
        let (_, service) = service(Box::new(MockRng));
        let mut event = Event::new("Harvest Dinner", &fixed_clock()).unwrap();
        event.set_capacity(3);
        event.set_waitlist_limit(1);
        service.save_event(&event).await.unwrap();
        let id = event.event_id().to_owned();

        service.join_waitlist(&id, " a@x.io ").await.unwrap();
        let duplicate = service.join_waitlist(&id, "a@x.io").await;
        assert!(matches!(duplicate, Err(DomainError::InvalidState(_))));
        let over_limit = service.join_waitlist(&id, "b@x.io").await;
        assert!(matches!(over_limit, Err(DomainError::InvalidState(_))));

        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Waiting), ["a@x.io"]);
    }

    #[tokio::test]
    async fn test_join_waitlist_limit_falls_back_to_capacity() {
        let (_, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &[]).await;

        service.join_waitlist(&id, "a@x.io").await.unwrap();
        let result = service.join_waitlist(&id, "b@x.io").await;
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_join_waitlist_unbounded_when_capacity_and_limit_are_zero() {
        let (_, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 0, &[]).await;

        for entrant in ["a@x.io", "b@x.io", "c@x.io", "d@x.io"] {
            service.join_waitlist(&id, entrant).await.unwrap();
        }
        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Waiting).len(), 4);
    }

    #[tokio::test]
    async fn test_join_waitlist_rejects_full_event() {
        let (_, service) = service(Box::new(MockRng));
        let mut event = Event::new("Harvest Dinner", &fixed_clock()).unwrap();
        event.set_capacity(1);
        event.join_waiting("x@x.io").unwrap();
        event
            .move_entrant("x@x.io", EntrantList::Waiting, EntrantList::Pending)
            .unwrap();
        service.save_event(&event).await.unwrap();

        let result = service.join_waitlist(event.event_id(), "a@x.io").await;
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_leave_waitlist_removes_entrant() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["a@x.io"]).await;

        service.leave_waitlist(&id, "a@x.io").await.unwrap();
        let event = service.load_event(&id).await.unwrap();
        assert!(event.list(EntrantList::Waiting).is_empty());
        assert!(
            history_entries(&store, &id)
                .await
                .iter()
                .any(|e| e.operation == "leave_waitlist")
        );

        let repeat = service.leave_waitlist(&id, "a@x.io").await;
        assert!(matches!(repeat, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_notify_selected_targets_chosen_and_pending() {
        let (store, service) = service(Box::new(MockRng));
        let mut event = Event::new("Midnight Screening", &fixed_clock()).unwrap();
        event.set_capacity(5);
        for entrant in ["c1@x.io", "p1@x.io", "w1@x.io"] {
            event.join_waiting(entrant).unwrap();
        }
        event
            .move_entrant("c1@x.io", EntrantList::Waiting, EntrantList::Chosen)
            .unwrap();
        event
            .move_entrant("p1@x.io", EntrantList::Waiting, EntrantList::Pending)
            .unwrap();
        event.add_terminal("x1@x.io", EntrantList::Cancelled).unwrap();
        service.save_event(&event).await.unwrap();
        let id = event.event_id();

        service
            .notify_selected_entrants(id, Some("Doors open at 6pm"))
            .await
            .unwrap();

        let docs = notifications(&store, id).await;
        assert_eq!(docs.len(), 2);
        let mut recipients: Vec<_> = docs.iter().map(|n| n.recipient.clone()).collect();
        recipients.sort();
        assert_eq!(recipients, ["c1@x.io", "p1@x.io"]);
        for doc in &docs {
            assert_eq!(doc.kind, NotificationKind::OrgSelected);
            assert_eq!(doc.message, "Doors open at 6pm");
            assert!(!doc.seen);
        }
    }

    #[tokio::test]
    async fn test_notify_waitlist_uses_default_message_when_blank() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["w1@x.io"]).await;

        service.notify_waitlist_entrants(&id, Some("  ")).await.unwrap();

        let docs = notifications(&store, &id).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, NotificationKind::OrgWaitlist);
        assert!(docs[0].message.contains("Harvest Dinner"));
    }

    #[tokio::test]
    async fn test_notify_cancelled_skips_opted_out_recipient() {
        let (store, service) = service(Box::new(MockRng));
        let mut event = Event::new("Harvest Dinner", &fixed_clock()).unwrap();
        event.add_terminal("a@x.io", EntrantList::Cancelled).unwrap();
        event.add_terminal("b@x.io", EntrantList::Cancelled).unwrap();
        service.save_event(&event).await.unwrap();
        service
            .set_notification_preference(" A@X.io ", false)
            .await
            .unwrap();

        service
            .notify_cancelled_entrants(event.event_id(), None)
            .await
            .unwrap();

        let docs = notifications(&store, event.event_id()).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].recipient, "b@x.io");
        assert_eq!(docs[0].kind, NotificationKind::OrgCancelled);
    }

    #[tokio::test]
    async fn test_delete_event_removes_record_and_dependents() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io", "b@x.io"]).await;
        service.run_lottery_draw(&id).await.unwrap();
        assert!(!notifications(&store, &id).await.is_empty());

        service.delete_event(&id).await.unwrap();

        let snapshot = store.get(&DocumentPath::new("Events", &id)).await.unwrap();
        assert!(snapshot.data.is_none());
        assert!(notifications(&store, &id).await.is_empty());
        assert!(history_entries(&store, &id).await.is_empty());
        assert!(matches!(
            service.load_event(&id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_notification_preference_rejects_blank_recipient() {
        let (_, service) = service(Box::new(MockRng));
        let result = service.set_notification_preference("   ", true).await;
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let service = EventService::new(
            Arc::new(FailingDocumentStore),
            Arc::new(fixed_clock()),
            Box::new(MockRng),
        );

        let draw = service.run_lottery_draw("any").await;
        assert!(matches!(draw, Err(DomainError::StoreUnavailable(_))));

        let event = Event::new("Harvest Dinner", &fixed_clock()).unwrap();
        let save = service.save_event(&event).await;
        assert!(matches!(save, Err(DomainError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writer_forces_conflict() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 2, &["a@x.io", "b@x.io"]).await;

        // Interleave: read under one transaction, then overwrite the
        // record out-of-band before that transaction commits.
        let mut tx = Transaction::new(store.as_ref());
        let value = tx.get(&paths::event_doc(&id)).await.unwrap().unwrap();
        service
            .join_waitlist(&id, "c@x.io")
            .await
            .unwrap();
        tx.set(paths::event_doc(&id), value);
        let result = tx.commit().await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        // The out-of-band write survived untouched.
        let event = service.load_event(&id).await.unwrap();
        assert_eq!(
            event.list(EntrantList::Waiting),
            ["a@x.io", "b@x.io", "c@x.io"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_draws_cannot_double_promote() {
        let (store, service) = service(Box::new(MockRng));
        let id = seeded_event(&service, 1, &["a@x.io", "b@x.io"]).await;

        // One draw reads the event and stages its promotion...
        let mut tx = Transaction::new(store.as_ref());
        let value = tx.get(&paths::event_doc(&id)).await.unwrap().unwrap();
        let mut stale: Event = serde_json::from_value(value).unwrap();
        stale
            .move_entrant("b@x.io", EntrantList::Waiting, EntrantList::Chosen)
            .unwrap();
        stale.set_draw_complete(true);
        tx.set(paths::event_doc(&id), serde_json::to_value(&stale).unwrap());

        // ...while a second draw commits first.
        let winners = service.run_lottery_draw(&id).await.unwrap();
        assert_eq!(winners, ["a@x.io"]);

        let result = tx.commit().await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        // Capacity 1: exactly one promotion survived.
        let event = service.load_event(&id).await.unwrap();
        assert_eq!(event.list(EntrantList::Chosen), ["a@x.io"]);
        assert_eq!(event.list(EntrantList::Waiting), ["b@x.io"]);
    }
}
