//! Lottery allocator: unbiased sampling of waiting entrants.

use tombola_core::rng::DeterministicRng;

use super::event::{EntrantList, Event};

/// Computes the set of entrants to promote from waiting to chosen.
///
/// Samples `min(remaining_slots, |waiting|)` identifiers uniformly at
/// random without replacement via a partial Fisher–Yates shuffle, so the
/// order of the waiting list never biases selection. When no slots
/// remain the result is empty and the caller must leave the event
/// untouched.
///
/// Pure with respect to the event; the orchestrator performs the actual
/// list moves.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn select_winners(event: &Event, rng: &mut dyn DeterministicRng) -> Vec<String> {
    let remaining = event.remaining_slots();
    if remaining == 0 {
        return Vec::new();
    }

    let mut pool: Vec<String> = event.list(EntrantList::Waiting).to_vec();
    let picks = remaining.min(pool.len());
    for i in 0..picks {
        let j = rng.next_u32_range(i as u32, (pool.len() - 1) as u32) as usize;
        pool.swap(i, j);
    }
    pool.truncate(picks);
    pool
}
