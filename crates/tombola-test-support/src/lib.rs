//! Shared test mocks and utilities for the Tombola event lottery.

mod clock;
mod rng;
mod store;

pub use clock::FixedClock;
pub use rng::{MockRng, SequenceRng};
pub use store::FailingDocumentStore;
