//! Tombola Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the event
//! lifecycle context and the store backends depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod rng;
pub mod store;
