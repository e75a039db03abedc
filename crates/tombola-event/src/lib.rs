//! Tombola — event lifecycle bounded context.
//!
//! Responsible for the entrant lifecycle of capacity-limited events:
//! waiting-list membership, the lottery draw, invitation responses, the
//! non-responder sweep, notifications, and audit history.

pub mod application;
pub mod domain;
