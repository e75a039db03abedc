//! Tombola — document store backends.
//!
//! Two implementations of `tombola_core::store::DocumentStore`: an
//! in-memory store for tests and single-process deployments, and a
//! PostgreSQL-backed store for everything else. Both enforce the same
//! optimistic-commit contract, including delete tombstones.

pub mod memory;
pub mod pg_document_store;
pub mod schema;

pub use memory::MemoryDocumentStore;
pub use pg_document_store::PgDocumentStore;
