//! Test store — a `DocumentStore` that always fails, for error paths.

use async_trait::async_trait;
use tombola_core::error::DomainError;
use tombola_core::store::{DocumentPath, DocumentStore, Snapshot, Write};

/// A document store where every call returns `StoreUnavailable`. Useful
/// for verifying that store failures propagate instead of being
/// swallowed.
#[derive(Debug)]
pub struct FailingDocumentStore;

fn unavailable() -> DomainError {
    DomainError::StoreUnavailable("connection refused".into())
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn get(&self, _path: &DocumentPath) -> Result<Snapshot, DomainError> {
        Err(unavailable())
    }

    async fn commit(
        &self,
        _reads: &[(DocumentPath, i64)],
        _writes: &[Write],
    ) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn put(
        &self,
        _path: &DocumentPath,
        _data: serde_json::Value,
    ) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _path: &DocumentPath) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn list(
        &self,
        _parent: &DocumentPath,
        _collection: &str,
    ) -> Result<Vec<Snapshot>, DomainError> {
        Err(unavailable())
    }
}
