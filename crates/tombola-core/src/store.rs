//! Document store abstraction.
//!
//! The lifecycle operations run against a single logical document store
//! offering atomic read-modify-write over one event record and its
//! dependent sub-documents. The contract is optimistic: a [`Transaction`]
//! records the version of every document it reads and stages its writes;
//! [`DocumentStore::commit`] applies the writes only if every recorded
//! version is still current, otherwise it fails with
//! [`DomainError::Conflict`] and the caller decides whether to retry.

use async_trait::async_trait;

use crate::error::DomainError;

/// Slash-joined path addressing one document, e.g. `Events/{id}` or
/// `Events/{id}/Notifications/{doc}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Builds a top-level document path `{collection}/{document_id}`.
    #[must_use]
    pub fn new(collection: &str, document_id: &str) -> Self {
        Self(format!("{collection}/{document_id}"))
    }

    /// Builds a path to a document in a sub-collection of `self`.
    #[must_use]
    pub fn child(&self, collection: &str, document_id: &str) -> Self {
        Self(format!("{}/{collection}/{document_id}", self.0))
    }

    /// Returns the full path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document read from the store together with its version.
///
/// Version 0 means the document has never been written; a document that
/// was deleted keeps a tombstone version so that a transaction which read
/// it as missing still conflicts with a concurrent re-creation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Path of the document.
    pub path: DocumentPath,
    /// Store version at read time.
    pub version: i64,
    /// Document payload, or `None` when missing or deleted.
    pub data: Option<serde_json::Value>,
}

/// A staged write inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Create or replace a document.
    Set {
        /// Target document path.
        path: DocumentPath,
        /// Full replacement payload.
        data: serde_json::Value,
    },
    /// Delete a document.
    Delete {
        /// Target document path.
        path: DocumentPath,
    },
}

impl Write {
    /// Returns the path this write targets.
    #[must_use]
    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Backing store for versioned JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a single document; missing documents come back with their
    /// tombstone version (0 when never written) and no data.
    async fn get(&self, path: &DocumentPath) -> Result<Snapshot, DomainError>;

    /// Atomically applies `writes` iff every `(path, version)` in `reads`
    /// still matches the stored version.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Conflict`] when any read version is stale,
    /// or [`DomainError::StoreUnavailable`] on transport failure.
    async fn commit(
        &self,
        reads: &[(DocumentPath, i64)],
        writes: &[Write],
    ) -> Result<(), DomainError>;

    /// Unconditionally creates or replaces a single document.
    async fn put(&self, path: &DocumentPath, data: serde_json::Value) -> Result<(), DomainError>;

    /// Unconditionally deletes a single document.
    async fn delete(&self, path: &DocumentPath) -> Result<(), DomainError>;

    /// Lists the live documents in `{parent}/{collection}`.
    async fn list(
        &self,
        parent: &DocumentPath,
        collection: &str,
    ) -> Result<Vec<Snapshot>, DomainError>;
}

/// One atomic read-modify-write unit against the store.
///
/// Reads record the observed document version; writes are staged and only
/// reach the store on [`Transaction::commit`]. Staged writes are visible
/// to later reads in the same transaction (read-your-writes).
pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    reads: Vec<(DocumentPath, i64)>,
    writes: Vec<Write>,
}

impl<'a> Transaction<'a> {
    /// Starts an empty transaction against `store`.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Reads a document, recording its version for the commit-time check.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StoreUnavailable`] on transport failure.
    pub async fn get(
        &mut self,
        path: &DocumentPath,
    ) -> Result<Option<serde_json::Value>, DomainError> {
        // Read-your-writes: the latest staged write wins over the store.
        for write in self.writes.iter().rev() {
            match write {
                Write::Set { path: p, data } if p == path => return Ok(Some(data.clone())),
                Write::Delete { path: p } if p == path => return Ok(None),
                _ => {}
            }
        }

        let snapshot = self.store.get(path).await?;
        if !self.reads.iter().any(|(p, _)| p == path) {
            self.reads.push((path.clone(), snapshot.version));
        }
        Ok(snapshot.data)
    }

    /// Stages a create-or-replace of `path`.
    pub fn set(&mut self, path: DocumentPath, data: serde_json::Value) {
        self.writes.push(Write::Set { path, data });
    }

    /// Stages a deletion of `path`.
    pub fn delete(&mut self, path: DocumentPath) {
        self.writes.push(Write::Delete { path });
    }

    /// Returns true when no writes have been staged.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commits the transaction: all staged writes apply together or none
    /// do.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Conflict`] when a concurrent transaction
    /// changed a document this one read.
    pub async fn commit(self) -> Result<(), DomainError> {
        self.store.commit(&self.reads, &self.writes).await
    }
}
