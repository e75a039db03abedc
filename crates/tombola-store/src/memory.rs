//! In-memory `DocumentStore` implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tombola_core::error::DomainError;
use tombola_core::store::{DocumentPath, DocumentStore, Snapshot, Write};

/// In-memory versioned document store.
///
/// Every mutation bumps a store-wide sequence and stamps the touched
/// document with it, so a document's version strictly increases over its
/// lifetime. Deletions keep the entry as a tombstone (`data: None`): a
/// transaction that read the document as missing still conflicts with a
/// concurrent create-then-delete.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: BTreeMap<DocumentPath, Stored>,
    sequence: i64,
}

#[derive(Debug)]
struct Stored {
    version: i64,
    data: Option<serde_json::Value>,
}

impl Inner {
    fn version_of(&self, path: &DocumentPath) -> i64 {
        self.docs.get(path).map_or(0, |stored| stored.version)
    }

    fn apply(&mut self, write: &Write) {
        self.sequence += 1;
        let (path, data) = match write {
            Write::Set { path, data } => (path, Some(data.clone())),
            Write::Delete { path } => (path, None),
        };
        self.docs.insert(
            path.clone(),
            Stored {
                version: self.sequence,
                data,
            },
        );
    }
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::StoreUnavailable("document store mutex poisoned".into()))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Snapshot, DomainError> {
        let inner = self.lock()?;
        let stored = inner.docs.get(path);
        Ok(Snapshot {
            path: path.clone(),
            version: stored.map_or(0, |s| s.version),
            data: stored.and_then(|s| s.data.clone()),
        })
    }

    async fn commit(
        &self,
        reads: &[(DocumentPath, i64)],
        writes: &[Write],
    ) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        for (path, expected) in reads {
            let actual = inner.version_of(path);
            if actual != *expected {
                return Err(DomainError::Conflict {
                    path: path.to_string(),
                    expected: *expected,
                    actual,
                });
            }
        }
        for write in writes {
            inner.apply(write);
        }
        Ok(())
    }

    async fn put(&self, path: &DocumentPath, data: serde_json::Value) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        inner.apply(&Write::Set {
            path: path.clone(),
            data,
        });
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        inner.apply(&Write::Delete { path: path.clone() });
        Ok(())
    }

    async fn list(
        &self,
        parent: &DocumentPath,
        collection: &str,
    ) -> Result<Vec<Snapshot>, DomainError> {
        let prefix = format!("{parent}/{collection}/");
        let inner = self.lock()?;
        Ok(inner
            .docs
            .iter()
            .filter(|(path, stored)| {
                stored.data.is_some()
                    && path
                        .as_str()
                        .strip_prefix(&prefix)
                        .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(path, stored)| Snapshot {
                path: path.clone(),
                version: stored.version,
                data: stored.data.clone(),
            })
            .collect())
    }
}
