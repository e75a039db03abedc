//! Document store database schema.

/// SQL to create the documents table.
///
/// `data IS NULL` marks a tombstone: the row survives deletion so the
/// version column keeps increasing and stale readers still conflict.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    path    TEXT PRIMARY KEY,
    data    JSONB,
    version BIGINT NOT NULL
);
";
