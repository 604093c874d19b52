//! Loosely typed document persistence contract.
//!
//! The store is the single source of truth for workflow state; the engine
//! keeps no authoritative cache across calls. Fields are plain JSON key/value
//! pairs with no schema enforced at this layer. Beyond the basic
//! create/get/query/update surface, the contract requires three atomic
//! primitives (`create_unique`, `update_if`, `increment`) so the engine can
//! express its invariants as single store operations instead of separate
//! read-then-write calls.

mod memory;

use serde_json::{Map, Value};

pub use memory::MemoryStore;

/// A stored record: loose key/value fields keyed by the document id.
pub type Document = Map<String, Value>;

/// Collection names shared by the engine and any store adapter.
pub mod collections {
    pub const POSTS: &str = "posts";
    pub const APPLICATIONS: &str = "applications";
    pub const PENDING_PROJECTS: &str = "pending_projects";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("a document with the same unique fields already exists")]
    UniqueConflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document field is malformed: {0}")]
    Malformed(String),
}

/// Storage abstraction so the workflow engine can be exercised against any
/// document database.
pub trait DocumentStore: Send + Sync {
    /// Persist a new document and return its generated id.
    fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    /// Persist a new document only if no existing document in the collection
    /// matches it on every one of `unique_fields`. The check and the insert
    /// are one atomic step.
    fn create_unique(
        &self,
        collection: &str,
        doc: Document,
        unique_fields: &[&str],
    ) -> Result<String, StoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Equality query over document fields. Results are unordered and reflect
    /// current store state; a fresh call re-executes from scratch.
    fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Partial update, last-writer-wins. Fails with `NotFound` if the
    /// document does not exist.
    fn update(&self, collection: &str, id: &str, changes: Document) -> Result<(), StoreError>;

    /// Compare-and-swap: apply `changes` only while the document still
    /// matches every `(field, value)` pair in `expected`. Returns whether the
    /// update was applied.
    fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &[(&str, Value)],
        changes: Document,
    ) -> Result<bool, StoreError>;

    /// Atomically add `delta` to a numeric field (missing fields count as
    /// zero, and the result never goes below zero) and return the new value.
    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// Remove a document. The engine itself never deletes workflow records;
    /// this exists for the surrounding platform, which owns cleanup.
    fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
