use std::sync::Arc;

use serde_json::Value;

use crate::workflows::collaboration::domain::{
    Application, Caller, Post, PostDraft, PostType,
};
use crate::workflows::collaboration::engine::WorkflowEngine;
use crate::workflows::collaboration::store::{
    collections, Document, DocumentStore, MemoryStore, StoreError,
};

pub(super) fn author() -> Caller {
    Caller::new("u1", "Alice")
}

pub(super) fn developer() -> Caller {
    Caller::new("u2", "Bob")
}

pub(super) fn second_developer() -> Caller {
    Caller::new("u3", "Carol")
}

pub(super) fn stranger() -> Caller {
    Caller::new("u9", "Mallory")
}

pub(super) fn problem_draft() -> PostDraft {
    PostDraft {
        title: "Fix flaky data sync".to_string(),
        description: "Our sync job drops records under load.".to_string(),
        post_type: PostType::Problem,
        tags: vec!["backend".to_string(), "sync".to_string()],
    }
}

pub(super) fn general_draft() -> PostDraft {
    PostDraft {
        title: "Thoughts on code review culture".to_string(),
        description: "An open discussion thread.".to_string(),
        post_type: PostType::General,
        tags: Vec::new(),
    }
}

pub(super) fn build_engine() -> (WorkflowEngine<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (WorkflowEngine::new(store.clone()), store)
}

pub(super) fn publish_problem(engine: &WorkflowEngine<MemoryStore>) -> Post {
    engine
        .publish_post(&author(), problem_draft())
        .expect("post publishes")
}

pub(super) fn applied(engine: &WorkflowEngine<MemoryStore>) -> (Post, Application) {
    let post = publish_problem(engine);
    let application = engine
        .apply(&developer(), &post.id, "I can take this on.")
        .expect("application submits");
    (post, application)
}

/// Store double whose notification collection is broken while everything
/// else works, for proving dispatch failures never fail the transition.
pub(super) struct BrokenNotificationsStore {
    inner: MemoryStore,
}

impl BrokenNotificationsStore {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryStore::default(),
        }
    }
}

impl DocumentStore for BrokenNotificationsStore {
    fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        if collection == collections::NOTIFICATIONS {
            return Err(StoreError::Unavailable(
                "notification partition offline".to_string(),
            ));
        }
        self.inner.create(collection, doc)
    }

    fn create_unique(
        &self,
        collection: &str,
        doc: Document,
        unique_fields: &[&str],
    ) -> Result<String, StoreError> {
        self.inner.create_unique(collection, doc, unique_fields)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id)
    }

    fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.query(collection, filters)
    }

    fn update(&self, collection: &str, id: &str, changes: Document) -> Result<(), StoreError> {
        self.inner.update(collection, id, changes)
    }

    fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &[(&str, Value)],
        changes: Document,
    ) -> Result<bool, StoreError> {
        self.inner.update_if(collection, id, expected, changes)
    }

    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        self.inner.increment(collection, id, field, delta)
    }

    fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.remove(collection, id)
    }
}
