use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

use super::{Document, DocumentStore, StoreError};

/// In-process document store. One mutex guards every collection, which is
/// what makes the conditional primitives (`create_unique`, `update_if`,
/// `increment`) atomic with respect to concurrent callers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Default)]
struct Collections {
    documents: HashMap<String, BTreeMap<String, Document>>,
    sequences: HashMap<String, u64>,
}

impl Collections {
    fn next_id(&mut self, collection: &str) -> String {
        let sequence = self.sequences.entry(collection.to_string()).or_insert(0);
        *sequence += 1;
        format!("{collection}-{:06}", *sequence)
    }

    fn collection_mut(&mut self, collection: &str) -> &mut BTreeMap<String, Document> {
        self.documents.entry(collection.to_string()).or_default()
    }
}

fn matches(doc: &Document, filters: &[(&str, Value)]) -> bool {
    filters
        .iter()
        .all(|(field, expected)| doc.get(*field) == Some(expected))
}

impl MemoryStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id(collection);
        inner.collection_mut(collection).insert(id.clone(), doc);
        Ok(id)
    }

    fn create_unique(
        &self,
        collection: &str,
        doc: Document,
        unique_fields: &[&str],
    ) -> Result<String, StoreError> {
        let mut inner = self.lock()?;

        let wanted: Vec<(&str, Value)> = unique_fields
            .iter()
            .map(|field| (*field, doc.get(*field).cloned().unwrap_or(Value::Null)))
            .collect();
        let taken = inner
            .documents
            .get(collection)
            .is_some_and(|docs| docs.values().any(|existing| matches(existing, &wanted)));
        if taken {
            return Err(StoreError::UniqueConflict);
        }

        let id = inner.next_id(collection);
        inner.collection_mut(collection).insert(id.clone(), doc);
        Ok(id)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .documents
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .documents
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| matches(doc, filters))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(&self, collection: &str, id: &str, changes: Document) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        for (field, value) in changes {
            doc.insert(field, value);
        }
        Ok(())
    }

    fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &[(&str, Value)],
        changes: Document,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        if !matches(doc, expected) {
            return Ok(false);
        }
        for (field, value) in changes {
            doc.insert(field, value);
        }
        Ok(true)
    }

    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;

        let current = match doc.get(field) {
            None => 0,
            Some(Value::Number(number)) => number.as_i64().ok_or_else(|| {
                StoreError::Malformed(format!("field {field} is not an integer"))
            })?,
            Some(_) => {
                return Err(StoreError::Malformed(format!(
                    "field {field} is not numeric"
                )))
            }
        };
        let next = current.saturating_add(delta).max(0);
        doc.insert(field.to_string(), Value::from(next));
        Ok(next)
    }

    fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .ok_or(StoreError::NotFound)?;
        Ok(())
    }
}
