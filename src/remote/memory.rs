//! In-process document store, the offline/test counterpart of
//! [`HttpClient`](crate::remote::HttpClient).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::error::{MapError, MapResult};
use crate::remote::DocumentStore;

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Value>,
    create_calls: usize,
    update_calls: usize,
    content_calls: usize,
}

/// Clones share the same backing map, so a test can keep a handle while the
/// engine owns another.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a document under a fixed key (legacy-shape fixtures).
    pub fn seed(&self, id: &str, doc: Value) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.docs.insert(id.to_string(), doc);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").update_calls
    }

    pub fn content_calls(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").content_calls
    }
}

impl DocumentStore for MemoryStore {
    async fn create(&self, doc: &Value) -> MapResult<String> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.create_calls += 1;
        let id = Uuid::new_v4().to_string();
        let mut stored = doc.clone();
        if let Some(obj) = stored.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        inner.docs.insert(id.clone(), stored);
        Ok(id)
    }

    async fn update(&self, id: &str, doc: &Value) -> MapResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.update_calls += 1;
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| MapError::NotFound(id.to_string()))?;
        let mut stored = doc.clone();
        if let Some(obj) = stored.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        *entry = stored;
        Ok(())
    }

    async fn update_content(&self, id: &str, doc: &Value) -> MapResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.content_calls += 1;
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| MapError::NotFound(id.to_string()))?;
        if let (Some(obj), Some(content)) = (entry.as_object_mut(), doc.get("content")) {
            obj.insert("content".to_string(), content.clone());
        }
        Ok(())
    }

    async fn rename(&self, id: &str, name: &str) -> MapResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| MapError::NotFound(id.to_string()))?;
        if let Some(obj) = entry.as_object_mut() {
            obj.insert("name".to_string(), Value::String(name.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> MapResult<Value> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| MapError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> MapResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner
            .docs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::NotFound(id.to_string()))
    }

    async fn list(&self) -> MapResult<Vec<Value>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .docs
            .iter()
            .map(|(id, doc)| {
                let mut listed = doc.clone();
                if let Some(obj) = listed.as_object_mut() {
                    obj.entry("id".to_string())
                        .or_insert_with(|| Value::String(id.clone()));
                }
                listed
            })
            .collect())
    }
}
