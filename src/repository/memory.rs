//! Process-local document store

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    query::{sort_key, Filter, FindQuery},
    Collection, DocumentStore,
};
use crate::error::AppResult;

/// In-memory store keeping documents in insertion order per collection
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, IndexMap<Uuid, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> AppResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let mut documents: Vec<Value> = collections
            .get(&collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| query.filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &query.sort {
            documents.sort_by_cached_key(|doc| sort_key(doc, field));
        }

        Ok(documents.into_iter().map(|doc| query.project(doc)).collect())
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn save(&self, collection: Collection, id: Uuid, document: Value) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().insert(id, document);
        Ok(())
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(&collection) {
            docs.shift_remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_is_insert_or_update() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        store
            .save(Collection::Genres, id, json!({ "id": id, "name": "Fantasy" }))
            .await
            .unwrap();
        store
            .save(Collection::Genres, id, json!({ "id": id, "name": "Poetry" }))
            .await
            .unwrap();

        assert_eq!(store.count(Collection::Genres, &Filter::all()).await.unwrap(), 1);
        let doc = store.find_by_id(Collection::Genres, id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Poetry");
    }

    #[tokio::test]
    async fn test_find_sorts_and_filters() {
        let store = MemoryStore::new();
        for (name, kind) in [("Zola", "a"), ("Austen", "a"), ("Marx", "b")] {
            let id = Uuid::new_v4();
            store
                .save(Collection::Authors, id, json!({ "id": id, "family_name": name, "kind": kind }))
                .await
                .unwrap();
        }

        let query = FindQuery::filtered(Filter::all().eq("kind", "a")).sort_by("family_name");
        let found = store.find(Collection::Authors, &query).await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d["family_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Austen", "Zola"]);
    }

    #[tokio::test]
    async fn test_sort_is_case_sensitive_with_missing_first() {
        let store = MemoryStore::new();
        for name in [Some("apple"), Some("Banana"), None] {
            let id = Uuid::new_v4();
            let mut doc = json!({ "id": id });
            if let Some(name) = name {
                doc["name"] = json!(name);
            }
            store.save(Collection::Genres, id, doc).await.unwrap();
        }

        let found = store
            .find(Collection::Genres, &FindQuery::all().sort_by("name"))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|d| d["name"].as_str()).collect();
        assert_eq!(names, vec![None, Some("Banana"), Some("apple")]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_an_error() {
        let store = MemoryStore::new();
        store.delete_by_id(Collection::Books, Uuid::new_v4()).await.unwrap();
        assert!(store
            .find(Collection::Books, &FindQuery::all())
            .await
            .unwrap()
            .is_empty());
    }
}
