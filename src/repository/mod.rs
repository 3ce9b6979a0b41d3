//! Repository layer for catalog persistence.
//!
//! The backing store is a document store with no transactions and no
//! foreign keys: every call is an independent round trip. Referential
//! integrity is enforced by the services, not here.

pub mod memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Filter, FindQuery};

/// The four catalog collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    Authors,
    Genres,
    BookInstances,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Authors => "authors",
            Collection::Genres => "genres",
            Collection::BookInstances => "bookinstances",
        }
    }
}

/// Untyped persistence surface. Documents are JSON objects carrying their id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> AppResult<Vec<Value>>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>>;

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64>;

    /// Insert or replace the document stored under `id`
    async fn save(&self, collection: Collection, id: Uuid, document: Value) -> AppResult<()>;

    /// Remove the document; a missing id is not an error
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> AppResult<()>;
}

/// A persisted catalog entity
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

/// A typed partial view of an entity, loaded with a field projection
pub trait Projection: DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;
    const FIELDS: &'static [&'static str];
}

/// Typed access to the document store, shared by every service
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find<E: Entity>(&self, query: FindQuery) -> AppResult<Vec<E>> {
        let documents = self.store.find(E::COLLECTION, &query).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }

    pub async fn find_one<E: Entity>(&self, filter: Filter) -> AppResult<Option<E>> {
        Ok(self.find::<E>(FindQuery::filtered(filter)).await?.into_iter().next())
    }

    /// Load only the fields of a projection type
    pub async fn select<P: Projection>(&self, query: FindQuery) -> AppResult<Vec<P>> {
        let query = query.select(P::FIELDS);
        let documents = self.store.find(P::COLLECTION, &query).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }

    pub async fn find_by_id<E: Entity>(&self, id: Uuid) -> AppResult<Option<E>> {
        match self.store.find_by_id(E::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn count<E: Entity>(&self, filter: Filter) -> AppResult<u64> {
        self.store.count(E::COLLECTION, &filter).await
    }

    pub async fn save<E: Entity>(&self, entity: &E) -> AppResult<()> {
        let document = serde_json::to_value(entity)?;
        tracing::debug!(collection = E::COLLECTION.as_str(), id = %entity.id(), "save");
        self.store.save(E::COLLECTION, entity.id(), document).await
    }

    pub async fn delete<E: Entity>(&self, id: Uuid) -> AppResult<()> {
        tracing::debug!(collection = E::COLLECTION.as_str(), %id, "delete");
        self.store.delete_by_id(E::COLLECTION, id).await
    }
}
