//! Concurrent gathering of the independent queries behind one view.
//!
//! Every query of an [`Aggregation`] is started at once and awaited to
//! completion. The first failure observed wins and the view data is
//! discarded; failures observed after it are only logged. A `require`d query
//! that finds nothing turns the whole aggregation into [`Gathered::NotFound`].

use std::{collections::HashMap, future::Future};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Named results of a view's queries, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ViewData(IndexMap<String, Value>);

impl ViewData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, keeping its original position
    pub fn insert(&mut self, name: &str, value: impl Serialize) -> AppResult<()> {
        self.0.insert(name.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn with(mut self, name: &str, value: impl Serialize) -> AppResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Typed copy of an entry
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> AppResult<T> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| AppError::Internal(format!("view data has no entry {:?}", name)))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

enum Fetched {
    Found(Value),
    Missing,
}

/// A set of named queries to run concurrently
#[derive(Default)]
pub struct Aggregation<'a> {
    queries: Vec<(&'static str, BoxFuture<'a, AppResult<Fetched>>)>,
}

/// Outcome of running an [`Aggregation`]
#[derive(Debug)]
pub enum Gathered {
    Ready(ViewData),
    /// A required query found nothing
    NotFound(&'static str),
    Failed(AppError),
}

impl Gathered {
    pub fn into_result(self) -> AppResult<ViewData> {
        match self {
            Gathered::Ready(data) => Ok(data),
            Gathered::NotFound(name) => Err(AppError::NotFound(format!("{} not found", name))),
            Gathered::Failed(err) => Err(err),
        }
    }
}

impl<'a> Aggregation<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query whose result is stored under `name`
    pub fn query<T, F>(mut self, name: &'static str, query: F) -> Self
    where
        F: Future<Output = AppResult<T>> + Send + 'a,
        T: Serialize + Send + 'a,
    {
        let fetch = async move {
            let value = query.await?;
            Ok(Fetched::Found(serde_json::to_value(value)?))
        };
        self.queries.push((name, fetch.boxed()));
        self
    }

    /// Add a query that must find something for the view to exist
    pub fn require<T, F>(mut self, name: &'static str, query: F) -> Self
    where
        F: Future<Output = AppResult<Option<T>>> + Send + 'a,
        T: Serialize + Send + 'a,
    {
        let fetch = async move {
            match query.await? {
                Some(value) => Ok(Fetched::Found(serde_json::to_value(value)?)),
                None => Ok(Fetched::Missing),
            }
        };
        self.queries.push((name, fetch.boxed()));
        self
    }

    /// Run every query to completion
    pub async fn run(self) -> Gathered {
        let names: Vec<&'static str> = self.queries.iter().map(|(name, _)| *name).collect();
        let mut pending: FuturesUnordered<_> = self
            .queries
            .into_iter()
            .map(|(name, query)| query.map(move |outcome| (name, outcome)))
            .collect();

        let mut found: HashMap<&'static str, Value> = HashMap::with_capacity(names.len());
        let mut missing = None;
        let mut failure = None;

        while let Some((name, outcome)) = pending.next().await {
            match outcome {
                Ok(Fetched::Found(value)) => {
                    found.insert(name, value);
                }
                Ok(Fetched::Missing) => {
                    missing.get_or_insert(name);
                }
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    } else {
                        tracing::debug!(query = name, error = %err, "Discarding later aggregation failure");
                    }
                }
            }
        }

        if let Some(err) = failure {
            return Gathered::Failed(err);
        }
        if let Some(name) = missing {
            return Gathered::NotFound(name);
        }

        let mut data = ViewData::new();
        for name in names {
            if let Some(value) = found.remove(name) {
                data.0.insert(name.to_string(), value);
            }
        }
        Gathered::Ready(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        models::{Book, BookInstance},
        repository::{FindQuery, MockDocumentStore, Repository},
    };
    use uuid::Uuid;

    async fn after_yields<T>(yields: usize, value: T) -> T {
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        value
    }

    #[tokio::test]
    async fn test_results_keep_declaration_order() {
        let data = Aggregation::new()
            .query("slow", after_yields(3, Ok::<_, AppError>(1)))
            .query("fast", after_yields(0, Ok::<_, AppError>("two")))
            .run()
            .await
            .into_result()
            .unwrap();

        assert_eq!(data.names().collect::<Vec<_>>(), vec!["slow", "fast"]);
        assert_eq!(data.get_as::<i32>("slow").unwrap(), 1);
        assert_eq!(data.get_as::<String>("fast").unwrap(), "two");
    }

    #[tokio::test]
    async fn test_first_observed_failure_wins() {
        let gathered = Aggregation::new()
            .query("late", after_yields(5, Err::<i32, _>(AppError::Internal("late".into()))))
            .query("ok", after_yields(1, Ok::<_, AppError>(7)))
            .query("early", after_yields(0, Err::<i32, _>(AppError::Internal("early".into()))))
            .run()
            .await;

        match gathered {
            Gathered::Failed(AppError::Internal(msg)) => assert_eq!(msg, "early"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_waits_for_slow_queries_after_failure() {
        let settled = Arc::new(AtomicBool::new(false));
        let slow = {
            let settled = settled.clone();
            async move {
                let value = after_yields(10, Ok::<_, AppError>(1)).await;
                settled.store(true, Ordering::SeqCst);
                value
            }
        };

        let gathered = Aggregation::new()
            .query("slow", slow)
            .query("broken", async { Err::<i32, _>(AppError::Internal("down".into())) })
            .run()
            .await;

        assert!(matches!(gathered, Gathered::Failed(_)));
        assert!(settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_required_entity() {
        let gathered = Aggregation::new()
            .require("book", async { Ok::<Option<i32>, AppError>(None) })
            .query("book_instances", async { Ok::<Vec<i32>, AppError>(Vec::new()) })
            .run()
            .await;

        assert!(matches!(gathered, Gathered::NotFound("book")));
        assert!(matches!(gathered.into_result(), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failure_beats_not_found() {
        let gathered = Aggregation::new()
            .require("book", async { Ok::<Option<i32>, AppError>(None) })
            .query("count", after_yields(2, Err::<i32, _>(AppError::Internal("down".into()))))
            .run()
            .await;

        assert!(matches!(gathered, Gathered::Failed(_)));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_through_repository() {
        let mut store = MockDocumentStore::new();
        store.expect_find_by_id().returning(|_, _| Ok(None));
        store
            .expect_find()
            .returning(|_, _| Err(AppError::Internal("connection reset".into())));
        let repository = Repository::new(Arc::new(store));

        let id = Uuid::new_v4();
        let gathered = Aggregation::new()
            .require("book", repository.find_by_id::<Book>(id))
            .query("book_instances", repository.find::<BookInstance>(FindQuery::all()))
            .run()
            .await;

        match gathered {
            Gathered::Failed(AppError::Internal(msg)) => assert_eq!(msg, "connection reset"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
