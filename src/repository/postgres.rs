//! PostgreSQL document store.
//!
//! Every entity lives in the `documents` table as a JSONB body keyed by
//! (collection, id). Equality predicates match either a scalar field or an
//! element of an array field.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, Pool, Postgres};
use uuid::Uuid;

use super::{
    query::{Filter, FindQuery},
    Collection, DocumentStore,
};
use crate::error::AppResult;

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Build the WHERE clause for a filter. `$1` is always the collection;
    /// each predicate takes two parameters (field, value) starting at `$2`.
    /// Returns the clause and the next free parameter index.
    fn where_clause(filter: &Filter) -> (String, usize) {
        let mut clause = String::from("collection = $1");
        let mut next = 2;
        for _ in filter.predicates() {
            clause.push_str(&format!(
                " AND (body -> (${f}::text) = to_jsonb(${v}::text) \
                 OR body -> (${f}::text) @> jsonb_build_array(${v}::text))",
                f = next,
                v = next + 1
            ));
            next += 2;
        }
        (clause, next)
    }

    /// ORDER BY for an optional sort field bound at `$param`. Compared
    /// byte-wise with a missing field as the empty string, matching
    /// `query::sort_key`.
    fn order_clause(sorted: bool, param: usize) -> String {
        if sorted {
            format!(
                "ORDER BY COALESCE(body ->> (${}::text), '') COLLATE \"C\", seq",
                param
            )
        } else {
            "ORDER BY seq".to_string()
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> AppResult<Vec<Value>> {
        let (where_clause, next) = Self::where_clause(&query.filter);
        let order = Self::order_clause(query.sort.is_some(), next);
        let sql = format!("SELECT body FROM documents WHERE {} {}", where_clause, order);

        let mut select = sqlx::query_scalar::<_, Json<Value>>(&sql).bind(collection.as_str());
        for (field, value) in query.filter.predicates() {
            select = select.bind(field.as_str()).bind(value.as_str());
        }
        if let Some(ref sort) = query.sort {
            select = select.bind(sort.as_str());
        }

        let rows = select.fetch_all(&self.pool).await?;
        tracing::debug!(collection = collection.as_str(), rows = rows.len(), "find");

        Ok(rows.into_iter().map(|Json(doc)| query.project(doc)).collect())
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let (where_clause, _) = Self::where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", where_clause);

        let mut count = sqlx::query_scalar::<_, i64>(&sql).bind(collection.as_str());
        for (field, value) in filter.predicates() {
            count = count.bind(field.as_str()).bind(value.as_str());
        }

        let total = count.fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn save(&self, collection: Collection, id: Uuid, document: Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
