//! Referential integrity for deletions.
//!
//! The store has no foreign keys, so a parent is only removed after a fresh
//! check that nothing references it. Check and delete are separate round
//! trips; a dependent inserted in between is not detected.

use uuid::Uuid;

use super::aggregate::Aggregation;
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, BookInstance, Genre},
    repository::{Entity, Filter, FindQuery, Repository},
};

/// An entity that other documents point at
pub trait Guarded: Entity {
    type Dependent: Entity;

    /// Field of the dependent holding this entity's id (scalar or array)
    const REFERENCE_FIELD: &'static str;
}

impl Guarded for Author {
    type Dependent = Book;
    const REFERENCE_FIELD: &'static str = "author";
}

impl Guarded for Genre {
    type Dependent = Book;
    const REFERENCE_FIELD: &'static str = "genre";
}

impl Guarded for Book {
    type Dependent = BookInstance;
    const REFERENCE_FIELD: &'static str = "book";
}

pub enum DeleteCheck<P: Guarded> {
    /// Nothing to delete
    Absent,
    Clear(P),
    Blocked { parent: P, dependents: Vec<P::Dependent> },
}

pub enum DeleteOutcome<P: Guarded> {
    /// Removed, or already gone
    Deleted,
    Blocked { parent: P, dependents: Vec<P::Dependent> },
}

/// Require the id echoed by a delete form to match the addressed entity
pub fn ensure_same_id(path_id: Uuid, body_id: Option<&str>) -> AppResult<()> {
    match body_id.map(str::trim) {
        Some(raw) if Uuid::parse_str(raw).map_or(false, |id| id == path_id) => Ok(()),
        Some(raw) => Err(AppError::Precondition(format!(
            "delete form id {:?} does not match {}",
            raw, path_id
        ))),
        None => Err(AppError::Precondition(format!(
            "delete form carries no id for {}",
            path_id
        ))),
    }
}

#[derive(Clone)]
pub struct IntegrityGuard {
    repository: Repository,
}

impl IntegrityGuard {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Load the parent and everything still referencing it
    pub async fn can_delete<P: Guarded>(&self, id: Uuid) -> AppResult<DeleteCheck<P>> {
        let dependents = FindQuery::filtered(Filter::all().eq(P::REFERENCE_FIELD, id));
        let data = Aggregation::new()
            .query("parent", self.repository.find_by_id::<P>(id))
            .query("dependents", self.repository.find::<P::Dependent>(dependents))
            .run()
            .await
            .into_result()?;

        let Some(parent) = data.get_as::<Option<P>>("parent")? else {
            return Ok(DeleteCheck::Absent);
        };
        let dependents: Vec<P::Dependent> = data.get_as("dependents")?;
        if dependents.is_empty() {
            Ok(DeleteCheck::Clear(parent))
        } else {
            Ok(DeleteCheck::Blocked { parent, dependents })
        }
    }

    /// Delete `path_id` unless something references it.
    ///
    /// `body_id` is the id the confirmation form carried; a mismatch is a
    /// precondition failure, checked before any lookup.
    pub async fn delete<P: Guarded>(&self, path_id: Uuid, body_id: Option<&str>) -> AppResult<DeleteOutcome<P>> {
        ensure_same_id(path_id, body_id)?;

        match self.can_delete::<P>(path_id).await? {
            DeleteCheck::Absent => {
                tracing::debug!(collection = P::COLLECTION.as_str(), id = %path_id, "Delete of absent entity");
                Ok(DeleteOutcome::Deleted)
            }
            DeleteCheck::Clear(parent) => {
                self.repository.delete::<P>(parent.id()).await?;
                tracing::info!(collection = P::COLLECTION.as_str(), id = %path_id, "Deleted");
                Ok(DeleteOutcome::Deleted)
            }
            DeleteCheck::Blocked { parent, dependents } => {
                tracing::warn!(
                    collection = P::COLLECTION.as_str(),
                    id = %path_id,
                    dependents = dependents.len(),
                    "Delete blocked by dependents"
                );
                Ok(DeleteOutcome::Blocked { parent, dependents })
            }
        }
    }
}
