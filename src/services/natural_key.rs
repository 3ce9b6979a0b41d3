//! Find-or-create by natural key.
//!
//! Lookup and insert are two round trips with no uniqueness constraint in
//! between, so two concurrent creates of the same key can both insert.

use crate::{
    error::AppResult,
    models::{Author, Genre},
    repository::{Entity, Filter, Repository},
};

/// Identity of an entity as users see it
pub trait NaturalKey: Entity {
    fn natural_key(&self) -> Filter;
}

impl NaturalKey for Genre {
    /// Exact, case-sensitive name
    fn natural_key(&self) -> Filter {
        Filter::all().eq("name", &self.name)
    }
}

impl NaturalKey for Author {
    fn natural_key(&self) -> Filter {
        Filter::all()
            .eq("first_name", &self.first_name)
            .eq("family_name", &self.family_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<E> {
    Existing(E),
    Created(E),
}

impl<E: Entity> Resolved<E> {
    pub fn entity(&self) -> &E {
        match self {
            Resolved::Existing(entity) | Resolved::Created(entity) => entity,
        }
    }

    pub fn into_entity(self) -> E {
        match self {
            Resolved::Existing(entity) | Resolved::Created(entity) => entity,
        }
    }
}

#[derive(Clone)]
pub struct NaturalKeyResolver {
    repository: Repository,
}

impl NaturalKeyResolver {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Return the stored entity sharing `candidate`'s natural key, or save
    /// `candidate` if there is none
    pub async fn find_or_create<E: NaturalKey>(&self, candidate: E) -> AppResult<Resolved<E>> {
        if let Some(existing) = self.repository.find_one::<E>(candidate.natural_key()).await? {
            tracing::debug!(
                collection = E::COLLECTION.as_str(),
                id = %existing.id(),
                "Natural key already present"
            );
            return Ok(Resolved::Existing(existing));
        }

        self.repository.save(&candidate).await?;
        tracing::info!(collection = E::COLLECTION.as_str(), id = %candidate.id(), "Created");
        Ok(Resolved::Created(candidate))
    }
}
