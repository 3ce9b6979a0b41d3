//! Genre pages

use uuid::Uuid;

use super::{
    aggregate::{Aggregation, Gathered, ViewData},
    integrity::{DeleteOutcome, IntegrityGuard},
    natural_key::NaturalKeyResolver,
    Removal, Submitted,
};
use crate::{
    error::{AppError, AppResult},
    models::{genre::GENRES_URL, Book, Genre, GenreDraft},
    repository::{Filter, FindQuery, Repository},
    validation::{check, Checked, Submission, ValidationContext},
};

#[derive(Clone)]
pub struct GenresService {
    repository: Repository,
    guard: IntegrityGuard,
    resolver: NaturalKeyResolver,
}

impl GenresService {
    pub fn new(repository: Repository) -> Self {
        Self {
            guard: IntegrityGuard::new(repository.clone()),
            resolver: NaturalKeyResolver::new(repository.clone()),
            repository,
        }
    }

    pub async fn list(&self) -> AppResult<ViewData> {
        let genres = self.repository.find::<Genre>(FindQuery::all().sort_by("name")).await?;
        ViewData::new().with("genre_list", genres)
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<ViewData> {
        Aggregation::new()
            .require("genre", self.repository.find_by_id::<Genre>(id))
            .query("genre_books", self.books_in(id))
            .run()
            .await
            .into_result()
    }

    pub fn create_form(&self) -> AppResult<ViewData> {
        ViewData::new().with("genre", GenreDraft::default())
    }

    /// Create, or reuse the genre already carrying this exact name
    pub async fn create(&self, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        match check::<GenreDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let genre = self
                    .resolver
                    .find_or_create(draft.into_genre(Uuid::new_v4()))
                    .await?
                    .into_entity();
                Ok(Submitted::Saved { url: genre.url() })
            }
            Checked::Invalid { draft, errors } => Ok(Submitted::Rejected(
                ViewData::new().with("genre", draft)?.with("errors", errors)?,
            )),
        }
    }

    pub async fn update_form(&self, id: Uuid) -> AppResult<ViewData> {
        let genre = self
            .repository
            .find_by_id::<Genre>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Genre not found".to_string()))?;
        ViewData::new().with("genre", GenreDraft::from(&genre))
    }

    pub async fn update(&self, id: Uuid, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        if self.repository.find_by_id::<Genre>(id).await?.is_none() {
            return Err(AppError::NotFound("Genre not found".to_string()));
        }

        match check::<GenreDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let genre = draft.into_genre(id);
                self.repository.save(&genre).await?;
                tracing::info!(id = %genre.id, name = %genre.name, "Genre updated");
                Ok(Submitted::Saved { url: genre.url() })
            }
            Checked::Invalid { draft, errors } => Ok(Submitted::Rejected(
                ViewData::new().with("genre", draft)?.with("errors", errors)?,
            )),
        }
    }

    pub async fn delete_form(&self, id: Uuid) -> AppResult<Option<ViewData>> {
        let gathered = Aggregation::new()
            .require("genre", self.repository.find_by_id::<Genre>(id))
            .query("genre_books", self.books_in(id))
            .run()
            .await;

        match gathered {
            Gathered::Ready(data) => Ok(Some(data)),
            Gathered::NotFound(_) => Ok(None),
            Gathered::Failed(err) => Err(err),
        }
    }

    pub async fn delete(&self, id: Uuid, submission: &Submission) -> AppResult<Removal> {
        match self.guard.delete::<Genre>(id, submission.single("genreid")).await? {
            DeleteOutcome::Deleted => Ok(Removal::Removed { url: GENRES_URL }),
            DeleteOutcome::Blocked { parent, dependents } => Ok(Removal::Blocked(
                ViewData::new()
                    .with("genre", parent)?
                    .with("genre_books", dependents)?,
            )),
        }
    }

    async fn books_in(&self, id: Uuid) -> AppResult<Vec<Book>> {
        self.repository
            .find::<Book>(FindQuery::filtered(Filter::all().eq("genre", id)).sort_by("title"))
            .await
    }
}
