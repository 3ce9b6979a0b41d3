//! Author pages

use uuid::Uuid;

use super::{
    aggregate::{Aggregation, Gathered, ViewData},
    integrity::{DeleteOutcome, IntegrityGuard},
    natural_key::NaturalKeyResolver,
    Removal, Submitted,
};
use crate::{
    error::{AppError, AppResult},
    models::{author::AUTHORS_URL, Author, AuthorDraft, Book},
    repository::{Filter, FindQuery, Repository},
    validation::{check, Checked, FieldError, Submission, ValidationContext},
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
    guard: IntegrityGuard,
    resolver: NaturalKeyResolver,
    /// Reuse an existing author with the same first and family name on create
    dedupe: bool,
}

impl AuthorsService {
    pub fn new(repository: Repository, dedupe: bool) -> Self {
        Self {
            guard: IntegrityGuard::new(repository.clone()),
            resolver: NaturalKeyResolver::new(repository.clone()),
            repository,
            dedupe,
        }
    }

    pub async fn list(&self) -> AppResult<ViewData> {
        let authors = self
            .repository
            .find::<Author>(FindQuery::all().sort_by("family_name"))
            .await?;
        ViewData::new().with("author_list", authors)
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<ViewData> {
        Aggregation::new()
            .require("author", self.repository.find_by_id::<Author>(id))
            .query("author_books", self.books_by(id))
            .run()
            .await
            .into_result()
    }

    pub fn create_form(&self) -> AppResult<ViewData> {
        ViewData::new().with("author", AuthorDraft::default())
    }

    pub async fn create(&self, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        let draft = match check::<AuthorDraft>(submission, ctx)? {
            Checked::Valid(draft) => draft,
            Checked::Invalid { draft, errors } => return rejected(&draft, &errors),
        };

        let candidate = draft.into_author(Uuid::new_v4());
        let author = if self.dedupe {
            self.resolver.find_or_create(candidate).await?.into_entity()
        } else {
            self.repository.save(&candidate).await?;
            tracing::info!(id = %candidate.id, "Author created");
            candidate
        };
        Ok(Submitted::Saved { url: author.url() })
    }

    pub async fn update_form(&self, id: Uuid) -> AppResult<ViewData> {
        let author = self
            .repository
            .find_by_id::<Author>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))?;
        ViewData::new().with("author", AuthorDraft::from(&author))
    }

    pub async fn update(&self, id: Uuid, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        if self.repository.find_by_id::<Author>(id).await?.is_none() {
            return Err(AppError::NotFound("Author not found".to_string()));
        }

        match check::<AuthorDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let author = draft.into_author(id);
                self.repository.save(&author).await?;
                tracing::info!(id = %author.id, "Author updated");
                Ok(Submitted::Saved { url: author.url() })
            }
            Checked::Invalid { draft, errors } => rejected(&draft, &errors),
        }
    }

    /// Confirmation page; `None` when the author is already gone
    pub async fn delete_form(&self, id: Uuid) -> AppResult<Option<ViewData>> {
        let gathered = Aggregation::new()
            .require("author", self.repository.find_by_id::<Author>(id))
            .query("author_books", self.books_by(id))
            .run()
            .await;

        match gathered {
            Gathered::Ready(data) => Ok(Some(data)),
            Gathered::NotFound(_) => Ok(None),
            Gathered::Failed(err) => Err(err),
        }
    }

    pub async fn delete(&self, id: Uuid, submission: &Submission) -> AppResult<Removal> {
        match self.guard.delete::<Author>(id, submission.single("authorid")).await? {
            DeleteOutcome::Deleted => Ok(Removal::Removed { url: AUTHORS_URL }),
            DeleteOutcome::Blocked { parent, dependents } => Ok(Removal::Blocked(
                ViewData::new()
                    .with("author", parent)?
                    .with("author_books", dependents)?,
            )),
        }
    }

    async fn books_by(&self, id: Uuid) -> AppResult<Vec<Book>> {
        self.repository
            .find::<Book>(FindQuery::filtered(Filter::all().eq("author", id)).sort_by("title"))
            .await
    }
}

fn rejected(draft: &AuthorDraft, errors: &[FieldError]) -> AppResult<Submitted> {
    let data = ViewData::new().with("author", draft)?.with("errors", errors)?;
    Ok(Submitted::Rejected(data))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::repository::MemoryStore;

    fn setup(dedupe: bool) -> (Repository, AuthorsService) {
        let repository = Repository::new(Arc::new(MemoryStore::new()));
        (repository.clone(), AuthorsService::new(repository, dedupe))
    }

    fn ctx() -> ValidationContext {
        ValidationContext {
            now: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            tz_offset: Some(-60),
        }
    }

    fn ursula() -> Submission {
        Submission::from_pairs([
            ("first_name", "Ursula"),
            ("family_name", "LeGuin"),
            ("date_of_birth", "1929-10-21"),
            ("date_of_death", "2018-01-22"),
            ("tzoffset", "-60"),
        ])
    }

    #[tokio::test]
    async fn test_create_stores_localized_dates() {
        let (repository, service) = setup(false);
        service.create(&ursula(), &ctx()).await.unwrap();

        let authors = repository.find::<Author>(FindQuery::all()).await.unwrap();
        assert_eq!(authors.len(), 1);
        // UTC+1 midnight is 23:00 UTC the day before
        assert_eq!(
            authors[0].date_of_birth,
            Some(Utc.with_ymd_and_hms(1929, 10, 20, 23, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_dedupe_follows_configuration() {
        let (repository, service) = setup(false);
        service.create(&ursula(), &ctx()).await.unwrap();
        service.create(&ursula(), &ctx()).await.unwrap();
        assert_eq!(repository.find::<Author>(FindQuery::all()).await.unwrap().len(), 2);

        let (repository, service) = setup(true);
        let Submitted::Saved { url: first } = service.create(&ursula(), &ctx()).await.unwrap() else {
            panic!("expected save");
        };
        let Submitted::Saved { url: second } = service.create(&ursula(), &ctx()).await.unwrap() else {
            panic!("expected save");
        };
        assert_eq!(first, second);
        assert_eq!(repository.find::<Author>(FindQuery::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_create_echoes_draft() {
        let (repository, service) = setup(true);
        let submission = Submission::from_pairs([
            ("first_name", "Ursula"),
            ("family_name", "Le Guin"),
            ("tzoffset", "0"),
        ]);
        let Submitted::Rejected(data) = service.create(&submission, &ctx()).await.unwrap() else {
            panic!("expected validation errors");
        };

        assert_eq!(data.get("author").unwrap()["first_name"], "Ursula");
        assert_eq!(
            data.get_as::<Vec<serde_json::Value>>("errors").unwrap()[0]["field"],
            "family_name"
        );
        assert!(repository.find::<Author>(FindQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_lists_books() {
        let (repository, service) = setup(false);
        let author = Author {
            id: Uuid::new_v4(),
            first_name: "Ursula".into(),
            family_name: "LeGuin".into(),
            date_of_birth: None,
            date_of_death: None,
        };
        repository.save(&author).await.unwrap();
        let book = Book {
            id: Uuid::new_v4(),
            title: "The Lathe of Heaven".into(),
            author: author.id,
            summary: "s".into(),
            isbn: "i".into(),
            genre: Vec::new(),
        };
        repository.save(&book).await.unwrap();

        let data = service.detail(author.id).await.unwrap();
        assert_eq!(data.get_as::<Author>("author").unwrap(), author);
        assert_eq!(data.get_as::<Vec<Book>>("author_books").unwrap(), vec![book]);

        let body = Submission::from_pairs([("authorid", author.id.to_string())]);
        assert!(matches!(service.delete(author.id, &body).await.unwrap(), Removal::Blocked(_)));
    }

    #[tokio::test]
    async fn test_missing_author() {
        let (_, service) = setup(false);
        let id = Uuid::new_v4();
        assert!(matches!(service.detail(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.update_form(id).await, Err(AppError::NotFound(_))));
        assert!(service.delete_form(id).await.unwrap().is_none());

        let body = Submission::from_pairs([("authorid", id.to_string())]);
        assert!(matches!(
            service.delete(id, &body).await.unwrap(),
            Removal::Removed { url: AUTHORS_URL }
        ));
    }
}
