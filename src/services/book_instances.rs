//! Book instance (copy) pages

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    aggregate::{Aggregation, Gathered, ViewData},
    integrity::ensure_same_id,
    Removal, Submitted,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::BOOK_INSTANCES_URL, Book, BookInstance, BookInstanceDraft, BookStatus, BookTitle,
    },
    repository::{FindQuery, Repository},
    validation::{check, Checked, FieldError, Submission, ValidationContext},
};

/// A copy as displayed, with its book's title populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRow {
    pub id: Uuid,
    pub url: String,
    pub imprint: String,
    pub status: BookStatus,
    pub due_back: DateTime<Utc>,
    pub due_back_formatted: String,
    pub due_back_iso8601: String,
    pub book: Option<BookTitle>,
}

impl CopyRow {
    fn new(instance: BookInstance, book: Option<BookTitle>) -> Self {
        Self {
            url: instance.url(),
            due_back_formatted: instance.due_back_formatted(),
            due_back_iso8601: instance.due_back_iso8601(),
            id: instance.id,
            imprint: instance.imprint,
            status: instance.status,
            due_back: instance.due_back,
            book,
        }
    }
}

#[derive(Clone)]
pub struct BookInstancesService {
    repository: Repository,
}

impl BookInstancesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<ViewData> {
        let data = Aggregation::new()
            .query("bookinstances", self.repository.find::<BookInstance>(FindQuery::all()))
            .query("books", self.repository.select::<BookTitle>(FindQuery::all()))
            .run()
            .await
            .into_result()?;

        let titles: HashMap<Uuid, BookTitle> = data
            .get_as::<Vec<BookTitle>>("books")?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        let rows: Vec<CopyRow> = data
            .get_as::<Vec<BookInstance>>("bookinstances")?
            .into_iter()
            .map(|copy| {
                let book = titles.get(&copy.book).cloned();
                CopyRow::new(copy, book)
            })
            .collect();

        ViewData::new().with("bookinstance_list", rows)
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<ViewData> {
        let copy = self
            .repository
            .find_by_id::<BookInstance>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))?;
        let book = self.book_title(copy.book).await?;
        ViewData::new().with("bookinstance", CopyRow::new(copy, book))
    }

    pub async fn create_form(&self) -> AppResult<ViewData> {
        self.form(&BookInstanceDraft::default(), &[]).await
    }

    pub async fn create(&self, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        match check::<BookInstanceDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let copy = draft.into_book_instance(Uuid::new_v4(), ctx.now)?;
                self.repository.save(&copy).await?;
                tracing::info!(id = %copy.id, book = %copy.book, status = %copy.status, "Book copy created");
                Ok(Submitted::Saved { url: copy.url() })
            }
            Checked::Invalid { draft, errors } => Ok(Submitted::Rejected(self.form(&draft, &errors).await?)),
        }
    }

    pub async fn update_form(&self, id: Uuid) -> AppResult<ViewData> {
        let data = Aggregation::new()
            .require("bookinstance", self.repository.find_by_id::<BookInstance>(id))
            .query("book_list", self.repository.select::<BookTitle>(FindQuery::all().sort_by("title")))
            .run()
            .await
            .into_result()?;

        let draft = BookInstanceDraft::from(&data.get_as::<BookInstance>("bookinstance")?);
        data.with("bookinstance", draft)?.with("statuses", BookStatus::NAMES)
    }

    pub async fn update(&self, id: Uuid, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        if self.repository.find_by_id::<BookInstance>(id).await?.is_none() {
            return Err(AppError::NotFound("Book copy not found".to_string()));
        }

        match check::<BookInstanceDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let copy = draft.into_book_instance(id, ctx.now)?;
                self.repository.save(&copy).await?;
                tracing::info!(id = %copy.id, status = %copy.status, "Book copy updated");
                Ok(Submitted::Saved { url: copy.url() })
            }
            Checked::Invalid { draft, errors } => Ok(Submitted::Rejected(self.form(&draft, &errors).await?)),
        }
    }

    /// Confirmation page; `None` when the copy is already gone
    pub async fn delete_form(&self, id: Uuid) -> AppResult<Option<ViewData>> {
        let gathered = Aggregation::new()
            .require("bookinstance", self.repository.find_by_id::<BookInstance>(id))
            .run()
            .await;

        let data = match gathered {
            Gathered::Ready(data) => data,
            Gathered::NotFound(_) => return Ok(None),
            Gathered::Failed(err) => return Err(err),
        };
        let copy: BookInstance = data.get_as("bookinstance")?;
        let book = self.book_title(copy.book).await?;
        Ok(Some(ViewData::new().with("bookinstance", CopyRow::new(copy, book))?))
    }

    /// Copies have no dependents; deleting an absent copy succeeds
    pub async fn delete(&self, id: Uuid, submission: &Submission) -> AppResult<Removal> {
        ensure_same_id(id, submission.single("bookinstanceId"))?;
        self.repository.delete::<BookInstance>(id).await?;
        tracing::info!(%id, "Book copy deleted");
        Ok(Removal::Removed { url: BOOK_INSTANCES_URL })
    }

    async fn book_title(&self, id: Uuid) -> AppResult<Option<BookTitle>> {
        let book = self.repository.find_by_id::<Book>(id).await?;
        Ok(book.map(|b| BookTitle { id: b.id, title: b.title }))
    }

    /// Copy form with the book choices
    async fn form(&self, draft: &BookInstanceDraft, errors: &[FieldError]) -> AppResult<ViewData> {
        let books = self
            .repository
            .select::<BookTitle>(FindQuery::all().sort_by("title"))
            .await?;
        let mut data = ViewData::new()
            .with("book_list", books)?
            .with("bookinstance", draft)?
            .with("statuses", BookStatus::NAMES)?;
        if !errors.is_empty() {
            data.insert("errors", errors)?;
        }
        Ok(data)
    }
}
