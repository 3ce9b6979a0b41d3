//! Book pages: list, detail, forms and deletion

use std::collections::HashMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    aggregate::{Aggregation, Gathered, ViewData},
    integrity::{DeleteOutcome, IntegrityGuard},
    Removal, Submitted,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::BOOKS_URL, Author, AuthorName, Book, BookDraft, BookInstance, BookListing, Genre,
    },
    repository::{Filter, FindQuery, Repository},
    validation::{check, Checked, Submission, ValidationContext},
};

/// One row of the book list, author populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
}

/// A genre checkbox on the book form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreChoice {
    pub id: Uuid,
    pub name: String,
    pub checked: bool,
}

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    guard: IntegrityGuard,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self {
            guard: IntegrityGuard::new(repository.clone()),
            repository,
        }
    }

    /// All books by title, with author names
    pub async fn list(&self) -> AppResult<ViewData> {
        let data = Aggregation::new()
            .query("books", self.repository.select::<BookListing>(FindQuery::all().sort_by("title")))
            .query("authors", self.repository.select::<AuthorName>(FindQuery::all()))
            .run()
            .await
            .into_result()?;

        let authors: HashMap<Uuid, String> = data
            .get_as::<Vec<AuthorName>>("authors")?
            .iter()
            .map(|a| (a.id, a.full_name()))
            .collect();
        let rows: Vec<BookRow> = data
            .get_as::<Vec<BookListing>>("books")?
            .into_iter()
            .map(|b| BookRow {
                url: Book::url_for(b.id),
                author: authors.get(&b.author).cloned(),
                id: b.id,
                title: b.title,
            })
            .collect();

        ViewData::new().with("book_list", rows)
    }

    /// A book with its copies, author and genres
    pub async fn detail(&self, id: Uuid) -> AppResult<ViewData> {
        let mut data = Aggregation::new()
            .require("book", self.repository.find_by_id::<Book>(id))
            .query(
                "book_instances",
                self.repository
                    .find::<BookInstance>(FindQuery::filtered(Filter::all().eq("book", id))),
            )
            .run()
            .await
            .into_result()?;
        let book: Book = data.get_as("book")?;

        let related = Aggregation::new()
            .query("author", self.repository.find_by_id::<Author>(book.author))
            .query("genres", self.genres_of(&book.genre))
            .run()
            .await
            .into_result()?;

        data.insert("author", related.get("author"))?;
        data.insert("genres", related.get("genres"))?;
        Ok(data)
    }

    /// The referenced genres that still exist, by name
    async fn genres_of(&self, ids: &[Uuid]) -> AppResult<Vec<Genre>> {
        let found = try_join_all(ids.iter().map(|&id| self.repository.find_by_id::<Genre>(id))).await?;
        let mut genres: Vec<Genre> = found.into_iter().flatten().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    pub async fn create_form(&self) -> AppResult<ViewData> {
        self.form_choices(&[]).await
    }

    pub async fn create(&self, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        match check::<BookDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let book = draft.into_book(Uuid::new_v4())?;
                self.repository.save(&book).await?;
                tracing::info!(id = %book.id, title = %book.title, "Book created");
                Ok(Submitted::Saved { url: book.url() })
            }
            Checked::Invalid { draft, errors } => {
                let data = self
                    .form_choices(&draft.genre)
                    .await?
                    .with("book", &draft)?
                    .with("errors", &errors)?;
                Ok(Submitted::Rejected(data))
            }
        }
    }

    /// Form prefilled from the stored book
    pub async fn update_form(&self, id: Uuid) -> AppResult<ViewData> {
        let mut data = Aggregation::new()
            .require("book", self.repository.find_by_id::<Book>(id))
            .query("authors", self.repository.select::<AuthorName>(FindQuery::all().sort_by("family_name")))
            .query("genres", self.repository.find::<Genre>(FindQuery::all().sort_by("name")))
            .run()
            .await
            .into_result()?;

        let draft = BookDraft::from(&data.get_as::<Book>("book")?);
        mark_genres(&mut data, &draft.genre)?;
        data.insert("book", &draft)?;
        Ok(data)
    }

    pub async fn update(&self, id: Uuid, submission: &Submission, ctx: &ValidationContext) -> AppResult<Submitted> {
        if self.repository.find_by_id::<Book>(id).await?.is_none() {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        match check::<BookDraft>(submission, ctx)? {
            Checked::Valid(draft) => {
                let book = draft.into_book(id)?;
                self.repository.save(&book).await?;
                tracing::info!(id = %book.id, "Book updated");
                Ok(Submitted::Saved { url: book.url() })
            }
            Checked::Invalid { draft, errors } => {
                let data = self
                    .form_choices(&draft.genre)
                    .await?
                    .with("book", &draft)?
                    .with("errors", &errors)?;
                Ok(Submitted::Rejected(data))
            }
        }
    }

    /// Confirmation page; `None` when the book is already gone
    pub async fn delete_form(&self, id: Uuid) -> AppResult<Option<ViewData>> {
        let gathered = Aggregation::new()
            .require("book", self.repository.find_by_id::<Book>(id))
            .query(
                "book_instances",
                self.repository
                    .find::<BookInstance>(FindQuery::filtered(Filter::all().eq("book", id))),
            )
            .run()
            .await;

        match gathered {
            Gathered::Ready(data) => Ok(Some(data)),
            Gathered::NotFound(_) => Ok(None),
            Gathered::Failed(err) => Err(err),
        }
    }

    pub async fn delete(&self, id: Uuid, submission: &Submission) -> AppResult<Removal> {
        match self.guard.delete::<Book>(id, submission.single("bookid")).await? {
            DeleteOutcome::Deleted => Ok(Removal::Removed { url: BOOKS_URL }),
            DeleteOutcome::Blocked { parent, dependents } => Ok(Removal::Blocked(
                ViewData::new()
                    .with("book", parent)?
                    .with("book_instances", dependents)?,
            )),
        }
    }

    /// Author and genre choices for the book form
    async fn form_choices(&self, selected: &[String]) -> AppResult<ViewData> {
        let mut data = Aggregation::new()
            .query("authors", self.repository.select::<AuthorName>(FindQuery::all().sort_by("family_name")))
            .query("genres", self.repository.find::<Genre>(FindQuery::all().sort_by("name")))
            .run()
            .await
            .into_result()?;
        mark_genres(&mut data, selected)?;
        Ok(data)
    }
}

/// Replace the `genres` entry with checkbox choices
fn mark_genres(data: &mut ViewData, selected: &[String]) -> AppResult<()> {
    let choices: Vec<GenreChoice> = data
        .get_as::<Vec<Genre>>("genres")?
        .into_iter()
        .map(|g| GenreChoice {
            checked: selected.contains(&g.id.to_string()),
            id: g.id,
            name: g.name,
        })
        .collect();
    data.insert("genres", choices)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::repository::{Collection, MemoryStore, MockDocumentStore};

    struct Fixture {
        repository: Repository,
        service: BooksService,
        author: Author,
        genres: Vec<Genre>,
    }

    async fn fixture() -> Fixture {
        let repository = Repository::new(Arc::new(MemoryStore::new()));
        let author = Author {
            id: Uuid::new_v4(),
            first_name: "Isaac".into(),
            family_name: "Asimov".into(),
            date_of_birth: None,
            date_of_death: None,
        };
        repository.save(&author).await.unwrap();
        let mut genres = Vec::new();
        for name in ["SciFi", "Fantasy"] {
            let genre = Genre {
                id: Uuid::new_v4(),
                name: name.into(),
            };
            repository.save(&genre).await.unwrap();
            genres.push(genre);
        }
        Fixture {
            service: BooksService::new(repository.clone()),
            repository,
            author,
            genres,
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext {
            now: Utc::now(),
            tz_offset: None,
        }
    }

    fn submission(author: &Author, title: &str, genres: &[&Genre]) -> Submission {
        let author = author.id.to_string();
        let mut pairs = vec![
            ("title".to_string(), title.to_string()),
            ("author".to_string(), author),
            ("summary".to_string(), "Psychohistory".to_string()),
            ("isbn".to_string(), "9780553293357".to_string()),
        ];
        pairs.extend(genres.iter().map(|g| ("genre".to_string(), g.id.to_string())));
        Submission::from_pairs(pairs)
    }

    #[tokio::test]
    async fn test_create_and_detail() {
        let f = fixture().await;
        let Submitted::Saved { url } = f
            .service
            .create(&submission(&f.author, "Foundation", &[&f.genres[0]]), &ctx())
            .await
            .unwrap()
        else {
            panic!("expected the book to be saved");
        };

        let id: Uuid = url.rsplit('/').next().unwrap().parse().unwrap();
        let data = f.service.detail(id).await.unwrap();
        assert_eq!(data.get_as::<Book>("book").unwrap().title, "Foundation");
        assert_eq!(data.get_as::<Author>("author").unwrap(), f.author);
        assert_eq!(data.get_as::<Vec<Genre>>("genres").unwrap(), vec![f.genres[0].clone()]);
        assert!(data.get_as::<Vec<BookInstance>>("book_instances").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_fetches_only_referenced_genres() {
        let author = Author {
            id: Uuid::new_v4(),
            first_name: "Isaac".into(),
            family_name: "Asimov".into(),
            date_of_birth: None,
            date_of_death: None,
        };
        let scifi = Genre {
            id: Uuid::new_v4(),
            name: "SciFi".into(),
        };
        let book = Book {
            id: Uuid::new_v4(),
            title: "Foundation".into(),
            author: author.id,
            summary: "x".into(),
            isbn: "y".into(),
            genre: vec![Uuid::new_v4(), scifi.id],
        };

        let mut store = MockDocumentStore::new();
        // Only the copies are listed; genres are loaded one by one
        store.expect_find().times(1).returning(|_, _| Ok(Vec::new()));
        let (book_doc, author_doc, genre_doc) = (
            serde_json::to_value(&book).unwrap(),
            serde_json::to_value(&author).unwrap(),
            serde_json::to_value(&scifi).unwrap(),
        );
        let (book_id, scifi_id) = (book.id, scifi.id);
        store.expect_find_by_id().returning(move |collection, id| {
            Ok(match collection {
                Collection::Books if id == book_id => Some(book_doc.clone()),
                Collection::Authors => Some(author_doc.clone()),
                Collection::Genres if id == scifi_id => Some(genre_doc.clone()),
                _ => None,
            })
        });
        let service = BooksService::new(Repository::new(Arc::new(store)));

        let data = service.detail(book.id).await.unwrap();
        assert_eq!(data.get_as::<Vec<Genre>>("genres").unwrap(), vec![scifi]);
        assert_eq!(data.get_as::<Author>("author").unwrap(), author);
    }

    #[tokio::test]
    async fn test_detail_of_unknown_book_is_not_found() {
        let f = fixture().await;
        assert!(matches!(f.service.detail(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejected_create_keeps_genre_selection() {
        let f = fixture().await;
        let outcome = f
            .service
            .create(&submission(&f.author, "   ", &[&f.genres[1]]), &ctx())
            .await
            .unwrap();
        let Submitted::Rejected(data) = outcome else {
            panic!("expected validation errors");
        };

        let choices: Vec<GenreChoice> = data.get_as("genres").unwrap();
        let checked: Vec<_> = choices.iter().filter(|c| c.checked).map(|c| c.id).collect();
        assert_eq!(checked, vec![f.genres[1].id]);
        assert_eq!(data.get_as::<Vec<AuthorName>>("authors").unwrap().len(), 1);
        assert!(f.repository.find::<Book>(FindQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_replaces_fields() {
        let f = fixture().await;
        let original = Book {
            id: Uuid::new_v4(),
            title: "Foundation".into(),
            author: f.author.id,
            summary: "x".into(),
            isbn: "y".into(),
            genre: vec![f.genres[0].id],
        };
        f.repository.save(&original).await.unwrap();

        let form = f.service.update_form(original.id).await.unwrap();
        assert_eq!(form.get("book").unwrap()["title"], "Foundation");
        let choices: Vec<GenreChoice> = form.get_as("genres").unwrap();
        assert!(choices.iter().any(|c| c.id == f.genres[0].id && c.checked));

        f.service
            .update(original.id, &submission(&f.author, "Foundation and Empire", &[]), &ctx())
            .await
            .unwrap();
        let stored = f.repository.find_by_id::<Book>(original.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Foundation and Empire");
        assert!(stored.genre.is_empty());
    }

    #[tokio::test]
    async fn test_update_of_missing_book_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .update(Uuid::new_v4(), &submission(&f.author, "Nope", &[]), &ctx())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(matches!(f.service.update_form(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_populates_author_names() {
        let f = fixture().await;
        for title in ["I, Robot", "Foundation"] {
            f.service
                .create(&submission(&f.author, title, &[]), &ctx())
                .await
                .unwrap();
        }

        let rows: Vec<BookRow> = f.service.list().await.unwrap().get_as("book_list").unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Foundation", "I, Robot"]);
        assert!(rows.iter().all(|r| r.author.as_deref() == Some("Asimov, Isaac")));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_copies() {
        let f = fixture().await;
        let book = Book {
            id: Uuid::new_v4(),
            title: "Foundation".into(),
            author: f.author.id,
            summary: "x".into(),
            isbn: "y".into(),
            genre: Vec::new(),
        };
        f.repository.save(&book).await.unwrap();
        f.repository
            .save(&BookInstance {
                id: Uuid::new_v4(),
                book: book.id,
                imprint: "Gnome Press".into(),
                status: Default::default(),
                due_back: Utc::now(),
            })
            .await
            .unwrap();

        let body = Submission::from_pairs([("bookid", book.id.to_string())]);
        let Removal::Blocked(data) = f.service.delete(book.id, &body).await.unwrap() else {
            panic!("book with copies must not be deleted");
        };
        assert_eq!(data.get_as::<Vec<BookInstance>>("book_instances").unwrap().len(), 1);

        assert!(f.service.delete_form(Uuid::new_v4()).await.unwrap().is_none());
    }
}
