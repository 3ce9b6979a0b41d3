//! Book model and related types

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_reference;
use crate::{
    error::AppResult,
    repository::{Collection, Entity, Projection},
    validation::{Draft, FormRules, Rule, Validated},
};

pub const BOOKS_URL: &str = "/catalog/books";

/// A catalogued title. Copies on the shelf are [`super::BookInstance`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: Uuid,
    pub summary: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<Uuid>,
}

impl Book {
    pub fn url(&self) -> String {
        Self::url_for(self.id)
    }

    pub fn url_for(id: Uuid) -> String {
        format!("/catalog/book/{}", id)
    }
}

impl Entity for Book {
    const COLLECTION: Collection = Collection::Books;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Title only, for choice lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTitle {
    pub id: Uuid,
    pub title: String,
}

impl Projection for BookTitle {
    const COLLECTION: Collection = Collection::Books;
    const FIELDS: &'static [&'static str] = &["title"];
}

/// Title and author reference, for the book list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookListing {
    pub id: Uuid,
    pub title: String,
    pub author: Uuid,
}

impl Projection for BookListing {
    const COLLECTION: Collection = Collection::Books;
    const FIELDS: &'static [&'static str] = &["title", "author"];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub summary: String,
    pub isbn: String,
    pub genre: Vec<String>,
}

static BOOK_RULES: Lazy<FormRules> = Lazy::new(|| {
    FormRules::new()
        .field(
            "title",
            vec![Rule::Trim, Rule::Required("Title must not be empty."), Rule::Escape],
        )
        .field(
            "author",
            vec![
                Rule::Trim,
                Rule::Required("Author must not be empty."),
                Rule::Reference("Author must be chosen from the list."),
            ],
        )
        .field(
            "summary",
            vec![Rule::Trim, Rule::Required("Summary must not be empty."), Rule::Escape],
        )
        .field(
            "isbn",
            vec![Rule::Trim, Rule::Required("ISBN must not be empty."), Rule::Escape],
        )
        .field(
            "genre",
            vec![
                Rule::List,
                Rule::Trim,
                Rule::Reference("Genre must be chosen from the list."),
            ],
        )
});

impl Draft for BookDraft {
    fn rules() -> &'static FormRules {
        &BOOK_RULES
    }

    fn from_validated(values: &Validated) -> Self {
        Self {
            title: values.text("title"),
            author: values.text("author"),
            summary: values.text("summary"),
            isbn: values.text("isbn"),
            genre: values.list("genre"),
        }
    }
}

impl BookDraft {
    pub fn into_book(self, id: Uuid) -> AppResult<Book> {
        let author = parse_reference("author", &self.author)?;
        let genre = self
            .genre
            .iter()
            .map(|g| parse_reference("genre", g))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Book {
            id,
            title: self.title,
            author,
            summary: self.summary,
            isbn: self.isbn,
            genre,
        })
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.to_string(),
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre: book.genre.iter().map(Uuid::to_string).collect(),
        }
    }
}
