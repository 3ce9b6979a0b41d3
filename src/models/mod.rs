//! Catalog entities, their form drafts and validation tables

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use author::{Author, AuthorDraft, AuthorName};
pub use book::{Book, BookDraft, BookListing, BookTitle};
pub use book_instance::{BookInstance, BookInstanceDraft, BookStatus};
pub use genre::{Genre, GenreDraft};

/// Parse a reference field of a validated draft
fn parse_reference(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::BadRequest(format!("{} is not a valid reference: {:?}", field, value)))
}
