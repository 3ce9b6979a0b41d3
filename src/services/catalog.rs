//! Catalog home page: collection counts

use super::aggregate::{Aggregation, ViewData};
use crate::{
    error::AppResult,
    models::{Author, Book, BookInstance, BookStatus, Genre},
    repository::{Filter, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Counts for the index page, gathered concurrently
    pub async fn index(&self) -> AppResult<ViewData> {
        Aggregation::new()
            .query("book_count", self.repository.count::<Book>(Filter::all()))
            .query("book_instance_count", self.repository.count::<BookInstance>(Filter::all()))
            .query(
                "book_instance_available_count",
                self.repository
                    .count::<BookInstance>(Filter::all().eq("status", BookStatus::Available)),
            )
            .query("author_count", self.repository.count::<Author>(Filter::all()))
            .query("genre_count", self.repository.count::<Genre>(Filter::all()))
            .run()
            .await
            .into_result()
    }
}
