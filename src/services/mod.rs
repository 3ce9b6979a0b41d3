//! Business logic services

pub mod aggregate;
pub mod authors;
pub mod book_instances;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod integrity;
pub mod natural_key;

use crate::{config::CatalogConfig, repository::Repository};

pub use aggregate::{Aggregation, Gathered, ViewData};

/// Outcome of a create or update submission
#[derive(Debug)]
pub enum Submitted {
    /// Persisted; continue at the entity's detail page
    Saved { url: String },
    /// Field errors; redisplay the form with the echoed draft
    Rejected(ViewData),
}

/// Outcome of a delete submission
#[derive(Debug)]
pub enum Removal {
    /// Gone; continue at the collection list
    Removed { url: &'static str },
    /// Still referenced; redisplay the confirmation with the dependents
    Blocked(ViewData),
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub books: books::BooksService,
    pub authors: authors::AuthorsService,
    pub genres: genres::GenresService,
    pub book_instances: book_instances::BookInstancesService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, catalog_config: &CatalogConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            authors: authors::AuthorsService::new(repository.clone(), catalog_config.dedupe_authors),
            genres: genres::GenresService::new(repository.clone()),
            book_instances: book_instances::BookInstancesService::new(repository),
        }
    }
}
