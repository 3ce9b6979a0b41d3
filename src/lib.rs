//! Local Library catalog server
//!
//! Books, authors, genres and physical copies, with form validation that
//! pins client-local dates to absolute instants, delete guards for
//! referenced entities, and concurrently gathered page data.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the services over a document store
    pub fn new(config: AppConfig, store: Arc<dyn repository::DocumentStore>) -> Self {
        let repository = repository::Repository::new(store);
        let services = services::Services::new(repository, &config.catalog);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
