//! HTTP handlers for the catalog pages

pub mod authors;
pub mod body_log;
pub mod book_instances;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod health;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, HeaderValue},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Utc;
use serde_json::{Map, Value};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::{Removal, Submitted, ViewData},
    validation::{Submission, ValidationContext},
    AppState,
};

/// A rendered page: the template to use and its context.
///
/// Serialized as one JSON object, `{"template": ..., "title": ..., ...context}`.
#[derive(Debug)]
pub struct View {
    template: &'static str,
    title: String,
    data: ViewData,
}

impl View {
    pub fn new(template: &'static str, title: impl Into<String>, data: ViewData) -> Self {
        Self {
            template,
            title: title.into(),
            data,
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("template".to_string(), Value::String(self.template.to_string()));
        body.insert("title".to_string(), Value::String(self.title));
        body.extend(self.data.into_inner());
        Json(Value::Object(body)).into_response()
    }
}

/// Entity id taken from the `:id` path segment
pub struct EntityId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(id))
    }
}

/// An urlencoded form body; repeated keys are kept in order
pub struct FormSubmission(pub Submission);

#[async_trait]
impl<S> FromRequest<S> for FormSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(Submission::from_pairs(pairs)))
    }
}

impl FormSubmission {
    /// The submission and its validation context, clocked now
    pub fn with_context(self) -> AppResult<(Submission, ValidationContext)> {
        let ctx = ValidationContext::for_submission(&self.0, Utc::now())?;
        Ok((self.0, ctx))
    }
}

/// Redirect to the saved entity, or redisplay the form with its errors
pub fn submitted(outcome: Submitted, template: &'static str, title: &str) -> Response {
    match outcome {
        Submitted::Saved { url } => Redirect::to(&url).into_response(),
        Submitted::Rejected(data) => View::new(template, title, data).into_response(),
    }
}

/// Redirect to the collection, or redisplay the confirmation with what blocks it
pub fn removed(outcome: Removal, template: &'static str, title: &str) -> Response {
    match outcome {
        Removal::Removed { url } => Redirect::to(url).into_response(),
        Removal::Blocked(data) => View::new(template, title, data).into_response(),
    }
}

/// Confirmation page, or back to the collection when there is nothing to delete
pub fn confirmation(data: Option<ViewData>, template: &'static str, title: &str, collection_url: &str) -> Response {
    match data {
        Some(data) => View::new(template, title, data).into_response(),
        None => Redirect::to(collection_url).into_response(),
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let catalog = Router::new()
        .route("/", get(catalog::index))
        // Books
        .route("/book/create", get(books::create_form).post(books::create))
        .route("/book/:id/delete", get(books::delete_form).post(books::delete))
        .route("/book/:id/update", get(books::update_form).post(books::update))
        .route("/book/:id", get(books::detail))
        .route("/books", get(books::list))
        // Authors
        .route("/author/create", get(authors::create_form).post(authors::create))
        .route("/author/:id/delete", get(authors::delete_form).post(authors::delete))
        .route("/author/:id/update", get(authors::update_form).post(authors::update))
        .route("/author/:id", get(authors::detail))
        .route("/authors", get(authors::list))
        // Genres
        .route("/genre/create", get(genres::create_form).post(genres::create))
        .route("/genre/:id/delete", get(genres::delete_form).post(genres::delete))
        .route("/genre/:id/update", get(genres::update_form).post(genres::update))
        .route("/genre/:id", get(genres::detail))
        .route("/genres", get(genres::list))
        // Book instances
        .route(
            "/bookinstance/create",
            get(book_instances::create_form).post(book_instances::create),
        )
        .route(
            "/bookinstance/:id/delete",
            get(book_instances::delete_form).post(book_instances::delete),
        )
        .route(
            "/bookinstance/:id/update",
            get(book_instances::update_form).post(book_instances::update),
        )
        .route("/bookinstance/:id", get(book_instances::detail))
        .route("/bookinstances", get(book_instances::list));

    Router::new()
        .route("/", get(|| async { Redirect::to("/catalog") }))
        .route("/health", get(health::health_check))
        .nest("/catalog", catalog)
        .fallback(|| async { AppError::NotFound("Page not found".to_string()) })
        .layer(middleware::from_fn(body_log::log_form_bodies))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors)
        .with_state(state)
}
