//! Book endpoints

use axum::{extract::State, response::Response};

use super::{confirmation, removed, submitted, EntityId, FormSubmission, View};
use crate::{error::AppResult, models::book::BOOKS_URL, AppState};

pub async fn list(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.books.list().await?;
    Ok(View::new("book_list", "Book List", data))
}

pub async fn detail(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.books.detail(id).await?;
    Ok(View::new("book_detail", "Book Detail", data))
}

pub async fn create_form(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.books.create_form().await?;
    Ok(View::new("book_form", "Create Book", data))
}

pub async fn create(State(state): State<AppState>, form: FormSubmission) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.books.create(&submission, &ctx).await?;
    Ok(submitted(outcome, "book_form", "Create Book"))
}

pub async fn update_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.books.update_form(id).await?;
    Ok(View::new("book_form", "Update Book", data))
}

pub async fn update(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    form: FormSubmission,
) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.books.update(id, &submission, &ctx).await?;
    Ok(submitted(outcome, "book_form", "Update Book"))
}

pub async fn delete_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<Response> {
    let data = state.services.books.delete_form(id).await?;
    Ok(confirmation(data, "book_delete", "Delete Book", BOOKS_URL))
}

pub async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    FormSubmission(submission): FormSubmission,
) -> AppResult<Response> {
    let outcome = state.services.books.delete(id, &submission).await?;
    Ok(removed(outcome, "book_delete", "Delete Book"))
}
