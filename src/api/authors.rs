//! Author endpoints

use axum::{extract::State, response::Response};

use super::{confirmation, removed, submitted, EntityId, FormSubmission, View};
use crate::{error::AppResult, models::author::AUTHORS_URL, AppState};

pub async fn list(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.authors.list().await?;
    Ok(View::new("author_list", "Author List", data))
}

pub async fn detail(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.authors.detail(id).await?;
    Ok(View::new("author_detail", "Author Detail", data))
}

pub async fn create_form(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.authors.create_form()?;
    Ok(View::new("author_form", "Create Author", data))
}

pub async fn create(State(state): State<AppState>, form: FormSubmission) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.authors.create(&submission, &ctx).await?;
    Ok(submitted(outcome, "author_form", "Create Author"))
}

pub async fn update_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.authors.update_form(id).await?;
    Ok(View::new("author_form", "Update Author", data))
}

pub async fn update(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    form: FormSubmission,
) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.authors.update(id, &submission, &ctx).await?;
    Ok(submitted(outcome, "author_form", "Update Author"))
}

pub async fn delete_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<Response> {
    let data = state.services.authors.delete_form(id).await?;
    Ok(confirmation(data, "author_delete", "Delete Author", AUTHORS_URL))
}

pub async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    FormSubmission(submission): FormSubmission,
) -> AppResult<Response> {
    let outcome = state.services.authors.delete(id, &submission).await?;
    Ok(removed(outcome, "author_delete", "Delete Author"))
}
