//! Book instance (copy) endpoints

use axum::{extract::State, response::Response};

use super::{confirmation, removed, submitted, EntityId, FormSubmission, View};
use crate::{error::AppResult, models::book_instance::BOOK_INSTANCES_URL, AppState};

pub async fn list(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.book_instances.list().await?;
    Ok(View::new("bookinstance_list", "Book Instance List", data))
}

pub async fn detail(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.book_instances.detail(id).await?;
    Ok(View::new("bookinstance_detail", "Book Instance", data))
}

pub async fn create_form(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.book_instances.create_form().await?;
    Ok(View::new("bookinstance_form", "Create BookInstance", data))
}

pub async fn create(State(state): State<AppState>, form: FormSubmission) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.book_instances.create(&submission, &ctx).await?;
    Ok(submitted(outcome, "bookinstance_form", "Create BookInstance"))
}

pub async fn update_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.book_instances.update_form(id).await?;
    Ok(View::new("bookinstance_form", "Update BookInstance", data))
}

pub async fn update(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    form: FormSubmission,
) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.book_instances.update(id, &submission, &ctx).await?;
    Ok(submitted(outcome, "bookinstance_form", "Update BookInstance"))
}

pub async fn delete_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<Response> {
    let data = state.services.book_instances.delete_form(id).await?;
    Ok(confirmation(data, "bookinstance_delete", "Delete BookInstance", BOOK_INSTANCES_URL))
}

pub async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    FormSubmission(submission): FormSubmission,
) -> AppResult<Response> {
    let outcome = state.services.book_instances.delete(id, &submission).await?;
    Ok(removed(outcome, "bookinstance_delete", "Delete BookInstance"))
}
