//! Genre endpoints

use axum::{extract::State, response::Response};

use super::{confirmation, removed, submitted, EntityId, FormSubmission, View};
use crate::{error::AppResult, models::genre::GENRES_URL, AppState};

pub async fn list(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.genres.list().await?;
    Ok(View::new("genre_list", "Genre List", data))
}

pub async fn detail(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.genres.detail(id).await?;
    Ok(View::new("genre_detail", "Genre Detail", data))
}

pub async fn create_form(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.genres.create_form()?;
    Ok(View::new("genre_form", "Create Genre", data))
}

pub async fn create(State(state): State<AppState>, form: FormSubmission) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.genres.create(&submission, &ctx).await?;
    Ok(submitted(outcome, "genre_form", "Create Genre"))
}

pub async fn update_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<View> {
    let data = state.services.genres.update_form(id).await?;
    Ok(View::new("genre_form", "Update Genre", data))
}

pub async fn update(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    form: FormSubmission,
) -> AppResult<Response> {
    let (submission, ctx) = form.with_context()?;
    let outcome = state.services.genres.update(id, &submission, &ctx).await?;
    Ok(submitted(outcome, "genre_form", "Update Genre"))
}

pub async fn delete_form(State(state): State<AppState>, EntityId(id): EntityId) -> AppResult<Response> {
    let data = state.services.genres.delete_form(id).await?;
    Ok(confirmation(data, "genre_delete", "Delete Genre", GENRES_URL))
}

pub async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    FormSubmission(submission): FormSubmission,
) -> AppResult<Response> {
    let outcome = state.services.genres.delete(id, &submission).await?;
    Ok(removed(outcome, "genre_delete", "Delete Genre"))
}
