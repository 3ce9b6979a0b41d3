//! Catalog home page

use axum::extract::State;

use super::View;
use crate::{error::AppResult, AppState};

pub async fn index(State(state): State<AppState>) -> AppResult<View> {
    let data = state.services.catalog.index().await?;
    Ok(View::new("index", "Local Library Home", data))
}
