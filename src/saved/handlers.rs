use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::repo::{self, SavedKind};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{Path, Query},
    search::PageQuery,
    state::AppState,
    validation::ValidationError,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/saved/:kind", get(list_saved).delete(clear_saved))
        .route("/saved/:kind/:id", post(save_item).delete(remove_item))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn list_saved(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<SavedKind>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Vec<String>>> {
    let page = q.page()?;
    let ids = repo::list(&state.db, kind, &user.id, page).await?;
    Ok(Json(ids))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn save_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, raw_id)): Path<(SavedKind, String)>,
) -> AppResult<StatusCode> {
    let target = kind.target(&raw_id)?;
    if kind == SavedKind::Users && raw_id == user.id {
        warn!("attempt to save own profile");
        return Err(ValidationError::new("cannot save your own profile").into());
    }
    if !repo::target_exists(&state.db, &target).await? {
        return Err(AppError::NotFound(format!("{raw_id} not found")));
    }
    if repo::save(&state.db, &user.id, &target).await? {
        info!(?kind, id = %raw_id, "item saved");
        return Ok(StatusCode::CREATED);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, raw_id)): Path<(SavedKind, String)>,
) -> AppResult<StatusCode> {
    let target = kind.target(&raw_id)?;
    repo::remove(&state.db, &user.id, &target)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound(format!("{raw_id} is not saved")),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drops every saved item of one kind.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn clear_saved(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<SavedKind>,
) -> AppResult<StatusCode> {
    let removed = repo::clear(&state.db, kind, &user.id).await?;
    info!(?kind, removed, "saved items cleared");
    Ok(StatusCode::NO_CONTENT)
}
