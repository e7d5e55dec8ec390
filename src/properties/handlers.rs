use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreatedProperty, PropertyListQuery, PropertyPayload, PropertyView},
    repo,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{Path, Query},
    images::{
        check_images, list_images, upload_limit, FormOrJson, ImageOwner, ImageView, MAX_IMAGES,
    },
    policy,
    state::AppState,
    users::repo_types::User,
    validation::validate_property,
};

pub const UPLOAD_LIMIT: usize = upload_limit(MAX_IMAGES);

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/properties", get(list_properties))
        .route("/properties/:id", get(get_property))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/properties", post(create_property))
        .route("/properties/:id", put(update_property).delete(delete_property))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
}

fn duplicate_address() -> AppError {
    AppError::Conflict("a property with this address already exists".into())
}

/// Unique violations on write come from `address_key`.
fn map_write_error(e: sqlx::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => duplicate_address(),
        other => other,
    }
}

/// POST /properties, JSON or multipart with `data` and `images`.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn create_property(
    State(state): State<AppState>,
    user: AuthUser,
    FormOrJson(mut form): FormOrJson,
) -> AppResult<impl IntoResponse> {
    let payload: PropertyPayload = form.json()?;
    let id = Uuid::new_v4();
    let property = validate_property(&id.to_string(), &user.id, &payload, &state.deny_list)
        .map_err(|e| {
            warn!(reason = %e, "property rejected");
            e
        })?;
    let images = form.take_files("images");
    check_images(&images)?;

    let role = User::role(&state.db, &user.id).await?;
    policy::create_property(role)?;

    if repo::address_taken(&state.db, &property.address_key, None).await? {
        warn!(address_key = %property.address_key, "duplicate property address");
        return Err(duplicate_address());
    }
    let image_ids = repo::insert(&state.db, &property, &images)
        .await
        .map_err(map_write_error)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/properties/{id}"))],
        Json(CreatedProperty { id, image_ids }),
    ))
}

#[instrument(skip(state))]
pub async fn list_properties(
    State(state): State<AppState>,
    Query(q): Query<PropertyListQuery>,
) -> AppResult<Json<Vec<Uuid>>> {
    let page = q.page()?;
    let ids = repo::search(&state.db, q.address.as_deref(), page).await?;
    Ok(Json(ids))
}

async fn load_view(state: &AppState, id: Uuid) -> AppResult<PropertyView> {
    let row = repo::find(&state.db, id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound(format!("property {id} not found")),
            other => other.into(),
        })?;
    let images = list_images(&state.db, ImageOwner::Property(id))
        .await?
        .into_iter()
        .map(ImageView::from)
        .collect();
    Ok(PropertyView::new(row, images))
}

#[instrument(skip(state))]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PropertyView>> {
    Ok(Json(load_view(&state, id).await?))
}

/// PUT /properties/:id. Images are replaced only when the request carries
/// at least one `images` part.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn update_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    FormOrJson(mut form): FormOrJson,
) -> AppResult<Json<PropertyView>> {
    let payload: PropertyPayload = form.json()?;
    let existing = repo::find(&state.db, id).await?;
    let property = validate_property(
        &id.to_string(),
        &existing.lister_id,
        &payload,
        &state.deny_list,
    )?;
    let images = form.take_files("images");
    check_images(&images)?;

    let role = User::role(&state.db, &user.id).await?;
    policy::update_property(&user, role, &existing.lister_id, &state.config.admin_id).map_err(
        |d| {
            warn!(reason = %d, "property update denied");
            d
        },
    )?;

    if repo::address_taken(&state.db, &property.address_key, Some(id)).await? {
        return Err(duplicate_address());
    }
    let replace = (!images.is_empty()).then_some(images.as_slice());
    repo::update(&state.db, &property, replace)
        .await
        .map_err(map_write_error)?;

    Ok(Json(load_view(&state, id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let existing = repo::find(&state.db, id).await?;
    policy::delete_property(&user, &existing.lister_id, &state.config.admin_id)?;
    repo::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
