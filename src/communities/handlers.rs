use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AddMember, CommunityListQuery, CommunityPayload, CommunityView, CreatedCommunity,
        LinkProperty,
    },
    repo,
    repo_types::CommunityRow,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{JsonBody, Path, Query},
    images::{
        check_images, list_images, upload_limit, FormOrJson, ImageOwner, ImageView, MAX_IMAGES,
    },
    policy,
    properties::repo as properties,
    state::AppState,
    users::repo_types::User,
    validation::{check_admin_membership, validate_community, validate_provider_id},
};

pub const UPLOAD_LIMIT: usize = upload_limit(MAX_IMAGES);

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/communities", get(list_communities))
        .route("/communities/:id", get(get_community))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/communities", post(create_community))
        .route("/communities/:id", delete(delete_community))
        .route("/communities/:id/users", post(add_member))
        .route("/communities/:id/users/:user_id", delete(remove_member))
        .route("/communities/:id/properties", post(link_property))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
}

async fn find_community(state: &AppState, id: Uuid) -> AppResult<CommunityRow> {
    repo::find(&state.db, id).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound(format!("community {id} not found")),
        other => other.into(),
    })
}

async fn ensure_user(state: &AppState, user_id: &str) -> AppResult<()> {
    if !User::exists(&state.db, user_id).await? {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }
    Ok(())
}

async fn ensure_property(state: &AppState, property_id: Uuid) -> AppResult<()> {
    if !properties::exists(&state.db, property_id).await? {
        return Err(AppError::NotFound(format!(
            "property {property_id} not found"
        )));
    }
    Ok(())
}

/// POST /communities, JSON or multipart with `data` and `images`.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn create_community(
    State(state): State<AppState>,
    user: AuthUser,
    FormOrJson(mut form): FormOrJson,
) -> AppResult<impl IntoResponse> {
    let payload: CommunityPayload = form.json()?;
    let id = Uuid::new_v4();
    let community = validate_community(&id.to_string(), &payload, &state.deny_list)
        .and_then(|c| check_admin_membership(&c.admin_id, &c.members).map(|_| c))
        .map_err(|e| {
            warn!(reason = %e, "community rejected");
            e
        })?;
    let images = form.take_files("images");
    check_images(&images)?;

    policy::create_community(&user, &community.admin_id)?;
    let role = User::role(&state.db, &user.id).await?;
    policy::community_creator(role).map_err(|d| {
        warn!(reason = %d, "community creation denied");
        d
    })?;

    for member in &community.members {
        ensure_user(&state, member).await?;
    }
    for property_id in &community.property_ids {
        ensure_property(&state, *property_id).await?;
    }

    let image_ids = repo::insert(&state.db, &community, &images).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/communities/{id}"))],
        Json(CreatedCommunity { id, image_ids }),
    ))
}

#[instrument(skip(state))]
pub async fn list_communities(
    State(state): State<AppState>,
    Query(q): Query<CommunityListQuery>,
) -> AppResult<Json<Vec<Uuid>>> {
    let page = q.page()?;
    let ids = repo::search(
        &state.db,
        q.name.as_deref(),
        q.description.as_deref(),
        page,
    )
    .await?;
    Ok(Json(ids))
}

#[instrument(skip(state))]
pub async fn get_community(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CommunityView>> {
    let row = find_community(&state, id).await?;
    let user_ids = repo::members(&state.db, id).await?;
    let property_ids = repo::property_ids(&state.db, id).await?;
    let images = list_images(&state.db, ImageOwner::Community(id))
        .await?
        .into_iter()
        .map(ImageView::from)
        .collect();
    Ok(Json(CommunityView::new(row, user_ids, property_ids, images)))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_community(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let community = find_community(&state, id).await?;
    policy::delete_community(&user, &community.admin_id, &state.config.admin_id)?;
    repo::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<AddMember>,
) -> AppResult<StatusCode> {
    validate_provider_id("user_id", &body.user_id)?;
    let community = find_community(&state, id).await?;
    policy::manage_community(&user, &community.admin_id).map_err(|d| {
        warn!(reason = %d, "add member denied");
        d
    })?;
    ensure_user(&state, &body.user_id).await?;
    if repo::add_member(&state.db, id, &body.user_id).await? {
        info!(community_id = %id, member = %body.user_id, "member added");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, member)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    let community = find_community(&state, id).await?;
    policy::remove_community_member(&user, &community.admin_id, &member)?;
    repo::remove_member(&state.db, id, &member)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                AppError::NotFound(format!("user {member} is not a member"))
            }
            other => other.into(),
        })?;
    info!(community_id = %id, %member, "member removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn link_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<LinkProperty>,
) -> AppResult<StatusCode> {
    let community = find_community(&state, id).await?;
    policy::manage_community(&user, &community.admin_id)?;
    ensure_property(&state, body.property_id).await?;
    if repo::link_property(&state.db, id, body.property_id).await? {
        info!(community_id = %id, property_id = %body.property_id, "property linked");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;

    const ALICE: &str = "200000000000000";

    fn app(state: &AppState) -> Router {
        Router::new()
            .merge(read_routes())
            .merge(write_routes())
            .with_state(state.clone())
    }

    async fn post_json(state: &AppState, uri: &str, body: serde_json::Value) -> StatusCode {
        let token = JwtKeys::new(&state.config.jwt)
            .issue(ALICE, "alice@example.com")
            .unwrap();
        app(state)
            .oneshot(
                Request::post(uri)
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn admin_must_be_a_member() {
        let state = AppState::fake();
        let status = post_json(
            &state,
            "/communities",
            serde_json::json!({
                "admin_id": ALICE,
                "name": "Lakeside",
                "user_ids": ["300000000000000"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn declared_admin_must_be_caller() {
        let state = AppState::fake();
        let status = post_json(
            &state,
            "/communities",
            serde_json::json!({
                "admin_id": "300000000000000",
                "name": "Lakeside",
                "user_ids": ["300000000000000"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn member_id_format_is_checked() {
        let state = AppState::fake();
        let uri = format!("/communities/{}/users", Uuid::new_v4());
        let status = post_json(&state, &uri, serde_json::json!({ "user_id": "bob" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
