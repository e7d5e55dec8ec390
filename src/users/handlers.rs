use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{
        ListerQuery, MeResponse, ProfileUpdate, PublicProfile, RoleResponse, RoleUpdate,
        StatusResponse, StatusUpdate, UserListQuery,
    },
    repo_types::{Role, User},
};
use crate::{
    auth::{
        cookie::expired_cookie,
        extractors::{AdminUser, AuthUser},
    },
    error::{AppError, AppResult},
    extract::{JsonBody, Path, Query},
    images::{check_images, upload_limit, FormOrJson},
    policy,
    state::AppState,
    validation::{validate_profile, ValidationError},
};

/// One avatar plus the `data` part.
pub const UPLOAD_LIMIT: usize = upload_limit(1);

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/role", get(get_role))
        .route("/listers", get(list_listers))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).put(update_me).delete(delete_me))
        .route("/admin/users/:id/role", put(change_role))
        .route("/admin/users/:id/status", put(change_status))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let me = User::find(&state.db, &user.id).await?;
    let role = User::role(&state.db, &user.id).await?;
    Ok(Json(MeResponse::new(me, role)))
}

/// PUT /users/me, JSON or multipart with `data` and an optional `avatar`.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    FormOrJson(mut form): FormOrJson,
) -> AppResult<Json<MeResponse>> {
    let payload: ProfileUpdate = form.json()?;
    let today = OffsetDateTime::now_utc().date();
    let changes = validate_profile(&payload, &state.deny_list, today).map_err(|e| {
        warn!(reason = %e, "profile rejected");
        e
    })?;
    policy::update_profile(&user, &payload.id, &payload.email).map_err(|d| {
        warn!(reason = %d, "profile update denied");
        d
    })?;

    let avatar = form.take_files("avatar");
    if avatar.len() > 1 {
        return Err(ValidationError::new("only one avatar is allowed").into());
    }
    check_images(&avatar)?;

    User::update_profile(&state.db, &user.id, &changes, avatar.first()).await?;
    info!(avatar = !avatar.is_empty(), "profile updated");

    let me = User::find(&state.db, &user.id).await?;
    let role = User::role(&state.db, &user.id).await?;
    Ok(Json(MeResponse::new(me, role)))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    policy::delete_account(&user, &user.id)?;
    User::delete_cascade(&state.db, &user.id).await?;
    let cookie = expired_cookie(state.config.cookie_secure);
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie.to_string())],
    ))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UserListQuery>,
) -> AppResult<Json<Vec<String>>> {
    let page = q.page()?;
    let ids = User::search_public(
        &state.db,
        q.first_name.as_deref(),
        q.last_name.as_deref(),
        page,
    )
    .await?;
    Ok(Json(ids))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    let user = User::find_optional(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    Ok(Json(PublicProfile::from(user)))
}

#[instrument(skip(state))]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RoleResponse>> {
    let role = User::role(&state.db, &id).await?;
    Ok(Json(RoleResponse { id, role }))
}

#[instrument(skip(state))]
pub async fn list_listers(
    State(state): State<AppState>,
    Query(q): Query<ListerQuery>,
) -> AppResult<Json<Vec<String>>> {
    let page = q.page()?;
    let role = q.role.unwrap_or(Role::Lister);
    let ids = User::search_by_role(&state.db, role, q.name.as_deref(), page).await?;
    Ok(Json(ids))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn change_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RoleUpdate>,
) -> AppResult<Json<RoleResponse>> {
    policy::change_role(&admin.0, &id, &state.config.admin_id)?;
    User::set_role(&state.db, &id, body.role).await?;
    info!(target_id = %id, role = ?body.role, "role changed");
    Ok(Json(RoleResponse {
        id,
        role: body.role,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn change_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusUpdate>,
) -> AppResult<Json<StatusResponse>> {
    policy::change_status(&admin.0, &id, &state.config.admin_id)?;
    User::set_status(&state.db, &id, body.status).await?;
    info!(target_id = %id, status = ?body.status, "account status changed");
    Ok(Json(StatusResponse {
        id,
        status: body.status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;

    fn app() -> (Router, AppState) {
        let state = AppState::fake();
        let router = Router::new()
            .merge(read_routes())
            .merge(write_routes())
            .with_state(state.clone());
        (router, state)
    }

    #[tokio::test]
    async fn me_requires_token() {
        let (app, _) = app();
        let res = app
            .oneshot(Request::get("/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_regular_callers() {
        let (app, state) = app();
        let keys = JwtKeys::new(&state.config.jwt);
        let token = keys.issue("200000000000000", "alice@example.com").unwrap();
        let res = app
            .oneshot(
                Request::put("/admin/users/300000000000000/role")
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"role":"lister"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() {
        let (app, state) = app();
        let keys = JwtKeys::new(&state.config.jwt);
        let admin = state.config.admin_id.clone();
        let token = keys.issue(&admin, "admin@example.com").unwrap();
        let res = app
            .oneshot(
                Request::put(format!("/admin/users/{admin}/role"))
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"role":"regular"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn profile_validation_runs_before_storage() {
        let (app, state) = app();
        let keys = JwtKeys::new(&state.config.jwt);
        let token = keys.issue("200000000000000", "alice@example.com").unwrap();
        let body = serde_json::json!({
            "id": "200000000000000",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Smith",
            "birth_date": "1999-12-25",
            "gender": "Woman",
            "location": "Oslo",
            "interests": []
        });
        let res = app
            .oneshot(
                Request::put("/users/me")
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "interests is empty");
    }

    #[tokio::test]
    async fn profile_of_another_user_is_denied() {
        let (app, state) = app();
        let keys = JwtKeys::new(&state.config.jwt);
        let token = keys.issue("200000000000000", "alice@example.com").unwrap();
        let body = serde_json::json!({
            "id": "300000000000000",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Smith",
            "birth_date": "1999-12-25",
            "gender": "Woman",
            "location": "Oslo",
            "interests": ["Reading"]
        });
        let res = app
            .oneshot(
                Request::put("/users/me")
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    fn avatar_upload(token: &str, profile: &serde_json::Value, avatar_len: usize) -> Request<Body> {
        let boundary = "AVATARBOUNDARY";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{profile}\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.resize(body.len() + avatar_len, 7);
        body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());
        Request::put("/users/me")
            .header(header::COOKIE, format!("token={token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn profile_without_interests() -> serde_json::Value {
        serde_json::json!({
            "id": "200000000000000",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Smith",
            "birth_date": "1999-12-25",
            "gender": "Woman",
            "location": "Oslo",
            "interests": []
        })
    }

    #[tokio::test]
    async fn avatar_within_image_limit_is_read_in_full() {
        let (app, state) = app();
        let token = JwtKeys::new(&state.config.jwt)
            .issue("200000000000000", "alice@example.com")
            .unwrap();
        let req = avatar_upload(&token, &profile_without_interests(), 3 * 1024 * 1024);
        let res = app.oneshot(req).await.unwrap();
        // body accepted, so the profile itself is what gets rejected
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "interests is empty");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let (app, state) = app();
        let token = JwtKeys::new(&state.config.jwt)
            .issue("200000000000000", "alice@example.com")
            .unwrap();
        let req = avatar_upload(&token, &profile_without_interests(), UPLOAD_LIMIT + 1);
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_role_body_gets_json_error() {
        let (app, state) = app();
        let admin = state.config.admin_id.clone();
        let token = JwtKeys::new(&state.config.jwt)
            .issue(&admin, "admin@example.com")
            .unwrap();
        let res = app
            .oneshot(
                Request::put("/admin/users/300000000000000/role")
                    .header(header::COOKIE, format!("token={token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"role":"emperor"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn negative_page_is_bad_request() {
        let (app, _) = app();
        let res = app
            .oneshot(Request::get("/users?page=-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
