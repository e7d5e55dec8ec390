use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::{
    cookie::{expired_cookie, session_cookie},
    jwt::JwtKeys,
};
use crate::{
    error::{AppError, AppResult},
    extract::Query,
    state::AppState,
    users::repo_types::User,
    validation::{validate_email, validate_provider_id},
};

const CSRF_STATE: &str = "oauth.csrf_state";
const PKCE_VERIFIER: &str = "oauth.pkce_verifier";

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google/login", get(login))
        .route("/auth/google/callback", get(callback))
}

pub fn logout_routes() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(e).context("oauth session"))
}

/// Starts the provider handshake. CSRF state and PKCE verifier stay in the
/// short-lived handshake session until the callback.
#[instrument(skip(state, session))]
pub async fn login(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    let req = state.identity.authorize();
    session
        .insert(CSRF_STATE, req.csrf_state)
        .await
        .map_err(session_error)?;
    session
        .insert(PKCE_VERIFIER, req.pkce_verifier)
        .await
        .map_err(session_error)?;
    Ok(Redirect::to(&req.url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

#[instrument(skip(state, session, q))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<CallbackQuery>,
) -> AppResult<impl IntoResponse> {
    if let Some(err) = q.error {
        warn!(error = %err, "provider denied the login");
        return Err(AppError::Unauthenticated);
    }
    let (Some(returned_state), Some(code)) = (q.state, q.code) else {
        return Err(AppError::BadRequest("state and code are required".into()));
    };

    let stored_state = session
        .remove::<String>(CSRF_STATE)
        .await
        .map_err(session_error)?;
    let verifier = session
        .remove::<String>(PKCE_VERIFIER)
        .await
        .map_err(session_error)?;
    let (Some(stored_state), Some(verifier)) = (stored_state, verifier) else {
        warn!("callback without a pending handshake");
        return Err(AppError::Unauthenticated);
    };
    if stored_state != returned_state {
        warn!("oauth state mismatch");
        return Err(AppError::Unauthenticated);
    }

    let identity = state.identity.exchange(code, verifier).await.map_err(|e| {
        warn!(error = ?e, "code exchange failed");
        AppError::Unauthenticated
    })?;
    validate_provider_id("id", &identity.id)?;
    validate_email(&identity.email)?;

    let user = match User::find_optional(&state.db, &identity.id).await? {
        Some(user) => user,
        None => User::create(&state.db, &identity.id, &identity.email).await?,
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue(&user.id, &user.email)?;
    let cookie = session_cookie(token, keys.ttl, state.config.cookie_secure);
    session.flush().await.map_err(session_error)?;
    info!(user_id = %user.id, "login succeeded");

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to(&state.config.frontend_url),
    ))
}

/// Tokens are not tracked server side; logging out only expires the cookie.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = expired_cookie(state.config.cookie_secure);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie.to_string())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .merge(crate::auth::oauth_router(false))
            .merge(logout_routes())
            .with_state(AppState::fake())
    }

    #[tokio::test]
    async fn login_redirects_and_starts_session() {
        let res = app()
            .oneshot(Request::get("/auth/google/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(
            res.headers()[header::LOCATION],
            "https://fake.local/authorize?state=fake-state"
        );
        assert!(res.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn callback_without_handshake_is_rejected() {
        let res = app()
            .oneshot(
                Request::get("/auth/google/callback?state=fake-state&code=109237874690123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_with_wrong_state_is_rejected() {
        let app = app();
        let login = app
            .clone()
            .oneshot(Request::get("/auth/google/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let session_cookie = login.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let res = app
            .oneshot(
                Request::get("/auth/google/callback?state=forged&code=109237874690123")
                    .header(header::COOKIE, session_cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_requires_code() {
        let res = app()
            .oneshot(
                Request::get("/auth/google/callback?state=fake-state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_expires_cookie() {
        let res = app()
            .oneshot(Request::post("/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("token=;"));
    }
}
