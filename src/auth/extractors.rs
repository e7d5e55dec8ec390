use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{cookie::token_from_headers, jwt::JwtKeys};
use crate::{error::AppError, state::AppState};

/// Caller proven by a valid `token` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "rejected session token");
            AppError::Unauthenticated
        })?;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Caller whose subject is the configured global admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.id != state.config.admin_id {
            warn!(user_id = %user.id, "admin route denied");
            return Err(AppError::Unauthorized("admin privileges required".into()));
        }
        Ok(AdminUser(user))
    }
}
