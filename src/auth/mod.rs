use crate::state::AppState;
use axum::Router;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

mod claims;
pub mod cookie;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod provider;

/// Login and callback, wrapped in the session layer that carries the
/// handshake state between them.
pub fn oauth_router(secure: bool) -> Router<AppState> {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(5)));
    handlers::oauth_routes().layer(session_layer)
}

pub fn router(secure: bool) -> Router<AppState> {
    Router::new()
        .merge(oauth_router(secure))
        .merge(handlers::logout_routes())
}
