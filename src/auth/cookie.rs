use axum::http::{header, HeaderMap};
use time::{Duration, OffsetDateTime};
use tower_sessions::cookie::{Cookie, SameSite};

pub const TOKEN_COOKIE: &str = "token";

/// HttpOnly cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .expires(OffsetDateTime::now_utc() + ttl)
        .build()
}

/// Overwrites the client's token with an empty, already expired one.
pub fn expired_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|c| c.name() == TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie("abc".into(), Duration::hours(720), true);
        let rendered = c.to_string();
        assert!(rendered.starts_with("token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Path=/"));
        let expires = c.expires_datetime().expect("expiry set");
        assert!(expires > OffsetDateTime::now_utc() + Duration::hours(719));
    }

    #[test]
    fn expired_cookie_clears_value() {
        let c = expired_cookie(false);
        assert_eq!(c.value(), "");
        assert!(c.expires_datetime().expect("expiry set") < OffsetDateTime::now_utc());
        assert!(!c.to_string().contains("Secure"));
    }

    #[test]
    fn reads_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=xyz.abc.def; lang=en"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz.abc.def"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(token_from_headers(&headers), None);
    }
}
