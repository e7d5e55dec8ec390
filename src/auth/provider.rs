use anyhow::Context;
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, reqwest, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config::OAuthConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Identity returned by the provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub id: String,
    pub email: String,
}

/// Where to send the browser, plus the secrets that must survive the
/// round-trip to the callback.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize(&self) -> AuthorizeRequest;
    async fn exchange(&self, code: String, pkce_verifier: String)
        -> anyhow::Result<ProviderIdentity>;
}

#[derive(Clone)]
pub struct GoogleProvider {
    client: GoogleClient,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
}

impl GoogleProvider {
    pub fn new(cfg: &OAuthConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string())?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?)
            .set_redirect_uri(RedirectUrl::new(cfg.redirect_url.clone()).context("GOOGLE_REDIRECT_URL")?);
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build oauth http client")?;
        Ok(Self { client, http })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize(&self) -> AuthorizeRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();
        AuthorizeRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    async fn exchange(
        &self,
        code: String,
        pkce_verifier: String,
    ) -> anyhow::Result<ProviderIdentity> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&self.http)
            .await
            .context("exchange authorization code")?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("request userinfo")?
            .error_for_status()
            .context("userinfo status")?
            .json()
            .await
            .context("decode userinfo")?;

        Ok(ProviderIdentity {
            id: info.id,
            email: info.email,
        })
    }
}
