use serde::{Deserialize, Serialize};

/// JWT payload carried in the `token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // provider subject id
    pub email: String,    // provider email at sign-in
    pub authorized: bool, // always true for tokens issued on sign-in
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,      // issuer
    pub aud: String,      // audience
}
