//! Verifies the session tokens issued by the identity provider.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The cookie the identity provider stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// The contents of a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The identity provider's ID for the user.
    pub sub: String,
    /// The user's primary email address.
    pub email: String,
    /// The user's display name, if they have set one.
    #[serde(default)]
    pub name: Option<String>,
    /// The expiry time of the token as a Unix timestamp.
    pub exp: usize,
}

/// Decode and verify an HS256 session token signed with `secret`.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if the signature does not match, the token has expired, or
/// the claims are malformed.
pub fn decode_session_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|token_data| token_data.claims)
    .map_err(|error| {
        tracing::debug!("Rejected session token: {error}");
        Error::Unauthenticated
    })
}

/// Sign `claims` with `secret`.
///
/// The identity provider issues tokens in production. This is used by tests and by local
/// development tooling.
pub fn encode_session_token(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|error| {
        tracing::error!("Could not sign session token: {error}");
        Error::Unauthenticated
    })
}
