//! JWT authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::UserRepository;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username.
    pub username: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Keys and settings for issuing and verifying access tokens.
#[derive(Clone)]
pub struct JwtState {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// Access token lifetime in seconds.
    pub expiry_secs: u64,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_secs,
        }
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.expiry_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Decode and validate a token.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Read the bearer token from the `Authorization` header, or from a
/// `token` query parameter (direct download links).
fn request_token(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    parts.uri.query().unwrap_or("").split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

/// Extractor for authenticated users.
///
/// Rejects missing, invalid and expired tokens, and tokens whose user no
/// longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl AuthUser {
    /// ID of the authenticated user.
    pub fn id(&self) -> i64 {
        self.0.sub
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            request_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;
        let claims = state.jwt.verify(&token)?;

        let exists = UserRepository::new(state.db.pool())
            .get_by_id(claims.sub)
            .await?
            .is_some();
        if !exists {
            tracing::debug!(user_id = claims.sub, "Token for deleted user rejected");
            return Err(ApiError::unauthorized("Invalid or expired token"));
        }

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_issue_and_verify() {
        let jwt = JwtState::new("test-secret", 3600);
        let token = jwt.issue(7, "alice").unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = JwtState::new("secret-a", 3600).issue(1, "a").unwrap();
        assert!(JwtState::new("secret-b", 3600).verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let jwt = JwtState::new("test-secret", 3600);
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: 1,
            username: "a".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            jti: "x".to_string(),
        };
        let token = encode(&Header::default(), &claims, &jwt.encoding_key).unwrap();
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn test_request_token() {
        assert_eq!(
            request_token(&parts("/api/files/1", Some("Bearer abc"))).as_deref(),
            Some("abc")
        );
        assert_eq!(
            request_token(&parts("/api/files/1/download?token=a%2Eb", None)).as_deref(),
            Some("a.b")
        );
        assert_eq!(request_token(&parts("/api/files/1", Some("Basic xyz"))), None);
        assert_eq!(request_token(&parts("/api/files/1", None)), None);
    }
}
