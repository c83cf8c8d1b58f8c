//! Session token issuance
//!
//! Tokens are HS256-signed JWTs. The signing key is always the secret of the
//! application the user is logging into, so a token minted for one
//! application never validates against another.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sso_core::{Application, User};
use std::time::Duration;
use thiserror::Error;

/// Claims carried by every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuing application id
    pub app_id: i32,
    /// Subject email
    pub email: String,
    /// Expiration timestamp (seconds since Unix epoch)
    pub exp: i64,
    /// Subject user id
    pub uid: i64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token lifetime out of range: {0:?}")]
    InvalidTtl(Duration),
}

/// Mints application-scoped session tokens with a fixed lifetime
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user` on behalf of `app`, expiring `ttl` from now
    pub fn issue(&self, user: &User, app: &Application) -> Result<String, JwtError> {
        self.issue_at(user, app, Utc::now())
    }

    /// Issue a token as if the current instant were `now`
    pub fn issue_at(
        &self,
        user: &User,
        app: &Application,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let ttl = i64::try_from(self.ttl.as_secs()).map_err(|_| JwtError::InvalidTtl(self.ttl))?;
        let exp = now
            .timestamp()
            .checked_add(ttl)
            .ok_or(JwtError::InvalidTtl(self.ttl))?;

        let claims = Claims {
            app_id: app.id,
            email: user.email.clone(),
            exp,
            uid: user.id,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(app.secret.as_bytes()),
        )?;

        Ok(token)
    }
}

/// Validate a session token against the application it claims to be for
///
/// Checks signature and expiration, then that the embedded `app_id` matches
/// `app`. The login flow never calls this; it exists for downstream
/// verifiers.
pub fn validate_token(token: &str, app: &Application) -> Result<Claims, JwtError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(app.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    if token_data.claims.app_id != app.id {
        return Err(JwtError::InvalidToken);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn test_user() -> User {
        User {
            id: 1,
            email: "a@x.com".to_string(),
            pass_hash: Vec::new(),
            is_admin: false,
        }
    }

    fn decode_part(part: &str) -> serde_json::Value {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(part)
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_issue_and_validate_token() {
        let issuer = TokenIssuer::new(Duration::from_secs(3600));
        let app = Application::new(1, "web", "app-secret");
        let now = Utc::now();

        let token = issuer.issue_at(&test_user(), &app, now).unwrap();
        let claims = validate_token(&token, &app).expect("Failed to validate token");

        assert_eq!(claims.uid, 1);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.app_id, 1);
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_wire_format() {
        let issuer = TokenIssuer::new(Duration::from_secs(60));
        let app = Application::new(7, "web", "app-secret");
        let token = issuer.issue(&test_user(), &app).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header = decode_part(parts[0]);
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");

        let payload = decode_part(parts[1]);
        assert_eq!(payload["uid"], 1);
        assert_eq!(payload["email"], "a@x.com");
        assert_eq!(payload["app_id"], 7);
        assert!(payload["exp"].is_i64());
    }

    #[test]
    fn test_tokens_at_different_instants_differ() {
        let issuer = TokenIssuer::new(Duration::from_secs(3600));
        let app = Application::new(1, "web", "app-secret");
        let now = Utc::now();

        let first = issuer.issue_at(&test_user(), &app, now).unwrap();
        let second = issuer
            .issue_at(&test_user(), &app, now + chrono::Duration::seconds(1))
            .unwrap();

        assert_ne!(first, second);
        let exp1 = validate_token(&first, &app).unwrap().exp;
        let exp2 = validate_token(&second, &app).unwrap().exp;
        assert_eq!(exp2 - exp1, 1);
    }

    #[test]
    fn test_token_from_other_application_is_rejected() {
        let issuer = TokenIssuer::new(Duration::from_secs(3600));
        let web = Application::new(1, "web", "web-secret");
        let mobile = Application::new(2, "mobile", "mobile-secret");

        let token = issuer.issue(&test_user(), &web).unwrap();
        let result = validate_token(&token, &mobile);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_app_id_must_match_even_with_shared_secret() {
        let issuer = TokenIssuer::new(Duration::from_secs(3600));
        let web = Application::new(1, "web", "shared");
        let other = Application::new(2, "other", "shared");

        let token = issuer.issue(&test_user(), &web).unwrap();
        assert!(matches!(
            validate_token(&token, &other),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let app = Application::new(1, "web", "app-secret");
        let result = validate_token("invalid.token.here", &app);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new(Duration::from_secs(3600));
        let app = Application::new(1, "web", "app-secret");

        // Issued three hours ago, expired two hours ago
        let issued_at = Utc::now() - chrono::Duration::hours(3);
        let token = issuer.issue_at(&test_user(), &app, issued_at).unwrap();

        let result = validate_token(&token, &app);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_ttl_overflow() {
        let issuer = TokenIssuer::new(Duration::from_secs(u64::MAX));
        let app = Application::new(1, "web", "app-secret");
        let result = issuer.issue(&test_user(), &app);
        assert!(matches!(result, Err(JwtError::InvalidTtl(_))));
    }
}
