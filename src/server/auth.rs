//! Bearer-token authentication.
//!
//! Access and refresh tokens are HS256 JWTs carrying the user id and name.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::config::AuthSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> ServiceResult<i64> {
        self.sub
            .parse()
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".into()))
    }
}

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Access/refresh pair handed out at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies tokens with one shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        if settings.is_insecure_default() {
            tracing::warn!(
                "Using the built-in JWT secret; set CORPORATICA_JWT_SECRET before deploying"
            );
        }
        Self {
            encoding: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            access_ttl_secs: settings.access_token_ttl_secs,
            refresh_ttl_secs: settings.refresh_token_ttl_secs,
        }
    }

    fn sign(&self, user_id: i64, username: &str, token_type: TokenType) -> ServiceResult<String> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            iat: now,
            exp: now + ttl,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::upstream("Failed to issue token", e))
    }

    pub fn access_token(&self, user_id: i64, username: &str) -> ServiceResult<String> {
        self.sign(user_id, username, TokenType::Access)
    }

    pub fn issue(&self, user: &User) -> ServiceResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user.id, &user.username, TokenType::Access)?,
            refresh: self.sign(user.id, &user.username, TokenType::Refresh)?,
        })
    }

    /// Decode a token and check it is of the expected type.
    pub fn verify(&self, token: &str, expected: TokenType) -> ServiceResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                ServiceError::Unauthorized("Given token not valid for any token type".into())
            })?;
        if data.claims.token_type != expected {
            return Err(ServiceError::Unauthorized("Token has wrong type".into()));
        }
        Ok(data.claims)
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid access token for an existing account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return ServiceError::Unauthorized("Authentication credentials were not provided.".into())
            .into_response();
    };

    let claims = match state.tokens.verify(token, TokenType::Access) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };
    let user = match claims.user_id() {
        Ok(id) => state.accounts.active_user(id).await,
        Err(e) => Err(e),
    };
    let user = match user {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
    });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl: i64) -> TokenIssuer {
        TokenIssuer::new(&AuthSettings {
            jwt_secret: "test-secret".into(),
            access_token_ttl_secs: ttl,
            refresh_token_ttl_secs: ttl,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = issuer(60);
        let token = tokens.access_token(7, "alice").unwrap();
        let claims = tokens.verify(&token, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = issuer(60);
        let refresh = tokens.sign(1, "bob", TokenType::Refresh).unwrap();
        assert!(matches!(
            tokens.verify(&refresh, TokenType::Access),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(tokens.verify(&refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let expired = issuer(-3600).access_token(1, "bob").unwrap();
        assert!(issuer(60).verify(&expired, TokenType::Access).is_err());

        let other = TokenIssuer::new(&AuthSettings {
            jwt_secret: "another-secret".into(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 60,
        });
        let foreign = other.access_token(1, "bob").unwrap();
        assert!(issuer(60).verify(&foreign, TokenType::Access).is_err());
    }
}
