//! Access tokens for the administrative endpoints.
//!
//! Operators exchange the long-lived admin API key for a short-lived HS256 access token at `/auth`, then present
//! it as a bearer token. The token's `sub` claim carries the operator name and ends up in the audit trail of every
//! manual override, so tokens are personal, not shared.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The operator this token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: config.token_lifetime,
        }
    }

    /// Issue a new access token for the given operator.
    /// This method DOES NOT verify the admin API key. That must be done prior to calling `issue_token`.
    pub fn issue_token(&self, operator: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: operator.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        debug!("💻️ Access token validated for operator '{}'", data.claims.sub);
        Ok(data.claims)
    }
}

impl FromRequest for JwtClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = bearer_token(req)
            .and_then(|token| {
                let issuer = req
                    .app_data::<web::Data<TokenIssuer>>()
                    .ok_or_else(|| AuthError::ValidationError("Token issuer is not configured".into()))?;
                issuer.validate_token(token)
            })
            .map_err(|e| crate::errors::ServerError::AuthenticationError(e).into());
        ready(claims)
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod test {
    use cpg_common::Secret;

    use super::*;
    use crate::config::AuthConfig;

    fn issuer() -> TokenIssuer {
        let config = AuthConfig {
            jwt_secret: Secret::new("test-secret-do-not-reuse".to_string()),
            api_key: Secret::new("test-api-key".to_string()),
            token_lifetime: chrono::Duration::hours(1),
        };
        TokenIssuer::new(&config)
    }

    #[test]
    fn tokens_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_token("budi").unwrap();
        let claims = issuer.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "budi");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = issuer().issue_token("budi").unwrap();
        let other = AuthConfig {
            jwt_secret: Secret::new("a-different-secret".to_string()),
            api_key: Secret::new("test-api-key".to_string()),
            token_lifetime: chrono::Duration::hours(1),
        };
        let result = TokenIssuer::new(&other).validate_token(&token);
        assert!(matches!(result, Err(AuthError::ValidationError(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = AuthConfig {
            jwt_secret: Secret::new("test-secret-do-not-reuse".to_string()),
            api_key: Secret::new("test-api-key".to_string()),
            token_lifetime: chrono::Duration::hours(-2),
        };
        let issuer = TokenIssuer::new(&config);
        let token = issuer.issue_token("budi").unwrap();
        assert!(matches!(issuer.validate_token(&token), Err(AuthError::ValidationError(_))));
    }
}