use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::debug;

use crate::models::auth::responses::{TokenClaims, TokenResponse};
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::UserRepository;
use crate::services::errors::auth_service_errors::AuthServiceError;

#[cfg(test)]
use mockall::automock;

const TOKEN_TTL_HOURS: i64 = 24;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError>;
    /// Resolves a bearer token to the id of the player it was issued to.
    async fn current_player(&self, token: &str) -> Result<String, AuthServiceError>;
    fn generate_token(&self, username: &str) -> Result<TokenResponse, AuthServiceError>;
}

pub struct AuthService {
    users: Arc<dyn UserRepository + Send + Sync>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository + Send + Sync>, jwt_secret: String) -> Self {
        AuthService { users, jwt_secret }
    }
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        let validation = Validation::default();

        match decode::<TokenClaims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                let now = Utc::now().timestamp() as usize;
                if token_data.claims.exp < now {
                    Err(AuthServiceError::ExpiredToken)
                } else {
                    Ok(token_data.claims)
                }
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Err(AuthServiceError::ExpiredToken)
                }
                _ => Err(AuthServiceError::InvalidToken),
            },
        }
    }

    async fn current_player(&self, token: &str) -> Result<String, AuthServiceError> {
        let claims = self.verify_token(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AuthServiceError::NotAuthenticated);
        }
        match self.users.get_user_by_username(&claims.sub).await {
            Ok(user) => Ok(user.id),
            Err(UserRepositoryError::NotFound) => {
                debug!("Token subject {} has no account", claims.sub);
                Err(AuthServiceError::NotAuthenticated)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn generate_token(&self, username: &str) -> Result<TokenResponse, AuthServiceError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
        let iat = now.timestamp() as usize;

        let claims = TokenClaims {
            sub: username.to_string(),
            exp,
            iat,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AuthServiceError::JwtError(format!("{:#?}", e)))?;

        Ok(TokenResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: TOKEN_TTL_HOURS * 60 * 60,
        })
    }
}
