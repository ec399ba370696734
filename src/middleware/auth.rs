use crate::AppState;
use crate::config::AuthConfig;
use crate::db::models::AuthUser;
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access-token claims. Tokens are minted by the identity provider sharing
/// `JWT_SECRET`; this service only verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid, // user_id
    pub email: String,
    pub exp: u64, // expiration time
    pub iat: u64, // issued at
    pub jti: String,
}

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

fn bearer_token<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token and puts the active caller into request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next<axum::body::Body>,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or_else(|| AppError::auth("Missing bearer token"))?;
    let claims = state.auth.verify_token(token)?;

    let user = state
        .store
        .find_user(claims.sub)?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::auth("User not found or inactive"))?;

    request.extensions_mut().insert(AuthUser::from(&user));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::auth("Unauthorized"))
    }
}
