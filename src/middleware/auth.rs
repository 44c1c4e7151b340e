//! Middleware de autenticación JWT
//!
//! Extrae el actor autenticado del header Authorization. La política de
//! roles es responsabilidad del colaborador de auth que emitió el token;
//! el core confía en la identidad recibida.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::models::enums::UserRole;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::verify_token;

/// Actor autenticado que se inyecta en los handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedActor {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Unauthorized("Token de autorización requerido".to_string())
            })?;

        let claims = verify_token(token, &state.config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("ID de usuario inválido".to_string()))?;

        Ok(AuthenticatedActor {
            user_id,
            role: claims.role,
        })
    }
}
