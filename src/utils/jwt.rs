//! Utilidades JWT
//!
//! Funciones helper para emitir y verificar tokens de actores autenticados.
//! La emisión real de tokens es responsabilidad del colaborador de auth;
//! aquí solo se necesita para tests y tooling local.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::UserRole;
use crate::utils::errors::AppError;

/// Claims del JWT token
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,    // user_id
    pub role: UserRole, // rol del actor
    pub exp: usize,
    pub iat: usize,
}

/// Generar JWT token para un actor
pub fn generate_token(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(expiration_secs as i64);

    let claims = JwtClaims {
        sub: user_id.to_string(),
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Error generando token: {}", e)))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<JwtClaims, AppError> {
    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Token inválido o expirado".to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_token() {
        let user_id = Uuid::new_v4();
        let token =
            generate_token(user_id, UserRole::Collector, "test-secret", 3600).unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, UserRole::Collector);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token =
            generate_token(Uuid::new_v4(), UserRole::RouteManager, "secret-a", 3600).unwrap();
        let err = verify_token(&token, "secret-b").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
