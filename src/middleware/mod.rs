//! Middleware del sistema
//!
//! Autenticación JWT y CORS.

pub mod auth;
pub mod cors;

pub use auth::AuthenticatedActor;
pub use cors::cors_middleware;
