//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación. Los servicios
//! encapsulan operaciones que involucran múltiples entidades y se ejecutan
//! dentro de transacciones; las variantes `*_tx` participan en la
//! transacción del caller.

pub mod bin_service;
pub mod collection_service;
pub mod event_service;
pub mod request_service;
pub mod route_service;
pub mod status_service;
