pub mod bin_routes;
pub mod collection_routes;
pub mod event_routes;
pub mod request_routes;
pub mod route_routes;
