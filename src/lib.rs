pub mod config;
pub mod entitlement;
pub mod error;
pub mod pricing;
pub mod routes;
pub mod webhooks;

pub use routes::api_routes;
