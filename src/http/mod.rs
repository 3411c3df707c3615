//! HTTP surface: router, internal endpoints and request signing

pub mod middleware;
pub mod routes;
pub mod signature;

pub use routes::build_router;
