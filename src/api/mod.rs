//! HTTP surface: route layer, auth guard, and shared middleware.

pub mod auth;
pub mod health;
pub mod request_id;
pub mod routes;
