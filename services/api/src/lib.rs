//! services/api/src/lib.rs
//!
//! The onboarding server: configuration, the adapters behind the core ports,
//! and the axum web layer serving REST, WebSocket and Swagger UI routes.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
