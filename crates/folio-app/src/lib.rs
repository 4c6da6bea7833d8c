//! HTTP layer for Folio: depot providers, session middleware, the access
//! gate, and the route handlers.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
