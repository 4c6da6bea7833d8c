//! Shared configuration, constants and error types for the Folio workspace.

pub mod config;
pub mod constants;
pub mod error;
