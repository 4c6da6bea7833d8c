//! Document and session storage for Folio.
//!
//! Two backends implement the same traits: an in-process store used for
//! development and tests, and a PostgreSQL store keeping documents as JSONB.

pub mod db;
pub mod error;
pub mod model;
