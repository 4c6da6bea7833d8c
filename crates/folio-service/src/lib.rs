//! Authentication, session identity, access gating, and the resource
//! services built on top of the document store.

pub mod auth;
pub mod error;
pub mod resource;
