//! Integration tests for the HTTP surface, run against the full router over
//! in-memory stores.

mod articles;
mod auth;
mod helpers;
mod users;
