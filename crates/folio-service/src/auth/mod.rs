//! Authentication and authorization flow.
//!
//! ## Module Organization
//!
//! - `authenticate`: Username / password verification and the bootstrap admin
//! - `credential`: Credential lookups against the `users` collection
//! - `depot`: Helpers for reading the request identity from Salvo's depot
//! - `gate`: Per-route access decisions (authenticated, owner or elevated)
//! - `password`: Password hashing and verification with Argon2
//! - `principal`: Verified identities, roles, and credential records
//! - `session`: Session ids, sliding expiry, and identity (de)serialization

pub mod authenticate;
pub mod credential;
pub mod depot;
pub mod gate;
pub mod password;
pub mod principal;
pub mod session;

pub use authenticate::{Authenticator, Rejection, ensure_bootstrap_admin};
pub use credential::{CredentialStore, DocumentCredentialStore};
pub use depot::{get_principal_from_depot, get_session_id_from_depot, require_principal};
pub use gate::{AccessDecision, AccessRule, DenyReason, GuardedCollection, Ownership};
pub use principal::{Principal, PrincipalId, Role};
pub use session::{SessionId, SessionManager, SessionToken};
