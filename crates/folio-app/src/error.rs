use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, async_trait};
use serde::Serialize;
use thiserror::Error;

use folio_service::error::ServiceError;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const ACCESS_DENIED: &str = "Access denied";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] folio_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] folio_core::error::CoreError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Access denied")]
    Forbidden,

    /// Carries the resource name, e.g. `"Article"`.
    #[error("{0} Not Found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceError(err) => match err {
                ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::AuthorizationError(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::DatabaseError(_) | Self::CoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// ## Summary
    /// The message rendered to clients. Internal failures never leak their
    /// cause.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::ServiceError(err) => match err {
                ServiceError::NotAuthenticated => AUTHENTICATION_REQUIRED.to_string(),
                ServiceError::AuthorizationError(_) => ACCESS_DENIED.to_string(),
                ServiceError::NotFound(msg)
                | ServiceError::ValidationError(msg)
                | ServiceError::Conflict(msg) => msg.clone(),
                _ => INTERNAL_ERROR.to_string(),
            },
            Self::DatabaseError(_) | Self::CoreError(_) => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        }
    }

    /// ## Summary
    /// Writes status and JSON body for this error into `res`.
    pub fn render_into(&self, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }
        res.status_code(status);
        res.render(Json(ErrorResponse {
            error: self.public_message(),
        }));
    }
}

#[async_trait]
impl salvo::Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        self.render_into(res);
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
