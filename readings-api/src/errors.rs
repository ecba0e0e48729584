use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::metrics::REJECTED_REQUESTS_TOTAL;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Invalid {name} value: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Endpoint is not implemented")]
    NotImplemented,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MissingParameter(_) | Error::InvalidParameter { .. } | Error::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Error::Database(_) | Error::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Error::MissingParameter(_) => "missing_parameter",
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::NotImplemented => "not_implemented",
            Error::InvalidBody(_) => "invalid_body",
            Error::Database(_) | Error::Migration(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidBody(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        REJECTED_REQUESTS_TOTAL
            .with_label_values(&[self.reason()])
            .inc();

        // Store failures are logged in full but never echoed to the client
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            error!("API error: {}", self);
            return (status, "Internal server error").into_response();
        }

        warn!("Rejected request: {}", self);
        (status, self.to_string()).into_response()
    }
}
