//! # Request Errors
//!
//! Every failure a route handler can hit is a [`MediaError`]. The enum maps
//! onto HTTP status codes in one place ([`IntoResponse`]) so handlers can use
//! `?` freely.
//!
//! | Variant | Status | Body |
//! |---------|--------|------|
//! | `Validation` | 400 | the validation message |
//! | `RangeNotSatisfiable` | 416 | fixed message, plus `Content-Range: bytes */size` |
//! | `NotFound`, `Io` | 500 | generic message, detail goes to the log |
//! | `Failed` | 500 | the route's own message, e.g. "Failed to serve video file" |

use std::io;
use std::path::{Path, PathBuf};

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::server::range::RangeError;

/// Result alias used by the route handlers.
pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The request itself is unusable (bad id, missing form field, bad multipart body).
    #[error("{0}")]
    Validation(String),

    /// The `Range` header does not describe a satisfiable slice of the file.
    #[error("range not satisfiable for a {size}-byte file: {reason}")]
    RangeNotSatisfiable { size: u64, reason: RangeError },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A storage failure relabelled by the route that hit it.
    #[error("{message}: {source}")]
    Failed {
        message: &'static str,
        #[source]
        source: Box<MediaError>,
    },
}

impl MediaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classifies an I/O error on `path`, splitting out missing files.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Gives storage failures the route-specific `message` in the response
    /// body. Client errors pass through untouched.
    pub fn reported_as(self, message: &'static str) -> Self {
        match self {
            Self::NotFound(_) | Self::Io { .. } => Self::Failed {
                message,
                source: Box::new(self),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::NotFound(_) | Self::Io { .. } | Self::Failed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message placed in the JSON body. Storage failures stay generic so
    /// filesystem layout is not exposed to callers.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::RangeNotSatisfiable { .. } => "Requested range not satisfiable".to_string(),
            Self::NotFound(_) => "Media file not found".to_string(),
            Self::Io { .. } => "Media storage operation failed".to_string(),
            Self::Failed { message, .. } => message.to_string(),
        }
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("[Media] {}", self);
        } else {
            log::debug!("[Media] Rejected request: {}", self);
        }

        let body = Json(json!({ "error": self.public_message() }));
        match self {
            Self::RangeNotSatisfiable { size, .. } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
