use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use deepseq_core::model::record::RecordType;
use diesel_async::pooled_connection::deadpool;
use serde::Serialize;

use crate::db;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] db::error::Error),
    #[error("Id is not provided.")]
    MissingId,
    #[error("invalid id: {raw}")]
    InvalidId { raw: String },
    #[error("{} does not exist.", record_type.display_name())]
    MissingRecord { record_type: RecordType },
    #[error("{reason}")]
    SimpleData { reason: String },
    #[error("{message}")]
    MalformedRequest { status: StatusCode, message: String },
    #[error("{message}")]
    Permission { message: String },
    #[error("failed to store file: {message}")]
    Io { message: String },
    #[error("failed to render report: {message}")]
    Report { message: String },
}

impl Error {
    pub(super) fn status_code(&self) -> StatusCode {
        use Error::{
            Database, InvalidId, Io, MalformedRequest, MissingId, MissingRecord, Permission,
            Report, SimpleData,
        };
        use db::error::Error::{
            DuplicateRecord, Other, RecordNotFound, ReferenceNotFound, StillReferenced,
        };

        match self {
            MissingId | InvalidId { .. } | SimpleData { .. } => StatusCode::BAD_REQUEST,
            MissingRecord { .. } => StatusCode::NOT_FOUND,
            Permission { .. } => StatusCode::FORBIDDEN,
            Io { .. } | Report { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Database(inner) => match inner {
                Other { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                DuplicateRecord { .. } | StillReferenced { .. } => StatusCode::CONFLICT,
                RecordNotFound => StatusCode::NOT_FOUND,
                ReferenceNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            MalformedRequest { status, .. } => *status,
        }
    }

    /// What a client gets to read. Internal failures are logged, not exposed.
    pub(super) fn public_message(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            return "internal server error".to_string();
        }

        self.to_string()
    }

    /// Logs this error at a level matching its severity.
    pub(super) fn log(&self) {
        if self.status_code().is_server_error() {
            tracing::error!(error = ?self);
        } else {
            tracing::info!(error = %self);
        }
    }

    /// Replaces a plain not-found with one naming the record type.
    pub(super) fn naming(self, record_type: RecordType) -> Self {
        match self {
            Self::Database(db::error::Error::RecordNotFound) => Self::MissingRecord { record_type },
            _ => self,
        }
    }

    pub(super) fn forbidden(message: impl ToString) -> Self {
        Self::Permission {
            message: message.to_string(),
        }
    }
}

/// Parses an id sent as text (form field, query parameter or path segment).
pub(super) fn parse_id(raw: Option<&str>) -> Result<i32> {
    let raw = raw.map(str::trim).unwrap_or_default();

    if raw.is_empty() {
        return Err(Error::MissingId);
    }

    raw.parse().map_err(|_| Error::InvalidId {
        raw: raw.to_string(),
    })
}

impl From<JsonRejection> for Error {
    fn from(err: JsonRejection) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(err: QueryRejection) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<FormRejection> for Error {
    fn from(err: FormRejection) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(err: PathRejection) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<axum::extract::multipart::MultipartRejection> for Error {
    fn from(err: axum::extract::multipart::MultipartRejection) -> Self {
        Self::MalformedRequest {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<deadpool::PoolError> for Error {
    fn from(err: deadpool::PoolError) -> Self {
        Self::Database(db::error::Error::from(err))
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(db::error::Error::from(err))
    }
}

impl From<garde::Report> for Error {
    fn from(err: garde::Report) -> Self {
        Self::SimpleData {
            reason: format!("{err:#}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
        }

        self.log();

        (
            self.status_code(),
            axum::Json(ErrorResponse {
                success: false,
                message: self.public_message(),
            }),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
