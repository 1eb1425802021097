use axum::{
    extract::{FromRequest, FromRequestParts, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deepseq_core::model::record::{BatchOutcome, BatchStatus, RecordSummary};
use garde::Validate;
use serde::Serialize;

use super::error::{Error, Result};

pub(super) struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: Validate,
    <T as Validate>::Context: std::default::Default,
{
    type Rejection = Error;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let axum::Json(data) = axum::Json::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(Self(data))
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub(super) struct Query<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub(super) struct Path<T>(pub T);

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// The `{success, message?, data?}` response of the resource endpoints.
#[derive(Debug)]
pub(super) struct Outcome<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T> Outcome<T> {
    pub(super) fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub(super) fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: true,
                message: None,
                data: Some(data),
            },
        }
    }
}

impl Outcome<()> {
    pub(super) fn done() -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                message: None,
                data: None,
            },
        }
    }
}

impl Outcome<Vec<RecordSummary>> {
    /// A partial batch still succeeds, with `partial_message` warning about the rejected rows.
    /// A batch where nothing was accepted is a bad request.
    pub(super) fn from_batch(
        batch: BatchOutcome<RecordSummary>,
        status: StatusCode,
        partial_message: &str,
    ) -> Self {
        let batch_status = batch.status();

        let (status, success, message) = match batch_status {
            BatchStatus::Complete => (status, true, None),
            BatchStatus::Partial => (status, true, Some(partial_message.to_string())),
            BatchStatus::Failed => (
                StatusCode::BAD_REQUEST,
                false,
                Some("Invalid payload.".to_string()),
            ),
        };

        Self {
            status,
            envelope: Envelope {
                success,
                message,
                data: (batch_status != BatchStatus::Failed).then_some(batch.accepted),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        let Self { status, envelope } = self;

        (status, axum::Json(envelope)).into_response()
    }
}

/// Placeholder body for lifecycle responses that carry nothing beyond `success` and `error`.
#[derive(Debug, Default, Serialize)]
pub(super) struct NoBody {}

#[derive(Debug, Default, Serialize)]
pub(super) struct Data<T> {
    pub data: T,
}

/// The `{success, error, ...}` response of the request lifecycle endpoints. Failures are
/// reported in `error` with HTTP 200.
#[derive(Debug, Serialize)]
pub(super) struct Lifecycle<T> {
    success: bool,
    error: String,
    #[serde(flatten)]
    body: T,
}

impl<T: Default> From<Result<T>> for Lifecycle<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(body) => Self {
                success: true,
                error: String::new(),
                body,
            },
            Err(err) => {
                err.log();

                Self {
                    success: false,
                    error: err.public_message(),
                    body: T::default(),
                }
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Lifecycle<T> {
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}
