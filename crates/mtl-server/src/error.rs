use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use mtl_chain::{ChainError, RpcError, RpcErrorKind, RpcResponse};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error half of a handler result, rendered as the `{"error": ..}` envelope.
#[derive(Debug)]
pub struct ApiError(pub RpcError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(RpcError::new(RpcErrorKind::BadRequest, message))
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        Self(RpcError::from(&err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(RpcResponse::<()>::Error(self.0))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<RpcResponse<T>>, ApiError>;
