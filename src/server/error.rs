use std::fmt::Display;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every failure a route can report. The cause is logged where the error is
/// created and never reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("bad request")]
    BadRequest,
    #[error("resource not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("unprocessable")]
    Unprocessable,
}

impl ApiError {
    pub fn status(self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn not_found(cause: impl Display) -> Self {
        tracing::warn!(%cause, "Reporting resource not found");
        ApiError::NotFound
    }

    pub fn unprocessable(cause: impl Display) -> Self {
        tracing::warn!(%cause, "Reporting unprocessable request");
        ApiError::Unprocessable
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ApiError::unprocessable(err),
            other => {
                tracing::warn!(cause = %other, "Rejecting malformed body");
                ApiError::BadRequest
            }
        }
    }
}

// non-integer ids never match a route
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::not_found(rejection)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::warn!(cause = %rejection, "Rejecting malformed query string");
        ApiError::BadRequest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn each_kind_renders_its_code_and_message() {
        let cases = [
            (ApiError::BadRequest, 400, "bad request"),
            (ApiError::NotFound, 404, "resource not found"),
            (ApiError::MethodNotAllowed, 405, "method not allowed"),
            (ApiError::Unprocessable, 422, "unprocessable"),
        ];
        for (error, code, message) in cases {
            let (status, body) = body_json(error).await;
            assert_eq!(status.as_u16(), code);
            assert_eq!(
                body,
                json!({"success": false, "error": code, "message": message})
            );
        }
    }

    #[test]
    fn helpers_keep_their_kind() {
        assert_eq!(ApiError::not_found("row missing"), ApiError::NotFound);
        assert_eq!(ApiError::unprocessable("constraint"), ApiError::Unprocessable);
    }
}
