use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jamroom_core::{ErrorKind, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyExists | ErrorKind::AlreadyMember | ErrorKind::DuplicateInQueue => {
                    StatusCode::CONFLICT
                }
                ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Store(err) => match err.kind() {
                ErrorKind::NotFound => "NOT_FOUND",
                ErrorKind::AlreadyExists => "ALREADY_EXISTS",
                ErrorKind::AlreadyMember => "ALREADY_MEMBER",
                ErrorKind::DuplicateInQueue => "DUPLICATE_IN_QUEUE",
                ErrorKind::UpstreamFailure => "UPSTREAM_FAILURE",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jamroom_core::{CatalogError, RoomError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StoreError::RoomNotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                StoreError::RoomAlreadyExists("x".into()),
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
            ),
            (
                StoreError::Room(RoomError::UserNotInRoom {
                    room: "x".into(),
                    user_id: "u".into(),
                }),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                StoreError::Room(RoomError::DuplicateInQueue {
                    room: "x".into(),
                    uri: "u".into(),
                }),
                StatusCode::CONFLICT,
                "DUPLICATE_IN_QUEUE",
            ),
            (
                StoreError::Upstream(CatalogError::RateLimited),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_FAILURE",
            ),
        ];

        for (err, status, code) in cases {
            let err = ApiError::from(err);
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }
}
