//! Mapping from domain errors to HTTP responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{DataError, Error};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Data(DataError::NotFound { .. }) => Self::not_found(err.to_string()),
            Error::Data(DataError::Conflict { .. }) => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            Error::Data(DataError::Invalid(msg)) => Self::unprocessable(msg),
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        Error::Data(err).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_data_errors_to_client_statuses() {
        assert_eq!(
            ApiError::from(Error::not_found("User", 1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::invalid("bad")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let conflict = DataError::Conflict {
            entity: "User",
            field: "email",
            value: "a@b.io".into(),
        };
        assert_eq!(ApiError::from(conflict).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn hides_internal_details() {
        let err = ApiError::from(Error::storage("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }
}
