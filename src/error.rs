use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::billing::error::BillingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation error")]
    Validation(Vec<String>),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("404 {what} not found")),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors.join("\n")),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_owned(),
                )
            }
        };

        (status, body).into_response()
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::NotFound(kind) => Self::NotFound(kind.into()),
            BillingError::InvalidKey(kind) => Self::BadRequest(format!("invalid {kind} id")),
            BillingError::Validation(errors) => Self::Validation(errors),
            BillingError::Db(e) => Self::from(e),
            BillingError::Blob(e) => Self::from(e),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("resource".into()),
            _ => Self::Internal(err.into()),
        }
    }
}

impl From<opendal::Error> for AppError {
    fn from(err: opendal::Error) -> Self {
        if err.kind() == opendal::ErrorKind::NotFound {
            return Self::NotFound("blob".into());
        }
        Self::Internal(err.into())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::from(BillingError::NotFound("bill"));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_key_maps_to_400() {
        let err = AppError::from(BillingError::InvalidKey("company"));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_keeps_every_message() {
        let err = AppError::from(BillingError::Validation(vec![
            "Name must be valid".into(),
            "You must select a company".into(),
        ]));
        match err {
            AppError::Validation(ref msgs) => assert_eq!(msgs.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(
            status_of(AppError::from(sqlx::Error::RowNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn other_db_errors_map_to_500() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn blob_not_found_maps_to_404() {
        let err = opendal::Error::new(opendal::ErrorKind::NotFound, "missing");
        assert_eq!(status_of(AppError::from(err)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn template_errors_map_to_500() {
        let err = minijinja::Error::new(minijinja::ErrorKind::TemplateNotFound, "missing.html");
        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::Internal(_)));
        assert_eq!(status_of(app_err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
