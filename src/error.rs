// Copyright 2023 Remi Bernotavicius

use crate::query::relations::RelationKind;
use crate::validators::ValidationError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} already exists")]
    RelationExists(RelationKind),

    #[error("{0} does not exist")]
    RelationMissing(RelationKind),

    #[error("a recipe named {0:?} already exists for this author")]
    DuplicateRecipe(String),

    #[error("{0}")]
    Conflict(String),

    #[error("malformed query: {0}")]
    BadQuery(String),

    #[error("malformed request body: {0}")]
    BadPayload(String),

    #[error("unable to log in with provided credentials")]
    BadCredentials,

    #[error("the shopping cart is empty")]
    EmptyShoppingCart,

    #[error("authentication credentials were not provided")]
    Unauthenticated,

    #[error("invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::RelationExists(_)
            | Self::RelationMissing(_)
            | Self::DuplicateRecipe(_)
            | Self::Conflict(_)
            | Self::BadQuery(_)
            | Self::BadPayload(_)
            | Self::BadCredentials
            | Self::EmptyShoppingCart => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Hash(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => Self::NotFound,
            e => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadPayload(rejection.body_text())
    }
}

/// True when `e` is the store rejecting a row that breaks a UNIQUE constraint.
pub fn is_unique_violation(e: &DieselError) -> bool {
    matches!(
        e,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("request rejected ({status}): {self}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[test]
fn status_codes() {
    assert_eq!(
        ApiError::from(ValidationError::NoTags).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::RelationExists(RelationKind::Favourite).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(ApiError::Forbidden("nope").status(), StatusCode::FORBIDDEN);
    assert_eq!(
        ApiError::BadPayload("missing field `tags`".into()).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::from(DieselError::NotFound).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        ApiError::from(DieselError::RollbackTransaction).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
