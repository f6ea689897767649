// Copyright 2023 Remi Bernotavicius

//! Token authentication. Clients send `Authorization: Token <key>`; a missing
//! header means an anonymous request, anything else that doesn't resolve to
//! an active user is rejected with 401.

use super::{Payload, SharedState};
use crate::database::models::User;
use crate::error::ApiError;
use crate::query::users;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

fn presented_token(parts: &Parts) -> Result<Option<String>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;
    match value.split_once(' ') {
        Some(("Token", key)) if !key.trim().is_empty() => Ok(Some(key.trim().to_owned())),
        _ => Err(ApiError::InvalidToken),
    }
}

async fn resolve(state: &SharedState, token: &str) -> Result<User, ApiError> {
    let mut conn = state.db.lock().await;
    match users::user_for_token(&mut conn, token)? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ApiError::InvalidToken),
    }
}

/// The requesting user, if the request carried a token.
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        match presented_token(parts)? {
            Some(token) => Ok(Self(Some(resolve(state, &token).await?))),
            None => Ok(Self(None)),
        }
    }
}

/// The requesting user; anonymous requests are rejected.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)?.ok_or(ApiError::Unauthenticated)?;
        let user = resolve(state, &token).await?;
        Ok(Self { user, token })
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<SharedState>,
    Payload(credentials): Payload<Credentials>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = {
        let mut conn = state.db.lock().await;
        users::find_login_user(&mut conn, &credentials.email)?
    };
    // The connection is free while bcrypt runs.
    let user = tokio::task::spawn_blocking(move || {
        users::check_password(&user, &credentials.password).map(|()| user)
    })
    .await??;

    let mut conn = state.db.lock().await;
    let key = users::issue_token(&mut conn, &user)?;
    Ok(Json(serde_json::json!({ "auth_token": key })))
}

pub async fn logout(
    State(state): State<SharedState>,
    CurrentUser { user, token }: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.lock().await;
    users::logout(&mut conn, &token)?;
    log::info!("{} logged out", user.username);
    Ok(StatusCode::NO_CONTENT)
}
