// Copyright 2023 Remi Bernotavicius

use super::auth::{CurrentUser, MaybeUser};
use super::{Payload, SharedState};
use crate::database::models::UserId;
use crate::error::ApiError;
use crate::query::relations::{self, Relation};
use crate::query::users::{self, Registration, SubscriptionEntry, UserProfile};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct RecipesLimit {
    recipes_limit: Option<i64>,
}

pub async fn register(
    State(state): State<SharedState>,
    Payload(registration): Payload<Registration>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    registration.validate()?;
    let password = registration.password.clone();
    let hashed = tokio::task::spawn_blocking(move || users::hash_password(&password)).await??;

    let mut conn = state.db.lock().await;
    let user = users::insert_user(&mut conn, &registration, &hashed, false)?;
    Ok((
        StatusCode::CREATED,
        Json(users::profile(&mut conn, &user, None)?),
    ))
}

pub async fn list(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let viewer = viewer.map(|u| u.id);
    let mut conn = state.db.lock().await;
    let all = users::list_users(&mut conn)?;
    let profiles: Vec<UserProfile> = all
        .iter()
        .map(|user| users::profile(&mut conn, user, viewer))
        .collect::<Result<_, ApiError>>()?;
    Ok(Json(profiles))
}

pub async fn me(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(users::profile(&mut conn, &user, Some(user.id))?))
}

pub async fn detail(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>, ApiError> {
    let mut conn = state.db.lock().await;
    let user = users::get_user(&mut conn, id)?;
    Ok(Json(users::profile(
        &mut conn,
        &user,
        viewer.map(|u| u.id),
    )?))
}

pub async fn subscribe(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(author): Path<UserId>,
    Query(params): Query<RecipesLimit>,
) -> Result<(StatusCode, Json<SubscriptionEntry>), ApiError> {
    let mut conn = state.db.lock().await;
    relations::create_relation(&mut conn, user.id, Relation::Subscription(author))?;
    let author = users::get_user(&mut conn, author)?;
    let entry = users::subscription_entry(&mut conn, &author, Some(user.id), params.recipes_limit)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn unsubscribe(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(author): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.lock().await;
    relations::delete_relation(&mut conn, user.id, Relation::Subscription(author))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscriptions(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Query(params): Query<RecipesLimit>,
) -> Result<Json<Vec<SubscriptionEntry>>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(users::subscriptions(
        &mut conn,
        user.id,
        params.recipes_limit,
    )?))
}
