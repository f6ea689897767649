// Copyright 2023 Remi Bernotavicius

use super::auth::CurrentUser;
use super::{Payload, SharedState};
use crate::database::models::{Ingredient, IngredientId, Tag, TagId};
use crate::error::ApiError;
use crate::query::catalog::{self, TagRequest};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct IngredientSearch {
    name: Option<String>,
}

pub async fn ingredients(
    State(state): State<SharedState>,
    Query(search): Query<IngredientSearch>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(catalog::search_ingredients(
        &mut conn,
        search.name.as_deref(),
    )?))
}

pub async fn ingredient(
    State(state): State<SharedState>,
    Path(id): Path<IngredientId>,
) -> Result<Json<Ingredient>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(catalog::get_ingredient(&mut conn, id)?))
}

pub async fn tags(State(state): State<SharedState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(catalog::list_tags(&mut conn)?))
}

pub async fn tag(
    State(state): State<SharedState>,
    Path(id): Path<TagId>,
) -> Result<Json<Tag>, ApiError> {
    let mut conn = state.db.lock().await;
    Ok(Json(catalog::get_tag(&mut conn, id)?))
}

/// Tags are curated by administrators.
pub async fn create_tag(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Payload(request): Payload<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    if !user.is_superuser {
        return Err(ApiError::Forbidden("only administrators may create tags"));
    }
    let mut conn = state.db.lock().await;
    Ok((
        StatusCode::CREATED,
        Json(catalog::create_tag(&mut conn, &request)?),
    ))
}
