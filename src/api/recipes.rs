// Copyright 2023 Remi Bernotavicius

use super::auth::{CurrentUser, MaybeUser};
use super::{Payload, SharedState};
use crate::database::models::{RecipeId, RecipeSummary, UserId};
use crate::error::ApiError;
use crate::query::recipes::{self, RecipeDetail, RecipeFilter, RecipeRequest, RecipeUpdate};
use crate::query::relations::{self, Relation};
use crate::query::shopping_list;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}

/// `?tags=a&tags=b&author=3&is_favorited=1&is_in_shopping_cart=0`
fn parse_filter(query: Option<&str>) -> Result<RecipeFilter, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or_default())
        .map_err(|e| ApiError::BadQuery(e.to_string()))?;

    let mut filter = RecipeFilter::default();
    for (key, value) in pairs {
        match key.as_str() {
            "tags" => filter.tags.push(value),
            "author" => {
                let author: i32 = value
                    .parse()
                    .map_err(|_| ApiError::BadQuery(format!("author {value:?} is not an id")))?;
                filter.author = Some(UserId(author));
            }
            "is_favorited" => filter.is_favorited = flag(&value),
            "is_in_shopping_cart" => filter.is_in_shopping_cart = flag(&value),
            _ => {}
        }
    }
    Ok(filter)
}

pub async fn list(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<RecipeDetail>>, ApiError> {
    let filter = parse_filter(query.as_deref())?;
    let viewer = viewer.map(|u| u.id);

    let mut conn = state.db.lock().await;
    let found = recipes::list_recipes(&mut conn, &filter, viewer)?;
    let details: Vec<RecipeDetail> = found
        .into_iter()
        .map(|recipe| recipes::recipe_detail(&mut conn, recipe, viewer))
        .collect::<Result<_, ApiError>>()?;
    Ok(Json(details))
}

pub async fn create(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Payload(request): Payload<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let mut conn = state.db.lock().await;
    let id = recipes::create_recipe(&mut conn, &user, &request, &state.config.limits)?;
    let recipe = recipes::get_recipe(&mut conn, id)?;
    let detail = recipes::recipe_detail(&mut conn, recipe, Some(user.id))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn detail(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut conn = state.db.lock().await;
    let recipe = recipes::get_recipe(&mut conn, id)?;
    Ok(Json(recipes::recipe_detail(
        &mut conn,
        recipe,
        viewer.map(|u| u.id),
    )?))
}

pub async fn update(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
    Payload(update): Payload<RecipeUpdate>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut conn = state.db.lock().await;
    recipes::update_recipe(&mut conn, &user, id, &update, &state.config.limits)?;
    let recipe = recipes::get_recipe(&mut conn, id)?;
    Ok(Json(recipes::recipe_detail(&mut conn, recipe, Some(user.id))?))
}

pub async fn delete(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.lock().await;
    recipes::delete_recipe(&mut conn, &user, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add(
    state: &SharedState,
    user: UserId,
    relation: Relation,
    recipe: RecipeId,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    let mut conn = state.db.lock().await;
    relations::create_relation(&mut conn, user, relation)?;
    Ok((
        StatusCode::CREATED,
        Json(recipes::recipe_summary(&mut conn, recipe)?),
    ))
}

async fn remove(
    state: &SharedState,
    user: UserId,
    relation: Relation,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.lock().await;
    relations::delete_relation(&mut conn, user, relation)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn favorite(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    add(&state, user.id, Relation::Favourite(id), id).await
}

pub async fn unfavorite(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode, ApiError> {
    remove(&state, user.id, Relation::Favourite(id)).await
}

pub async fn add_to_cart(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    add(&state, user.id, Relation::ShoppingCart(id), id).await
}

pub async fn remove_from_cart(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode, ApiError> {
    remove(&state, user.id, Relation::ShoppingCart(id)).await
}

pub async fn download_shopping_cart(
    State(state): State<SharedState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.db.lock().await;
    if shopping_list::cart_is_empty(&mut conn, user.id)? {
        return Err(ApiError::EmptyShoppingCart);
    }
    let items = shopping_list::shopping_list(&mut conn, user.id)?;
    let text = shopping_list::render_shopping_list(&user.username, &items);

    let filename = format!("{}_id{}_shoplist.txt", user.username, user.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        text,
    ))
}

#[test]
fn filters_from_query_strings() {
    assert_eq!(parse_filter(None).unwrap(), RecipeFilter::default());
    let query = "tags=breakfast&tags=dinner&author=3&is_favorited=1&is_in_shopping_cart=0";
    assert_eq!(
        parse_filter(Some(query)).unwrap(),
        RecipeFilter {
            tags: vec!["breakfast".into(), "dinner".into()],
            author: Some(UserId(3)),
            is_favorited: true,
            is_in_shopping_cart: false,
        }
    );
    assert!(parse_filter(Some("is_in_shopping_cart=true&page=2"))
        .unwrap()
        .is_in_shopping_cart);
    assert!(matches!(
        parse_filter(Some("author=me")),
        Err(ApiError::BadQuery(_))
    ));
}
