use super::catalog;
use super::relations::{self, Relation};
use super::users::{self, UserProfile};
use crate::config::Limits;
use crate::database;
use crate::database::models::{
    AmountIngredient, Ingredient, IngredientId, NewAmountIngredient, NewRecipe, Recipe,
    RecipeChanges, RecipeId, RecipeSummary, RecipeTag, Tag, TagId, User, UserId,
};
use crate::error::{is_unique_violation, ApiError};
use crate::validators::{self, RawIngredient};
use diesel::prelude::Connection as _;
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Deserialize, Debug, Clone)]
pub struct RecipeRequest {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<RawIngredient>,
}

/// A partial update. Absent fields are left as they are; `tags` and
/// `ingredients`, when present, replace the whole set and must not be empty.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<RawIngredient>>,
}

fn check_name(value: &str) -> Result<(), validators::ValidationError> {
    validators::check_required(value, "name")?;
    validators::check_length(value, "name", 1, 80)
}

fn check_text(value: &str) -> Result<(), validators::ValidationError> {
    validators::check_required(value, "text")?;
    validators::check_length(value, "text", 1, 500)
}

fn check_image(value: &str) -> Result<(), validators::ValidationError> {
    validators::check_required(value, "image")
}

fn ensure_can_modify(actor: &User, recipe: &Recipe) -> Result<(), ApiError> {
    if actor.id != recipe.author_id && !actor.is_superuser {
        return Err(ApiError::Forbidden("you cannot modify another user's recipe"));
    }
    Ok(())
}

fn name_taken(
    conn: &mut database::Connection,
    author: UserId,
    recipe_name: &str,
    except: Option<RecipeId>,
) -> Result<bool, ApiError> {
    use database::schema::recipes::dsl::*;

    let matching: Vec<RecipeId> = recipes
        .select(id)
        .filter(author_id.eq(author))
        .filter(name.eq(recipe_name))
        .load(conn)?;
    Ok(matching.into_iter().any(|m| Some(m) != except))
}

fn replace_tags(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_tags: &[Tag],
) -> Result<(), ApiError> {
    use database::schema::recipe_tags::dsl::*;

    diesel::delete(recipe_tags.filter(recipe_id.eq(recipe))).execute(conn)?;
    let rows: Vec<RecipeTag> = new_tags
        .iter()
        .map(|t| RecipeTag {
            recipe_id: recipe,
            tag_id: t.id,
        })
        .collect();
    diesel::insert_into(recipe_tags).values(&rows).execute(conn)?;
    Ok(())
}

/// Drops the recipe's ingredient rows and writes the new set in one statement.
fn replace_ingredients(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_ingredients: &BTreeMap<IngredientId, (Ingredient, i32)>,
) -> Result<(), ApiError> {
    use database::schema::amount_ingredients::dsl::*;

    diesel::delete(amount_ingredients.filter(recipe_id.eq(recipe))).execute(conn)?;
    let rows: Vec<NewAmountIngredient> = new_ingredients
        .iter()
        .map(|(&ingredient, &(_, new_amount))| NewAmountIngredient {
            recipe_id: recipe,
            ingredient_id: ingredient,
            amount: new_amount,
        })
        .collect();
    diesel::insert_into(amount_ingredients)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

pub fn create_recipe(
    conn: &mut database::Connection,
    author: &User,
    request: &RecipeRequest,
    limits: &Limits,
) -> Result<RecipeId, ApiError> {
    let new_name = request.name.trim();
    check_name(new_name)?;
    check_text(&request.text)?;
    check_image(&request.image)?;
    let minutes = validators::check_cooking_time(request.cooking_time, limits)?;

    conn.transaction(|conn| {
        let new_tags = catalog::resolve_tags(conn, &request.tags)?;
        let new_ingredients = catalog::resolve_ingredients(conn, &request.ingredients, limits)?;
        if name_taken(conn, author.id, new_name, None)? {
            return Err(ApiError::DuplicateRecipe(new_name.into()));
        }

        use database::schema::recipes::dsl::*;

        let inserted = diesel::insert_into(recipes)
            .values(NewRecipe {
                author_id: author.id,
                name: new_name,
                text: &request.text,
                image: &request.image,
                cooking_time: minutes,
                pub_date: chrono::Utc::now().naive_utc(),
            })
            .execute(conn);
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ApiError::DuplicateRecipe(new_name.into()))
            }
            Err(e) => return Err(e.into()),
        }

        let new_id: RecipeId = recipes
            .select(id)
            .filter(author_id.eq(author.id))
            .filter(name.eq(new_name))
            .first(conn)?;
        replace_tags(conn, new_id, &new_tags)?;
        replace_ingredients(conn, new_id, &new_ingredients)?;

        log::info!("{} created recipe {new_id} {new_name:?}", author.username);
        Ok(new_id)
    })
}

pub fn get_recipe(conn: &mut database::Connection, recipe: RecipeId) -> Result<Recipe, ApiError> {
    use database::schema::recipes::dsl::*;

    Ok(recipes
        .find(recipe)
        .select(Recipe::as_select())
        .get_result(conn)?)
}

pub fn recipe_summary(
    conn: &mut database::Connection,
    recipe: RecipeId,
) -> Result<RecipeSummary, ApiError> {
    use database::schema::recipes::dsl::*;

    Ok(recipes
        .find(recipe)
        .select(RecipeSummary::as_select())
        .get_result(conn)?)
}

pub fn update_recipe(
    conn: &mut database::Connection,
    actor: &User,
    recipe: RecipeId,
    update: &RecipeUpdate,
    limits: &Limits,
) -> Result<(), ApiError> {
    conn.transaction(|conn| {
        // Existence and ownership are decided before the payload is looked at.
        let existing = get_recipe(conn, recipe)?;
        ensure_can_modify(actor, &existing)?;

        let new_name = update.name.as_deref().map(str::trim);
        if let Some(new_name) = new_name {
            check_name(new_name)?;
        }
        if let Some(new_text) = &update.text {
            check_text(new_text)?;
        }
        if let Some(new_image) = &update.image {
            check_image(new_image)?;
        }
        let minutes = update
            .cooking_time
            .map(|m| validators::check_cooking_time(m, limits))
            .transpose()?;

        let new_tags = match &update.tags {
            Some(raw) => Some(catalog::resolve_tags(conn, raw)?),
            None => None,
        };
        let new_ingredients = match &update.ingredients {
            Some(raw) => Some(catalog::resolve_ingredients(conn, raw, limits)?),
            None => None,
        };
        if let Some(new_name) = new_name {
            if name_taken(conn, existing.author_id, new_name, Some(recipe))? {
                return Err(ApiError::DuplicateRecipe(new_name.into()));
            }
        }

        let changes = RecipeChanges {
            name: new_name,
            text: update.text.as_deref(),
            image: update.image.as_deref(),
            cooking_time: minutes,
        };
        if !changes.is_empty() {
            use database::schema::recipes::dsl::*;

            match diesel::update(recipes.find(recipe)).set(changes).execute(conn) {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(ApiError::DuplicateRecipe(
                        new_name.unwrap_or_default().into(),
                    ))
                }
                Err(e) => return Err(e.into()),
            }
        }
        if let Some(new_tags) = new_tags {
            replace_tags(conn, recipe, &new_tags)?;
        }
        if let Some(new_ingredients) = new_ingredients {
            replace_ingredients(conn, recipe, &new_ingredients)?;
        }

        log::info!("{} updated recipe {recipe}", actor.username);
        Ok(())
    })
}

pub fn delete_recipe(
    conn: &mut database::Connection,
    actor: &User,
    recipe: RecipeId,
) -> Result<(), ApiError> {
    use database::schema::recipes::dsl::*;

    let existing = get_recipe(conn, recipe)?;
    ensure_can_modify(actor, &existing)?;
    diesel::delete(recipes.find(recipe)).execute(conn)?;
    log::info!("{} deleted recipe {recipe}", actor.username);
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub author: Option<UserId>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Newest first. The favourite and cart filters only apply for a known viewer.
pub fn list_recipes(
    conn: &mut database::Connection,
    filter: &RecipeFilter,
    viewer: Option<UserId>,
) -> Result<Vec<Recipe>, ApiError> {
    use database::schema::{favourites, recipe_tags, recipes, shopping_carts, tags};

    let mut query = recipes::table
        .select(Recipe::as_select())
        .order_by((recipes::pub_date.desc(), recipes::id.desc()))
        .into_boxed();

    if !filter.tags.is_empty() {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .inner_join(tags::table)
                    .filter(tags::slug.eq_any(&filter.tags))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }
    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author));
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query = query.filter(
                recipes::id.eq_any(
                    favourites::table
                        .filter(favourites::user_id.eq(viewer))
                        .select(favourites::recipe_id),
                ),
            );
        }
        if filter.is_in_shopping_cart {
            query = query.filter(
                recipes::id.eq_any(
                    shopping_carts::table
                        .filter(shopping_carts::user_id.eq(viewer))
                        .select(shopping_carts::recipe_id),
                ),
            );
        }
    }

    Ok(query.load(conn)?)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeDetail {
    pub id: RecipeId,
    pub author: UserProfile,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub tags: Vec<Tag>,
    pub cooking_time: i32,
    pub text: String,
    pub image: String,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub fn recipe_detail(
    conn: &mut database::Connection,
    recipe: Recipe,
    viewer: Option<UserId>,
) -> Result<RecipeDetail, ApiError> {
    use database::schema::{amount_ingredients, ingredients, recipe_tags, tags};

    let author = users::get_user(conn, recipe.author_id)?;
    let author = users::profile(conn, &author, viewer)?;

    let recipe_ingredients = AmountIngredient::belonging_to(&recipe)
        .inner_join(ingredients::table)
        .select((AmountIngredient::as_select(), Ingredient::as_select()))
        .order_by((ingredients::name, amount_ingredients::id))
        .load::<(AmountIngredient, Ingredient)>(conn)?
        .into_iter()
        .map(|(usage, ingredient)| RecipeIngredient {
            id: usage.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount: usage.amount,
        })
        .collect();

    let recipe_tag_list = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq(recipe.id))
        .select(Tag::as_select())
        .order_by(tags::name)
        .load(conn)?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            relations::relation_exists(conn, viewer, Relation::Favourite(recipe.id))?,
            relations::relation_exists(conn, viewer, Relation::ShoppingCart(recipe.id))?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        author,
        name: recipe.name,
        ingredients: recipe_ingredients,
        tags: recipe_tag_list,
        cooking_time: recipe.cooking_time,
        text: recipe.text,
        image: recipe.image,
        is_favorited,
        is_in_shopping_cart,
    })
}

#[cfg(test)]
struct Kitchen {
    conn: database::Connection,
    author: User,
    other: User,
    salt: Ingredient,
    flour: Ingredient,
    breakfast: Tag,
    dinner: Tag,
}

#[cfg(test)]
impl Kitchen {
    fn new() -> Self {
        use super::fixtures;

        let mut conn = database::in_memory();
        let author = fixtures::user(&mut conn, "author");
        let other = fixtures::user(&mut conn, "other");
        let salt = fixtures::ingredient(&mut conn, "Salt", "g");
        let flour = fixtures::ingredient(&mut conn, "Flour", "g");
        let breakfast = fixtures::tag(&mut conn, "Breakfast", "#E26C2D");
        let dinner = fixtures::tag(&mut conn, "Dinner", "#49B64E");
        Self {
            conn,
            author,
            other,
            salt,
            flour,
            breakfast,
            dinner,
        }
    }

    fn count_amounts(&mut self, recipe: RecipeId) -> i64 {
        use database::schema::amount_ingredients::dsl::*;

        amount_ingredients
            .filter(recipe_id.eq(recipe))
            .count()
            .get_result(&mut self.conn)
            .unwrap()
    }
}

#[test]
fn create_and_read_back() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let request = fixtures::recipe_request(
        "Pancakes",
        &[&k.breakfast],
        &[(&k.flour, 200), (&k.salt, 2)],
    );
    let id = create_recipe(&mut k.conn, &k.author, &request, &Limits::default()).unwrap();

    let recipe = get_recipe(&mut k.conn, id).unwrap();
    let detail = recipe_detail(&mut k.conn, recipe, None).unwrap();
    assert_eq!(detail.name, "Pancakes");
    assert_eq!(detail.author.username, "author");
    assert_eq!(detail.tags, vec![k.breakfast.clone()]);
    // Alphabetical, although salt has the lower id.
    assert!(k.salt.id < k.flour.id);
    assert_eq!(
        detail.ingredients,
        vec![
            RecipeIngredient {
                id: k.flour.id,
                name: "Flour".into(),
                measurement_unit: "g".into(),
                amount: 200,
            },
            RecipeIngredient {
                id: k.salt.id,
                name: "Salt".into(),
                measurement_unit: "g".into(),
                amount: 2,
            },
        ]
    );
    assert!(!detail.is_favorited);
    assert!(!detail.is_in_shopping_cart);
}

#[test]
fn create_rejects_bad_payloads() {
    use super::fixtures;
    use crate::validators::ValidationError;

    let mut k = Kitchen::new();
    let limits = Limits::default();

    let zero = fixtures::recipe_request("Soup", &[&k.dinner], &[(&k.salt, 0)]);
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &zero, &limits),
        Err(ApiError::Validation(ValidationError::AmountTooSmall { .. }))
    ));

    let duplicate = fixtures::recipe_request("Soup", &[&k.dinner], &[(&k.salt, 1), (&k.salt, 2)]);
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &duplicate, &limits),
        Err(ApiError::Validation(ValidationError::DuplicateIngredient(_)))
    ));

    let mut unknown_tag = fixtures::recipe_request("Soup", &[&k.dinner], &[(&k.salt, 1)]);
    unknown_tag.tags.push(TagId(9999));
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &unknown_tag, &limits),
        Err(ApiError::Validation(ValidationError::UnknownTag))
    ));

    let mut too_slow = fixtures::recipe_request("Soup", &[&k.dinner], &[(&k.salt, 1)]);
    too_slow.cooking_time = 10_000;
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &too_slow, &limits),
        Err(ApiError::Validation(ValidationError::CookingTime { .. }))
    ));

    let no_ingredients = fixtures::recipe_request("Soup", &[&k.dinner], &[]);
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &no_ingredients, &limits),
        Err(ApiError::Validation(ValidationError::NoIngredients))
    ));

    // Nothing was written by the failed attempts.
    assert!(list_recipes(&mut k.conn, &RecipeFilter::default(), None)
        .unwrap()
        .is_empty());
}

#[test]
fn recipe_names_are_unique_per_author() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let limits = Limits::default();
    let request = fixtures::recipe_request("Soup", &[&k.dinner], &[(&k.salt, 1)]);

    create_recipe(&mut k.conn, &k.author, &request, &limits).unwrap();
    assert!(matches!(
        create_recipe(&mut k.conn, &k.author, &request, &limits),
        Err(ApiError::DuplicateRecipe(n)) if n == "Soup"
    ));
    // Another author may reuse the name.
    create_recipe(&mut k.conn, &k.other, &request, &limits).unwrap();
}

#[test]
fn update_replaces_sets_and_scalars() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let limits = Limits::default();
    let id = fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Soup",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5), (&k.flour.clone(), 10)],
    );

    let update = RecipeUpdate {
        name: Some("Better soup".into()),
        cooking_time: Some(45),
        tags: Some(vec![k.breakfast.id, k.dinner.id]),
        ingredients: Some(vec![RawIngredient {
            id: k.flour.id,
            amount: 300,
        }]),
        ..Default::default()
    };
    update_recipe(&mut k.conn, &k.author, id, &update, &limits).unwrap();

    let recipe = get_recipe(&mut k.conn, id).unwrap();
    assert_eq!(recipe.name, "Better soup");
    assert_eq!(recipe.cooking_time, 45);
    assert_eq!(recipe.text, "How to cook Soup");
    let detail = recipe_detail(&mut k.conn, recipe, None).unwrap();
    assert_eq!(detail.tags.len(), 2);
    assert_eq!(detail.ingredients.len(), 1);
    assert_eq!(detail.ingredients[0].amount, 300);
    assert_eq!(k.count_amounts(id), 1);
}

#[test]
fn update_ingredient_policy() {
    use super::fixtures;
    use crate::validators::ValidationError;

    let mut k = Kitchen::new();
    let limits = Limits::default();
    let id = fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Soup",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5), (&k.flour.clone(), 10)],
    );

    // Leaving ingredients out keeps them.
    let rename = RecipeUpdate {
        text: Some("Stir well".into()),
        ..Default::default()
    };
    update_recipe(&mut k.conn, &k.author, id, &rename, &limits).unwrap();
    assert_eq!(k.count_amounts(id), 2);

    // An explicit empty list is refused and changes nothing.
    let emptied = RecipeUpdate {
        text: Some("Nothing left".into()),
        ingredients: Some(vec![]),
        ..Default::default()
    };
    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, id, &emptied, &limits),
        Err(ApiError::Validation(ValidationError::NoIngredients))
    ));
    assert_eq!(k.count_amounts(id), 2);
    assert_eq!(get_recipe(&mut k.conn, id).unwrap().text, "Stir well");

    let no_tags = RecipeUpdate {
        tags: Some(vec![]),
        ..Default::default()
    };
    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, id, &no_tags, &limits),
        Err(ApiError::Validation(ValidationError::NoTags))
    ));
}

#[test]
fn only_the_author_may_modify() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let limits = Limits::default();
    let id = fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Soup",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5)],
    );
    fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Stew",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5)],
    );

    let update = RecipeUpdate {
        name: Some("Stolen".into()),
        ..Default::default()
    };
    assert!(matches!(
        update_recipe(&mut k.conn, &k.other, id, &update, &limits),
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        delete_recipe(&mut k.conn, &k.other, id),
        Err(ApiError::Forbidden(_))
    ));

    let clash = RecipeUpdate {
        name: Some("Stew".into()),
        ..Default::default()
    };
    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, id, &clash, &limits),
        Err(ApiError::DuplicateRecipe(_))
    ));

    let mut admin = k.other.clone();
    admin.is_superuser = true;
    update_recipe(&mut k.conn, &admin, id, &update, &limits).unwrap();
    assert_eq!(get_recipe(&mut k.conn, id).unwrap().name, "Stolen");

    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, RecipeId(9999), &update, &limits),
        Err(ApiError::NotFound)
    ));
}

#[test]
fn ownership_is_checked_before_the_payload() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let limits = Limits::default();
    let id = fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Soup",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5)],
    );
    let invalid = RecipeUpdate {
        cooking_time: Some(0),
        ..Default::default()
    };

    assert!(matches!(
        update_recipe(&mut k.conn, &k.other, id, &invalid, &limits),
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, RecipeId(9999), &invalid, &limits),
        Err(ApiError::NotFound)
    ));
    assert!(matches!(
        update_recipe(&mut k.conn, &k.author, id, &invalid, &limits),
        Err(ApiError::Validation(_))
    ));
}

#[test]
fn deleting_cascades_to_relations() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let id = fixtures::recipe(
        &mut k.conn,
        &k.author.clone(),
        "Soup",
        &[&k.dinner.clone()],
        &[(&k.salt.clone(), 5)],
    );
    relations::create_relation(&mut k.conn, k.other.id, Relation::Favourite(id)).unwrap();
    relations::create_relation(&mut k.conn, k.other.id, Relation::ShoppingCart(id)).unwrap();

    delete_recipe(&mut k.conn, &k.author, id).unwrap();
    assert!(matches!(get_recipe(&mut k.conn, id), Err(ApiError::NotFound)));
    assert_eq!(k.count_amounts(id), 0);

    let favourites: i64 = database::schema::favourites::table
        .count()
        .get_result(&mut k.conn)
        .unwrap();
    let carts: i64 = database::schema::shopping_carts::table
        .count()
        .get_result(&mut k.conn)
        .unwrap();
    assert_eq!((favourites, carts), (0, 0));
}

#[test]
fn listing_filters() {
    use super::fixtures;

    let mut k = Kitchen::new();
    let (author, other) = (k.author.clone(), k.other.clone());
    let (breakfast, dinner, salt) = (k.breakfast.clone(), k.dinner.clone(), k.salt.clone());

    let porridge = fixtures::recipe(&mut k.conn, &author, "Porridge", &[&breakfast], &[(&salt, 1)]);
    let soup = fixtures::recipe(&mut k.conn, &author, "Soup", &[&dinner], &[(&salt, 5)]);
    let omelette = fixtures::recipe(
        &mut k.conn,
        &other,
        "Omelette",
        &[&breakfast, &dinner],
        &[(&salt, 1)],
    );
    let ids = |recipes: Vec<Recipe>| recipes.into_iter().map(|r| r.id).collect::<Vec<_>>();

    let all = list_recipes(&mut k.conn, &RecipeFilter::default(), None).unwrap();
    assert_eq!(ids(all), vec![omelette, soup, porridge]);

    let filter = RecipeFilter {
        tags: vec!["breakfast".into()],
        ..Default::default()
    };
    assert_eq!(
        ids(list_recipes(&mut k.conn, &filter, None).unwrap()),
        vec![omelette, porridge]
    );

    let filter = RecipeFilter {
        tags: vec!["breakfast".into(), "dinner".into()],
        author: Some(author.id),
        ..Default::default()
    };
    assert_eq!(
        ids(list_recipes(&mut k.conn, &filter, None).unwrap()),
        vec![soup, porridge]
    );

    relations::create_relation(&mut k.conn, other.id, Relation::Favourite(soup)).unwrap();
    relations::create_relation(&mut k.conn, other.id, Relation::ShoppingCart(porridge)).unwrap();
    let favourites = RecipeFilter {
        is_favorited: true,
        ..Default::default()
    };
    assert_eq!(
        ids(list_recipes(&mut k.conn, &favourites, Some(other.id)).unwrap()),
        vec![soup]
    );
    // Ignored for anonymous viewers.
    assert_eq!(
        list_recipes(&mut k.conn, &favourites, None).unwrap().len(),
        3
    );
    let cart = RecipeFilter {
        is_in_shopping_cart: true,
        ..Default::default()
    };
    assert_eq!(
        ids(list_recipes(&mut k.conn, &cart, Some(other.id)).unwrap()),
        vec![porridge]
    );

    let soup_row = get_recipe(&mut k.conn, soup).unwrap();
    let detail = recipe_detail(&mut k.conn, soup_row, Some(other.id)).unwrap();
    assert!(detail.is_favorited);
    assert!(!detail.is_in_shopping_cart);
    assert_eq!(recipe_summary(&mut k.conn, soup).unwrap().name, "Soup");
}
