use crate::config::Limits;
use crate::database;
use crate::database::models::{Ingredient, IngredientId, NewIngredient, NewTag, Tag, TagId};
use crate::error::{is_unique_violation, ApiError};
use crate::validators::{self, RawIngredient, ValidationError};
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Deserialize;
use std::collections::BTreeMap;

pub fn get_ingredient(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
) -> Result<Ingredient, ApiError> {
    use database::schema::ingredients::dsl::*;

    Ok(ingredients
        .find(ingredient_id)
        .select(Ingredient::as_select())
        .get_result(conn)?)
}

/// Without a query this is the whole catalog. With one, names starting with
/// the query come first, then names only containing it; matching ignores case.
pub fn search_ingredients(
    conn: &mut database::Connection,
    query: Option<&str>,
) -> Result<Vec<Ingredient>, ApiError> {
    use database::schema::ingredients::dsl::*;

    let catalog = ingredients
        .select(Ingredient::as_select())
        .order_by((name, measurement_unit))
        .load(conn)?;

    let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(catalog);
    };
    // SQLite's LIKE only folds ASCII, so the matching happens here.
    let needle = needle.to_lowercase();

    let mut starting = vec![];
    let mut containing = vec![];
    for ingredient in catalog {
        let lowered = ingredient.name.to_lowercase();
        if lowered.starts_with(&needle) {
            starting.push(ingredient);
        } else if lowered.contains(&needle) {
            containing.push(ingredient);
        }
    }
    starting.extend(containing);
    Ok(starting)
}

pub fn get_or_create_ingredient(
    conn: &mut database::Connection,
    new_name: &str,
    new_unit: &str,
) -> Result<Ingredient, ApiError> {
    use database::schema::ingredients::dsl::*;

    let new_name = new_name.trim();
    let new_unit = new_unit.trim();
    validators::check_required(new_name, "ingredient name")?;
    validators::check_length(new_name, "ingredient name", 1, 40)?;
    validators::check_required(new_unit, "measurement unit")?;
    validators::check_length(new_unit, "measurement unit", 1, 40)?;

    let existing = ingredients
        .select(Ingredient::as_select())
        .filter(name.eq(new_name))
        .filter(measurement_unit.eq(new_unit))
        .get_result(conn)
        .optional()?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    diesel::insert_into(ingredients)
        .values(NewIngredient {
            name: new_name,
            measurement_unit: new_unit,
        })
        .execute(conn)?;

    Ok(ingredients
        .select(Ingredient::as_select())
        .filter(name.eq(new_name))
        .filter(measurement_unit.eq(new_unit))
        .get_result(conn)?)
}

/// Checks an ingredient payload and looks every id up in a single query.
pub fn resolve_ingredients(
    conn: &mut database::Connection,
    raw: &[RawIngredient],
    limits: &Limits,
) -> Result<BTreeMap<IngredientId, (Ingredient, i32)>, ApiError> {
    use database::schema::ingredients::dsl::*;

    let amounts = validators::check_ingredient_amounts(raw, limits)?;
    let ids: Vec<IngredientId> = amounts.iter().map(|(i, _)| *i).collect();

    let mut found: BTreeMap<IngredientId, Ingredient> = ingredients
        .select(Ingredient::as_select())
        .filter(id.eq_any(&ids))
        .load(conn)?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    amounts
        .into_iter()
        .map(|(ingredient_id, amount)| -> Result<_, ApiError> {
            let ingredient = found
                .remove(&ingredient_id)
                .ok_or(ValidationError::UnknownIngredient)?;
            Ok((ingredient_id, (ingredient, amount)))
        })
        .collect()
}

pub fn list_tags(conn: &mut database::Connection) -> Result<Vec<Tag>, ApiError> {
    use database::schema::tags::dsl::*;

    Ok(tags.select(Tag::as_select()).order_by(name).load(conn)?)
}

pub fn get_tag(conn: &mut database::Connection, tag_id: TagId) -> Result<Tag, ApiError> {
    use database::schema::tags::dsl::*;

    Ok(tags.find(tag_id).select(Tag::as_select()).get_result(conn)?)
}

/// Checks a tag id payload; fails when any id is unknown.
pub fn resolve_tags(conn: &mut database::Connection, raw: &[TagId]) -> Result<Vec<Tag>, ApiError> {
    use database::schema::tags::dsl::*;

    let ids = validators::check_tag_ids(raw)?;
    let found = tags
        .select(Tag::as_select())
        .filter(id.eq_any(&ids))
        .order_by(name)
        .load(conn)?;
    if found.len() != ids.len() {
        return Err(ValidationError::UnknownTag.into());
    }
    Ok(found)
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagRequest {
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub fn create_tag(conn: &mut database::Connection, request: &TagRequest) -> Result<Tag, ApiError> {
    use database::schema::tags::dsl::*;

    let new_name = request.name.trim();
    let new_slug = request.slug.trim();
    validators::check_required(new_name, "tag name")?;
    validators::check_length(new_name, "tag name", 1, 50)?;
    validators::check_slug(new_slug)?;
    let new_color = validators::normalize_hex_color(&request.color)?;

    let taken = tags
        .select(id)
        .filter(color.eq(&new_color))
        .first::<TagId>(conn)
        .optional()?;
    if taken.is_some() {
        return Err(ValidationError::ColorTaken(new_color).into());
    }

    let inserted = diesel::insert_into(tags)
        .values(NewTag {
            name: new_name,
            color: &new_color,
            slug: new_slug,
        })
        .execute(conn);
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(format!(
                "a tag named {new_name:?} or with slug {new_slug:?} already exists"
            )))
        }
        Err(e) => return Err(e.into()),
    }

    log::info!("created tag {new_name:?} ({new_color})");
    Ok(tags
        .select(Tag::as_select())
        .filter(slug.eq(new_slug))
        .get_result(conn)?)
}

#[test]
fn ingredient_search_orders_prefix_matches_first() {
    use super::fixtures;

    let mut conn = database::in_memory();
    for (n, u) in [
        ("сгущённое молоко", "г"),
        ("молоко", "мл"),
        ("соль", "г"),
        ("Молоко козье", "мл"),
        ("кокосовое молоко", "мл"),
        ("мола", "г"),
    ] {
        fixtures::ingredient(&mut conn, n, u);
    }

    let names: Vec<String> = search_ingredients(&mut conn, Some("мол"))
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Молоко козье",
            "мола",
            "молоко",
            "кокосовое молоко",
            "сгущённое молоко",
        ]
    );

    assert_eq!(search_ingredients(&mut conn, None).unwrap().len(), 6);
    assert_eq!(search_ingredients(&mut conn, Some("  ")).unwrap().len(), 6);
    assert!(search_ingredients(&mut conn, Some("перец"))
        .unwrap()
        .is_empty());
}

#[test]
fn get_or_create_ingredient_is_idempotent() {
    let mut conn = database::in_memory();
    let first = get_or_create_ingredient(&mut conn, "Salt", "g").unwrap();
    let second = get_or_create_ingredient(&mut conn, " Salt ", "g").unwrap();
    assert_eq!(first, second);

    let other_unit = get_or_create_ingredient(&mut conn, "Salt", "pinch").unwrap();
    assert_ne!(first.id, other_unit.id);
}

#[test]
fn resolving_ingredients() {
    use super::fixtures;

    let mut conn = database::in_memory();
    let salt = fixtures::ingredient(&mut conn, "Salt", "g");
    let flour = fixtures::ingredient(&mut conn, "Flour", "g");
    let limits = Limits::default();

    let resolved = resolve_ingredients(
        &mut conn,
        &[
            RawIngredient {
                id: salt.id,
                amount: 5,
            },
            RawIngredient {
                id: flour.id,
                amount: 500,
            },
        ],
        &limits,
    )
    .unwrap();
    assert_eq!(resolved[&salt.id], (salt.clone(), 5));
    assert_eq!(resolved[&flour.id], (flour, 500));

    let unknown = resolve_ingredients(
        &mut conn,
        &[
            RawIngredient {
                id: salt.id,
                amount: 5,
            },
            RawIngredient {
                id: IngredientId(9999),
                amount: 5,
            },
        ],
        &limits,
    );
    assert!(matches!(
        unknown,
        Err(ApiError::Validation(ValidationError::UnknownIngredient))
    ));

    let negative = resolve_ingredients(
        &mut conn,
        &[RawIngredient {
            id: salt.id,
            amount: -1,
        }],
        &limits,
    );
    assert!(matches!(
        negative,
        Err(ApiError::Validation(ValidationError::AmountTooSmall { .. }))
    ));
}

#[test]
fn resolving_tags() {
    use super::fixtures;

    let mut conn = database::in_memory();
    let breakfast = fixtures::tag(&mut conn, "Breakfast", "#E26C2D");
    let dinner = fixtures::tag(&mut conn, "Dinner", "#49B64E");

    let resolved = resolve_tags(&mut conn, &[dinner.id, breakfast.id]).unwrap();
    assert_eq!(resolved, vec![breakfast.clone(), dinner]);

    assert!(matches!(
        resolve_tags(&mut conn, &[breakfast.id, TagId(9999)]),
        Err(ApiError::Validation(ValidationError::UnknownTag))
    ));
    assert!(matches!(
        resolve_tags(&mut conn, &[]),
        Err(ApiError::Validation(ValidationError::NoTags))
    ));
}

#[test]
fn tag_colors_are_normalized_and_unique() {
    let mut conn = database::in_memory();
    let request = |n: &str, c: &str| TagRequest {
        name: n.into(),
        color: c.into(),
        slug: n.to_lowercase(),
    };

    let lunch = create_tag(&mut conn, &request("Lunch", "#abc")).unwrap();
    assert_eq!(lunch.color, "#AABBCC");
    assert_eq!(get_tag(&mut conn, lunch.id).unwrap(), lunch);

    assert!(matches!(
        create_tag(&mut conn, &request("Supper", "aabbcc")),
        Err(ApiError::Validation(ValidationError::ColorTaken(c))) if c == "#AABBCC"
    ));
    assert!(matches!(
        create_tag(&mut conn, &request("Lunch", "#123456")),
        Err(ApiError::Conflict(_))
    ));
    assert!(matches!(
        create_tag(&mut conn, &request("Brunch", "12")),
        Err(ApiError::Validation(ValidationError::ColorLength { .. }))
    ));
    assert_eq!(list_tags(&mut conn).unwrap(), vec![lunch]);
}
