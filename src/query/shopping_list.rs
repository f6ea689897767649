use crate::database;
use crate::database::models::UserId;
use crate::error::ApiError;
use derive_more::Display;
use diesel::dsl::{exists, sum};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;

/// One line of the downloadable list: an ingredient summed over every recipe
/// in the cart.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{name}: {amount} {measurement_unit}")]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

pub fn cart_is_empty(conn: &mut database::Connection, user: UserId) -> Result<bool, ApiError> {
    use database::schema::shopping_carts::dsl::*;

    let any: bool =
        diesel::select(exists(shopping_carts.filter(user_id.eq(user)))).get_result(conn)?;
    Ok(!any)
}

pub fn shopping_list(
    conn: &mut database::Connection,
    user: UserId,
) -> Result<Vec<ShoppingListItem>, ApiError> {
    use database::schema::{amount_ingredients, ingredients, recipes, shopping_carts};

    let rows: Vec<(String, String, Option<i64>)> = shopping_carts::table
        .inner_join(
            recipes::table.inner_join(amount_ingredients::table.inner_join(ingredients::table)),
        )
        .filter(shopping_carts::user_id.eq(user))
        .group_by((ingredients::name, ingredients::measurement_unit))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            sum(amount_ingredients::amount),
        ))
        .order_by((ingredients::name, ingredients::measurement_unit))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(name, measurement_unit, amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount: amount.unwrap_or(0),
        })
        .collect())
}

pub fn render_shopping_list(username: &str, items: &[ShoppingListItem]) -> String {
    let mut lines = vec![format!("Shopping list for {username}")];
    lines.extend(items.iter().map(ToString::to_string));
    lines.join("\n")
}

#[test]
fn amounts_are_summed_across_cart_recipes() {
    use super::fixtures;
    use super::relations::{create_relation, Relation};

    let mut conn = database::in_memory();
    let cook = fixtures::user(&mut conn, "hungry");
    let author = fixtures::user(&mut conn, "author");
    let salt = fixtures::ingredient(&mut conn, "Salt", "g");
    let water = fixtures::ingredient(&mut conn, "Water", "ml");
    let beans = fixtures::ingredient(&mut conn, "Beans", "g");
    let tag = fixtures::tag(&mut conn, "Dinner", "#123456");

    let soup_ingredients = [(&salt, 100), (&water, 500)];
    let stew_ingredients = [(&salt, 50), (&beans, 200)];
    let soup = fixtures::recipe(&mut conn, &author, "Soup", &[&tag], &soup_ingredients);
    let stew = fixtures::recipe(&mut conn, &author, "Stew", &[&tag], &stew_ingredients);
    fixtures::recipe(&mut conn, &author, "Brine", &[&tag], &[(&salt, 900)]);

    assert!(cart_is_empty(&mut conn, cook.id).unwrap());
    assert!(shopping_list(&mut conn, cook.id).unwrap().is_empty());

    create_relation(&mut conn, cook.id, Relation::ShoppingCart(soup)).unwrap();
    create_relation(&mut conn, cook.id, Relation::ShoppingCart(stew)).unwrap();
    assert!(!cart_is_empty(&mut conn, cook.id).unwrap());

    let items = shopping_list(&mut conn, cook.id).unwrap();
    assert_eq!(
        render_shopping_list(&cook.username, &items),
        "Shopping list for hungry\nBeans: 200 g\nSalt: 150 g\nWater: 500 ml"
    );
    // Someone else's cart stays separate.
    assert!(shopping_list(&mut conn, author.id).unwrap().is_empty());
}

#[test]
fn same_name_in_different_units_stays_apart() {
    let items = vec![
        ShoppingListItem {
            name: "Milk".into(),
            measurement_unit: "cup".into(),
            amount: 2,
        },
        ShoppingListItem {
            name: "Milk".into(),
            measurement_unit: "ml".into(),
            amount: 250,
        },
    ];
    assert_eq!(
        render_shopping_list("someone", &items),
        "Shopping list for someone\nMilk: 2 cup\nMilk: 250 ml"
    );
    assert_eq!(render_shopping_list("someone", &[]), "Shopping list for someone");
}
