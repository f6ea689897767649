//! Create-if-absent / delete-if-present handling shared by favourites, shopping
//! cart entries and subscriptions.

use crate::database;
use crate::database::models::{RecipeId, UserId};
use crate::error::{is_unique_violation, ApiError};
use derive_more::Display;
use diesel::dsl::exists;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use strum::EnumIter;

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq)]
pub enum RelationKind {
    #[display("favourite")]
    Favourite,
    #[display("shopping cart entry")]
    ShoppingCart,
    #[display("subscription")]
    Subscription,
}

/// A relation between the acting user and its target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Relation {
    Favourite(RecipeId),
    ShoppingCart(RecipeId),
    Subscription(UserId),
}

impl Relation {
    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Favourite(_) => RelationKind::Favourite,
            Self::ShoppingCart(_) => RelationKind::ShoppingCart,
            Self::Subscription(_) => RelationKind::Subscription,
        }
    }
}

fn ensure_target_exists(
    conn: &mut database::Connection,
    relation: Relation,
) -> Result<(), ApiError> {
    use database::schema::{recipes, users};

    let found: bool = match relation {
        Relation::Favourite(recipe) | Relation::ShoppingCart(recipe) => {
            diesel::select(exists(recipes::table.find(recipe))).get_result(conn)?
        }
        Relation::Subscription(author) => {
            diesel::select(exists(users::table.find(author))).get_result(conn)?
        }
    };
    if !found {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

pub fn create_relation(
    conn: &mut database::Connection,
    user: UserId,
    relation: Relation,
) -> Result<(), ApiError> {
    ensure_target_exists(conn, relation)?;
    let now = chrono::Utc::now().naive_utc();

    let inserted = match relation {
        Relation::Favourite(recipe) => {
            use database::schema::favourites::dsl::*;

            diesel::insert_into(favourites)
                .values((user_id.eq(user), recipe_id.eq(recipe), added.eq(now)))
                .execute(conn)
        }
        Relation::ShoppingCart(recipe) => {
            use database::schema::shopping_carts::dsl::*;

            diesel::insert_into(shopping_carts)
                .values((user_id.eq(user), recipe_id.eq(recipe), added.eq(now)))
                .execute(conn)
        }
        Relation::Subscription(author) => {
            use database::schema::subscriptions::dsl::*;

            if author == user {
                return Err(ApiError::Forbidden("you cannot subscribe to yourself"));
            }
            diesel::insert_into(subscriptions)
                .values((user_id.eq(user), author_id.eq(author), added.eq(now)))
                .execute(conn)
        }
    };

    match inserted {
        Ok(_) => {
            log::info!("user {user} created {relation:?}");
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::RelationExists(relation.kind())),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_relation(
    conn: &mut database::Connection,
    user: UserId,
    relation: Relation,
) -> Result<(), ApiError> {
    ensure_target_exists(conn, relation)?;

    let deleted = match relation {
        Relation::Favourite(recipe) => {
            use database::schema::favourites::dsl::*;

            diesel::delete(favourites.filter(user_id.eq(user)).filter(recipe_id.eq(recipe)))
                .execute(conn)?
        }
        Relation::ShoppingCart(recipe) => {
            use database::schema::shopping_carts::dsl::*;

            diesel::delete(
                shopping_carts
                    .filter(user_id.eq(user))
                    .filter(recipe_id.eq(recipe)),
            )
            .execute(conn)?
        }
        Relation::Subscription(author) => {
            use database::schema::subscriptions::dsl::*;

            diesel::delete(
                subscriptions
                    .filter(user_id.eq(user))
                    .filter(author_id.eq(author)),
            )
            .execute(conn)?
        }
    };

    if deleted == 0 {
        return Err(ApiError::RelationMissing(relation.kind()));
    }
    log::info!("user {user} removed {relation:?}");
    Ok(())
}

pub fn relation_exists(
    conn: &mut database::Connection,
    user: UserId,
    relation: Relation,
) -> Result<bool, ApiError> {
    let found = match relation {
        Relation::Favourite(recipe) => {
            use database::schema::favourites::dsl::*;

            diesel::select(exists(
                favourites.filter(user_id.eq(user)).filter(recipe_id.eq(recipe)),
            ))
            .get_result(conn)?
        }
        Relation::ShoppingCart(recipe) => {
            use database::schema::shopping_carts::dsl::*;

            diesel::select(exists(
                shopping_carts
                    .filter(user_id.eq(user))
                    .filter(recipe_id.eq(recipe)),
            ))
            .get_result(conn)?
        }
        Relation::Subscription(author) => {
            use database::schema::subscriptions::dsl::*;

            diesel::select(exists(
                subscriptions
                    .filter(user_id.eq(user))
                    .filter(author_id.eq(author)),
            ))
            .get_result(conn)?
        }
    };
    Ok(found)
}

#[cfg(test)]
fn recipe_relations(conn: &mut database::Connection) -> (UserId, RecipeId, UserId) {
    use super::fixtures;

    let cook = fixtures::user(conn, "cook_one");
    let author = fixtures::user(conn, "author_one");
    let salt = fixtures::ingredient(conn, "Salt", "g");
    let tag = fixtures::tag(conn, "Lunch", "#FFAA00");
    let recipe = fixtures::recipe(conn, &author, "Soup", &[&tag], &[(&salt, 10)]);
    (cook.id, recipe, author.id)
}

#[test]
fn toggling_every_recipe_relation_kind() {
    let mut conn = database::in_memory();
    let (cook, recipe, _) = recipe_relations(&mut conn);

    for relation in [Relation::Favourite(recipe), Relation::ShoppingCart(recipe)] {
        assert!(!relation_exists(&mut conn, cook, relation).unwrap());

        create_relation(&mut conn, cook, relation).unwrap();
        assert!(relation_exists(&mut conn, cook, relation).unwrap());

        let again = create_relation(&mut conn, cook, relation);
        assert!(matches!(again, Err(ApiError::RelationExists(k)) if k == relation.kind()));

        delete_relation(&mut conn, cook, relation).unwrap();
        assert!(!relation_exists(&mut conn, cook, relation).unwrap());

        let again = delete_relation(&mut conn, cook, relation);
        assert!(matches!(again, Err(ApiError::RelationMissing(k)) if k == relation.kind()));
    }
}

#[test]
fn deleting_a_relation_never_created_is_a_client_error() {
    let mut conn = database::in_memory();
    let (cook, recipe, _) = recipe_relations(&mut conn);

    let result = delete_relation(&mut conn, cook, Relation::Favourite(recipe));
    assert!(matches!(
        result,
        Err(ApiError::RelationMissing(RelationKind::Favourite))
    ));
}

#[test]
fn unknown_targets_are_not_found() {
    let mut conn = database::in_memory();
    let (cook, _, _) = recipe_relations(&mut conn);

    assert!(matches!(
        create_relation(&mut conn, cook, Relation::Favourite(RecipeId(9999))),
        Err(ApiError::NotFound)
    ));
    assert!(matches!(
        delete_relation(&mut conn, cook, Relation::Subscription(UserId(9999))),
        Err(ApiError::NotFound)
    ));
}

#[test]
fn self_subscription_is_rejected_before_writing() {
    let mut conn = database::in_memory();
    let (cook, _, author) = recipe_relations(&mut conn);

    assert!(matches!(
        create_relation(&mut conn, cook, Relation::Subscription(cook)),
        Err(ApiError::Forbidden(_))
    ));
    let rows: i64 = database::schema::subscriptions::table
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(rows, 0);

    create_relation(&mut conn, cook, Relation::Subscription(author)).unwrap();
    assert!(relation_exists(&mut conn, cook, Relation::Subscription(author)).unwrap());
    // Following is one-directional.
    assert!(!relation_exists(&mut conn, author, Relation::Subscription(cook)).unwrap());
}

#[test]
fn relation_kinds_have_readable_names() {
    use strum::IntoEnumIterator as _;

    let names: Vec<String> = RelationKind::iter().map(|k| k.to_string()).collect();
    assert_eq!(names, ["favourite", "shopping cart entry", "subscription"]);
}
