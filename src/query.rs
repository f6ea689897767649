// Copyright 2023 Remi Bernotavicius

//! Everything that reads or writes the database. Functions take the
//! connection explicitly and return [`ApiError`](crate::error::ApiError) so the
//! HTTP layer and the command line share them.

pub mod catalog;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod users;

/// Row builders shared by the tests of every query module.
#[cfg(test)]
pub mod fixtures {
    use crate::config::Limits;
    use crate::database;
    use crate::database::models::{Ingredient, RecipeId, Tag, TagId, User};
    use crate::validators::RawIngredient;

    pub fn user(conn: &mut database::Connection, username: &str) -> User {
        super::users::register_user(
            conn,
            &super::users::Registration {
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: "Test".into(),
                last_name: "Cook".into(),
                password: "correct horse".into(),
            },
            false,
        )
        .unwrap()
    }

    pub fn ingredient(conn: &mut database::Connection, name: &str, unit: &str) -> Ingredient {
        super::catalog::get_or_create_ingredient(conn, name, unit).unwrap()
    }

    pub fn tag(conn: &mut database::Connection, name: &str, color: &str) -> Tag {
        super::catalog::create_tag(
            conn,
            &super::catalog::TagRequest {
                name: name.into(),
                color: color.into(),
                slug: name.to_lowercase(),
            },
        )
        .unwrap()
    }

    pub fn recipe_request(
        name: &str,
        tags: &[&Tag],
        ingredients: &[(&Ingredient, i64)],
    ) -> super::recipes::RecipeRequest {
        super::recipes::RecipeRequest {
            name: name.into(),
            text: format!("How to cook {name}"),
            image: "data:image/png;base64,iVBORw0KGgo=".into(),
            cooking_time: 30,
            tags: tags.iter().map(|t| t.id).collect::<Vec<TagId>>(),
            ingredients: ingredients
                .iter()
                .map(|(i, amount)| RawIngredient {
                    id: i.id,
                    amount: *amount,
                })
                .collect(),
        }
    }

    pub fn recipe(
        conn: &mut database::Connection,
        author: &User,
        name: &str,
        tags: &[&Tag],
        ingredients: &[(&Ingredient, i64)],
    ) -> RecipeId {
        super::recipes::create_recipe(
            conn,
            author,
            &recipe_request(name, tags, ingredients),
            &Limits::default(),
        )
        .unwrap()
    }
}
