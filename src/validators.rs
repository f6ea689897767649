// Copyright 2023 Remi Bernotavicius

//! Payload checks that need no database access. Each takes its bounds as
//! arguments, so nothing here carries state between calls.

use crate::config::Limits;
use crate::database::models::{IngredientId, TagId};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no ingredients given")]
    NoIngredients,
    #[error("amount of ingredient {id} must be at least 1, got {amount}")]
    AmountTooSmall { id: IngredientId, amount: i64 },
    #[error("amount of ingredient {id} must not exceed {max}, got {amount}")]
    AmountTooLarge {
        id: IngredientId,
        amount: i64,
        max: i32,
    },
    #[error("ingredient {0} is listed more than once")]
    DuplicateIngredient(IngredientId),
    #[error("unknown ingredient given")]
    UnknownIngredient,
    #[error("no tags given")]
    NoTags,
    #[error("tag {0} is listed more than once")]
    DuplicateTag(TagId),
    #[error("unknown tag given")]
    UnknownTag,
    #[error("color code {color:?} has invalid length {len}")]
    ColorLength { color: String, len: usize },
    #[error("color code {0:?} is not hexadecimal")]
    ColorNotHex(String),
    #[error("color {0} is already used by another tag")]
    ColorTaken(String),
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} is too short, at least {min} characters are required")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} is too long, at most {max} characters are allowed")]
    TooLong { field: &'static str, max: usize },
    #[error("cooking time must be between {min} and {max} minutes, got {minutes}")]
    CookingTime { minutes: i64, min: i32, max: i32 },
    #[error("{0:?} is not a valid slug")]
    Slug(String),
    #[error("{0:?} is not a valid email address")]
    Email(String),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// One `{"id": .., "amount": ..}` entry of a recipe payload.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawIngredient {
    pub id: IngredientId,
    pub amount: i64,
}

/// Checks the shape of an ingredient list and returns `(id, amount)` pairs in
/// the order given. Whether the ids exist is checked against the store later.
pub fn check_ingredient_amounts(
    raw: &[RawIngredient],
    limits: &Limits,
) -> Result<Vec<(IngredientId, i32)>> {
    if raw.is_empty() {
        return Err(ValidationError::NoIngredients);
    }

    let mut seen = HashSet::new();
    let mut checked = Vec::with_capacity(raw.len());
    for &RawIngredient { id, amount } in raw {
        if amount <= 0 {
            return Err(ValidationError::AmountTooSmall { id, amount });
        }
        if amount > i64::from(limits.max_amount) {
            return Err(ValidationError::AmountTooLarge {
                id,
                amount,
                max: limits.max_amount,
            });
        }
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateIngredient(id));
        }
        checked.push((id, amount as i32));
    }
    Ok(checked)
}

pub fn check_tag_ids(raw: &[TagId]) -> Result<Vec<TagId>> {
    if raw.is_empty() {
        return Err(ValidationError::NoTags);
    }
    let mut seen = HashSet::new();
    for &id in raw {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateTag(id));
        }
    }
    Ok(raw.to_vec())
}

/// Normalizes `#abc`, `abc123` and friends into `#RRGGBB`.
pub fn normalize_hex_color(input: &str) -> Result<String> {
    let color = input.trim();
    let color = color.strip_prefix('#').unwrap_or(color).to_uppercase();

    let len = color.chars().count();
    if len != 3 && len != 6 {
        return Err(ValidationError::ColorLength { color, len });
    }
    if !color.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::ColorNotHex(color));
    }

    if len == 3 {
        Ok(color.chars().fold(String::from("#"), |mut out, c| {
            out.push(c);
            out.push(c);
            out
        }))
    } else {
        Ok(format!("#{color}"))
    }
}

pub fn check_required(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Character-count bounds, inclusive on both ends.
pub fn check_length(value: &str, field: &'static str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn check_cooking_time(minutes: i64, limits: &Limits) -> Result<i32> {
    let (min, max) = (limits.min_cooking_time, limits.max_cooking_time);
    if minutes < i64::from(min) || minutes > i64::from(max) {
        return Err(ValidationError::CookingTime { minutes, min, max });
    }
    Ok(minutes as i32)
}

/// Slugs are limited to ASCII letters, digits, `-` and `_`.
pub fn check_slug(value: &str) -> Result<()> {
    check_required(value, "slug")?;
    check_length(value, "slug", 1, 50)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::Slug(value.into()));
    }
    Ok(())
}

pub fn check_email(value: &str) -> Result<()> {
    check_length(value, "email", 3, 100)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::Email(value.into())),
    }
}

#[cfg(test)]
fn raw(id: i32, amount: i64) -> RawIngredient {
    RawIngredient {
        id: IngredientId(id),
        amount,
    }
}

#[test]
fn hex_color_normalization() {
    assert_eq!(normalize_hex_color("#abc").unwrap(), "#AABBCC");
    assert_eq!(normalize_hex_color("abc123").unwrap(), "#ABC123");
    assert_eq!(normalize_hex_color("  #aBc ").unwrap(), "#AABBCC");
    assert_eq!(normalize_hex_color("#FF0000").unwrap(), "#FF0000");

    assert_eq!(
        normalize_hex_color("12"),
        Err(ValidationError::ColorLength {
            color: "12".into(),
            len: 2
        })
    );
    assert_eq!(
        normalize_hex_color("ggg"),
        Err(ValidationError::ColorNotHex("GGG".into()))
    );
    assert!(normalize_hex_color("#abcd").is_err());
    assert!(normalize_hex_color("").is_err());
}

#[test]
fn ingredient_amounts() {
    let limits = Limits::default();

    assert_eq!(
        check_ingredient_amounts(&[raw(2, 100), raw(1, 50)], &limits).unwrap(),
        vec![(IngredientId(2), 100), (IngredientId(1), 50)]
    );
    assert_eq!(
        check_ingredient_amounts(&[], &limits),
        Err(ValidationError::NoIngredients)
    );
    assert_eq!(
        check_ingredient_amounts(&[raw(1, 10), raw(2, 0)], &limits),
        Err(ValidationError::AmountTooSmall {
            id: IngredientId(2),
            amount: 0
        })
    );
    assert!(matches!(
        check_ingredient_amounts(&[raw(1, -5)], &limits),
        Err(ValidationError::AmountTooSmall { .. })
    ));
    assert!(matches!(
        check_ingredient_amounts(&[raw(1, 1001)], &limits),
        Err(ValidationError::AmountTooLarge { max: 1000, .. })
    ));
    assert_eq!(
        check_ingredient_amounts(&[raw(1, 10), raw(1, 20)], &limits),
        Err(ValidationError::DuplicateIngredient(IngredientId(1)))
    );
}

#[test]
fn tag_ids() {
    assert_eq!(
        check_tag_ids(&[TagId(1), TagId(3)]).unwrap(),
        vec![TagId(1), TagId(3)]
    );
    assert_eq!(check_tag_ids(&[]), Err(ValidationError::NoTags));
    assert_eq!(
        check_tag_ids(&[TagId(1), TagId(1)]),
        Err(ValidationError::DuplicateTag(TagId(1)))
    );
}

#[test]
fn lengths() {
    assert!(check_length("chef", "username", 5, 30).is_err());
    assert!(check_length("chefs", "username", 5, 30).is_ok());
    // Counts characters, not bytes.
    assert!(check_length("повар", "username", 5, 30).is_ok());
    assert_eq!(
        check_length(&"x".repeat(31), "username", 5, 30),
        Err(ValidationError::TooLong {
            field: "username",
            max: 30
        })
    );
    assert_eq!(
        check_required("  ", "text"),
        Err(ValidationError::Required { field: "text" })
    );
}

#[test]
fn cooking_time() {
    let limits = Limits::default();
    assert_eq!(check_cooking_time(1, &limits).unwrap(), 1);
    assert_eq!(check_cooking_time(360, &limits).unwrap(), 360);
    assert!(check_cooking_time(0, &limits).is_err());
    assert!(check_cooking_time(361, &limits).is_err());
}

#[test]
fn slugs() {
    assert!(check_slug("breakfast").is_ok());
    assert!(check_slug("late-night_snack2").is_ok());
    assert_eq!(
        check_slug("завтрак"),
        Err(ValidationError::Slug("завтрак".into()))
    );
    assert!(check_slug("").is_err());
}

#[test]
fn emails() {
    assert!(check_email("cook@example.com").is_ok());
    assert!(check_email("cook.example.com").is_err());
    assert!(check_email("@example.com").is_err());
    assert!(check_email("cook@localhost").is_err());
}
