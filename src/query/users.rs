use super::relations::{self, Relation};
use crate::database;
use crate::database::models::{NewUser, RecipeSummary, User, UserId};
use crate::error::{is_unique_violation, ApiError};
use crate::validators;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::{Deserialize, Serialize};

const HASH_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

#[derive(Deserialize, Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), validators::ValidationError> {
        validators::check_length(self.username.trim(), "username", 5, 30)?;
        validators::check_email(self.email.trim())?;
        validators::check_required(&self.first_name, "first name")?;
        validators::check_length(self.first_name.trim(), "first name", 1, 30)?;
        validators::check_required(&self.last_name, "last name")?;
        validators::check_length(self.last_name.trim(), "last name", 1, 50)?;
        validators::check_required(&self.password, "password")?;
        validators::check_length(&self.password, "password", 1, 64)?;
        Ok(())
    }
}

/// CPU-bound; async callers run it on the blocking pool.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}

/// Stores an already validated registration with its hashed password.
pub fn insert_user(
    conn: &mut database::Connection,
    registration: &Registration,
    hashed: &str,
    superuser: bool,
) -> Result<User, ApiError> {
    use database::schema::users::dsl::*;

    let new_username = registration.username.trim();
    let inserted = diesel::insert_into(users)
        .values(NewUser {
            username: new_username,
            email: registration.email.trim(),
            first_name: registration.first_name.trim(),
            last_name: registration.last_name.trim(),
            password: hashed,
            is_superuser: superuser,
        })
        .execute(conn);
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "a user with that username or email already exists".into(),
            ))
        }
        Err(e) => return Err(e.into()),
    }

    log::info!("registered user {new_username:?}");
    Ok(users
        .select(User::as_select())
        .filter(username.eq(new_username))
        .get_result(conn)?)
}

pub fn register_user(
    conn: &mut database::Connection,
    registration: &Registration,
    superuser: bool,
) -> Result<User, ApiError> {
    registration.validate()?;
    let hashed = hash_password(&registration.password)?;
    insert_user(conn, registration, &hashed, superuser)
}

pub fn get_user(conn: &mut database::Connection, user_id: UserId) -> Result<User, ApiError> {
    use database::schema::users::dsl::*;

    Ok(users.find(user_id).select(User::as_select()).get_result(conn)?)
}

pub fn list_users(conn: &mut database::Connection) -> Result<Vec<User>, ApiError> {
    use database::schema::users::dsl::*;

    Ok(users
        .select(User::as_select())
        .order_by(username)
        .load(conn)?)
}

/// A user as other users see them.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

pub fn profile(
    conn: &mut database::Connection,
    user: &User,
    viewer: Option<UserId>,
) -> Result<UserProfile, ApiError> {
    let is_subscribed = match viewer {
        Some(viewer) => relations::relation_exists(conn, viewer, Relation::Subscription(user.id))?,
        None => false,
    };
    Ok(UserProfile {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_subscribed,
    })
}

/// The active user with `login_email`. Unknown and deactivated accounts look
/// the same to the caller.
pub fn find_login_user(
    conn: &mut database::Connection,
    login_email: &str,
) -> Result<User, ApiError> {
    use database::schema::users::dsl::*;

    let user = users
        .select(User::as_select())
        .filter(email.eq(login_email.trim()))
        .get_result(conn)
        .optional()?;
    user.filter(|u| u.is_active).ok_or(ApiError::BadCredentials)
}

/// CPU-bound like `hash_password`.
pub fn check_password(user: &User, password: &str) -> Result<(), ApiError> {
    if !bcrypt::verify(password, &user.password)? {
        return Err(ApiError::BadCredentials);
    }
    Ok(())
}

/// Hands out the user's token, creating one on first login.
pub fn issue_token(conn: &mut database::Connection, user: &User) -> Result<String, ApiError> {
    use database::schema::auth_tokens::dsl::*;

    let existing = auth_tokens
        .select(key)
        .filter(user_id.eq(user.id))
        .first::<String>(conn)
        .optional()?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    let new_key = uuid::Uuid::new_v4().simple().to_string();
    diesel::insert_into(auth_tokens)
        .values((
            key.eq(&new_key),
            user_id.eq(user.id),
            created.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    log::info!("issued token for {:?}", user.username);
    Ok(new_key)
}

pub fn login(
    conn: &mut database::Connection,
    login_email: &str,
    login_password: &str,
) -> Result<String, ApiError> {
    let user = find_login_user(conn, login_email)?;
    check_password(&user, login_password)?;
    issue_token(conn, &user)
}

pub fn logout(conn: &mut database::Connection, token: &str) -> Result<(), ApiError> {
    use database::schema::auth_tokens::dsl::*;

    diesel::delete(auth_tokens.filter(key.eq(token))).execute(conn)?;
    Ok(())
}

pub fn user_for_token(
    conn: &mut database::Connection,
    token: &str,
) -> Result<Option<User>, ApiError> {
    use database::schema::{auth_tokens, users};

    Ok(auth_tokens::table
        .inner_join(users::table)
        .filter(auth_tokens::key.eq(token))
        .select(User::as_select())
        .get_result(conn)
        .optional()?)
}

/// An author as listed on the subscriptions page.
#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionEntry {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

pub fn subscription_entry(
    conn: &mut database::Connection,
    author: &User,
    viewer: Option<UserId>,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionEntry, ApiError> {
    use database::schema::recipes::dsl::*;

    let profile = profile(conn, author, viewer)?;
    let mut query = recipes
        .select(RecipeSummary::as_select())
        .filter(author_id.eq(author.id))
        .order_by((pub_date.desc(), id.desc()))
        .into_boxed();
    if let Some(limit) = recipes_limit {
        query = query.limit(limit.max(0));
    }
    let summaries = query.load(conn)?;
    let recipes_count = recipes
        .filter(author_id.eq(author.id))
        .count()
        .get_result(conn)?;

    Ok(SubscriptionEntry {
        author: profile,
        recipes: summaries,
        recipes_count,
    })
}

/// Authors `subscriber` follows, by username.
pub fn subscriptions(
    conn: &mut database::Connection,
    subscriber: UserId,
    recipes_limit: Option<i64>,
) -> Result<Vec<SubscriptionEntry>, ApiError> {
    use database::schema::{subscriptions, users};

    let authors = users::table
        .filter(
            users::id.eq_any(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(subscriber))
                    .select(subscriptions::author_id),
            ),
        )
        .select(User::as_select())
        .order_by(users::username)
        .load(conn)?;

    authors
        .iter()
        .map(|author| subscription_entry(conn, author, Some(subscriber), recipes_limit))
        .collect()
}

#[test]
fn registration_validates_and_hashes() {
    let mut conn = database::in_memory();
    let registration = Registration {
        username: "julia".into(),
        email: "julia@example.com".into(),
        first_name: "Julia".into(),
        last_name: "Child".into(),
        password: "bon appetit".into(),
    };
    let user = register_user(&mut conn, &registration, false).unwrap();
    assert_eq!(user.username, "julia");
    assert!(user.is_active);
    assert!(!user.is_superuser);
    assert_ne!(user.password, "bon appetit");
    assert!(bcrypt::verify("bon appetit", &user.password).unwrap());

    assert!(matches!(
        register_user(&mut conn, &registration, false),
        Err(ApiError::Conflict(_))
    ));

    let short = Registration {
        username: "jul".into(),
        email: "jul@example.com".into(),
        ..registration
    };
    assert!(matches!(
        register_user(&mut conn, &short, false),
        Err(ApiError::Validation(validators::ValidationError::TooShort { field: "username", .. }))
    ));
}

#[test]
fn username_length_is_enforced_by_the_store() {
    use database::schema::users::dsl::*;

    let mut conn = database::in_memory();
    let result = diesel::insert_into(users)
        .values(NewUser {
            username: "abcd",
            email: "abcd@example.com",
            first_name: "A",
            last_name: "B",
            password: "x",
            is_superuser: false,
        })
        .execute(&mut conn);
    assert!(result.is_err());
}

#[test]
fn login_issues_a_stable_token() {
    let mut conn = database::in_memory();
    let user = super::fixtures::user(&mut conn, "gordon");

    let token = login(&mut conn, "gordon@example.com", "correct horse").unwrap();
    assert_eq!(
        login(&mut conn, "gordon@example.com", "correct horse").unwrap(),
        token
    );
    assert_eq!(
        user_for_token(&mut conn, &token).unwrap().map(|u| u.id),
        Some(user.id)
    );

    assert!(matches!(
        login(&mut conn, "gordon@example.com", "wrong"),
        Err(ApiError::BadCredentials)
    ));
    assert!(matches!(
        login(&mut conn, "nobody@example.com", "correct horse"),
        Err(ApiError::BadCredentials)
    ));

    logout(&mut conn, &token).unwrap();
    assert!(user_for_token(&mut conn, &token).unwrap().is_none());
}

#[test]
fn subscriptions_list_followed_authors() {
    use super::fixtures;

    let mut conn = database::in_memory();
    let reader = fixtures::user(&mut conn, "reader");
    let author = fixtures::user(&mut conn, "author");
    let salt = fixtures::ingredient(&mut conn, "Salt", "g");
    let tag = fixtures::tag(&mut conn, "Dinner", "#123456");
    for name in ["Soup", "Stew", "Roast"] {
        fixtures::recipe(&mut conn, &author, name, &[&tag], &[(&salt, 5)]);
    }

    assert!(subscriptions(&mut conn, reader.id, None).unwrap().is_empty());

    relations::create_relation(&mut conn, reader.id, Relation::Subscription(author.id)).unwrap();
    let entries = subscriptions(&mut conn, reader.id, Some(2)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].author.username, "author");
    assert!(entries[0].author.is_subscribed);
    assert_eq!(entries[0].recipes.len(), 2);
    assert_eq!(entries[0].recipes_count, 3);

    assert!(!profile(&mut conn, &reader, Some(author.id)).unwrap().is_subscribed);
}

#[test]
fn password_checks_work_without_a_connection() {
    let mut conn = database::in_memory();
    let user = super::fixtures::user(&mut conn, "nigella");
    drop(conn);

    check_password(&user, "correct horse").unwrap();
    assert!(matches!(
        check_password(&user, "battery staple"),
        Err(ApiError::BadCredentials)
    ));

    let hashed = hash_password("lawson").unwrap();
    assert_ne!(hashed, "lawson");
    assert!(bcrypt::verify("lawson", &hashed).unwrap());
}

#[test]
fn deactivated_users_cannot_log_in() {
    use database::schema::users::dsl::*;

    let mut conn = database::in_memory();
    let user = super::fixtures::user(&mut conn, "delia");
    assert_eq!(
        find_login_user(&mut conn, " delia@example.com ").unwrap().id,
        user.id
    );

    diesel::update(users.find(user.id))
        .set(is_active.eq(false))
        .execute(&mut conn)
        .unwrap();
    assert!(matches!(
        find_login_user(&mut conn, "delia@example.com"),
        Err(ApiError::BadCredentials)
    ));
}
