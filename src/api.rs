// Copyright 2023 Remi Bernotavicius

//! The REST surface, mounted under `/api`.

use crate::config::Config;
use crate::database;
use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod catalog;
mod recipes;
mod users;

pub struct AppState {
    pub db: Mutex<database::Connection>,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

/// A JSON request body. Unlike `Json`, a body that fails to parse is answered
/// like every other client error: 400 with an `{"error": ...}` object.
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

impl AppState {
    pub fn new(conn: database::Connection, config: Config) -> SharedState {
        Arc::new(Self {
            db: Mutex::new(conn),
            config,
        })
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/:id",
            get(recipes::detail)
                .patch(recipes::update)
                .delete(recipes::delete),
        )
        .route(
            "/recipes/:id/favorite",
            post(recipes::favorite).delete(recipes::unfavorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/ingredients", get(catalog::ingredients))
        .route("/ingredients/:id", get(catalog::ingredient))
        .route("/tags", get(catalog::tags).post(catalog::create_tag))
        .route("/tags/:id", get(catalog::tag))
        .route("/users", get(users::list).post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/:id", get(users::detail))
        .route(
            "/users/:id/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/auth/token/login", post(auth::login))
        .route("/auth/token/logout", post(auth::logout));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
struct TestServer {
    state: SharedState,
    app: Router,
}

#[cfg(test)]
impl TestServer {
    fn new() -> Self {
        let config = Config {
            addr: ([127, 0, 0, 1], 0).into(),
            database: ":memory:".into(),
            limits: Default::default(),
        };
        let state = AppState::new(database::in_memory(), config);
        let app = router(state.clone());
        Self { state, app }
    }

    /// Registers `username` straight through the store and logs them in.
    async fn user(&self, username: &str) -> (crate::database::models::User, String) {
        use crate::query::{fixtures, users};

        let mut conn = self.state.db.lock().await;
        let user = fixtures::user(&mut conn, username);
        let token = users::login(&mut conn, &user.email, "correct horse").unwrap();
        (user, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt as _;

        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn registration_and_login_round_trip() {
    use axum::http::StatusCode;
    use serde_json::json;

    let server = TestServer::new();
    let (status, body) = server
        .json(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "username": "marcella",
                "email": "marcella@example.com",
                "first_name": "Marcella",
                "last_name": "Hazan",
                "password": "al dente",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "marcella");
    assert!(body.get("password").is_none());

    let (status, body) = server
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({ "email": "marcella@example.com", "password": "overcooked" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = server
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({ "email": "marcella@example.com", "password": "al dente" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["auth_token"].as_str().unwrap().to_owned();

    let (status, body) = server.json(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "marcella@example.com");

    let (status, _) = server
        .json(Method::POST, "/api/auth/token/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = server.json(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_and_unknown_tokens() {
    use axum::http::StatusCode;
    use serde_json::json;

    let server = TestServer::new();
    let (status, body) = server.json(Method::GET, "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = server
        .json(Method::GET, "/api/recipes", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .json(Method::POST, "/api/recipes", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.json(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.json(Method::GET, "/api/recipes/42", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tags_are_created_by_administrators() {
    use axum::http::StatusCode;
    use serde_json::json;

    let server = TestServer::new();
    let (_, cook_token) = server.user("line_cook").await;
    let (admin, admin_token) = server.user("head_chef").await;
    {
        use crate::database::schema::users::dsl::*;
        use diesel::{ExpressionMethods as _, QueryDsl as _, RunQueryDsl as _};

        let mut conn = server.state.db.lock().await;
        diesel::update(users.find(admin.id))
            .set(is_superuser.eq(true))
            .execute(&mut *conn)
            .unwrap();
    }

    let tag = json!({ "name": "Brunch", "color": "#f0a", "slug": "brunch" });
    let (status, _) = server
        .json(Method::POST, "/api/tags", Some(&cook_token), Some(tag.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .json(Method::POST, "/api/tags", Some(&admin_token), Some(tag))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["color"], "#FF00AA");

    let (status, body) = server.json(Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    let id = body[0]["id"].as_i64().unwrap();
    let (status, body) = server
        .json(Method::GET, &format!("/api/tags/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "brunch");
}

#[tokio::test]
async fn malformed_bodies_are_json_errors() {
    use crate::query::fixtures;
    use axum::http::StatusCode;
    use serde_json::json;

    let server = TestServer::new();
    let (_, token) = server.user("sloppy").await;
    let salt = {
        let mut conn = server.state.db.lock().await;
        fixtures::ingredient(&mut conn, "Salt", "g")
    };

    let without_tags = json!({
        "name": "Brine",
        "text": "Dissolve.",
        "image": "data:image/png;base64,iVBORw0KGgo=",
        "cooking_time": 5,
        "ingredients": [{ "id": salt.id, "amount": 30 }],
    });
    let (status, body) = server
        .json(Method::POST, "/api/recipes", Some(&token), Some(without_tags))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tags"));

    let (status, body) = server
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!("sloppy@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = server
        .json(
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "username": "incomplete" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn recipe_lifecycle() {
    use crate::query::fixtures;
    use axum::http::StatusCode;
    use serde_json::json;

    let server = TestServer::new();
    let (author, author_token) = server.user("nigella").await;
    let (_, reader_token) = server.user("reader").await;
    let (salt, water, breakfast) = {
        let mut conn = server.state.db.lock().await;
        (
            fixtures::ingredient(&mut conn, "Salt", "g"),
            fixtures::ingredient(&mut conn, "Water", "ml"),
            fixtures::tag(&mut conn, "Breakfast", "#E26C2D"),
        )
    };

    let payload = json!({
        "name": "Porridge",
        "text": "Simmer and stir.",
        "image": "data:image/png;base64,iVBORw0KGgo=",
        "cooking_time": 10,
        "tags": [breakfast.id],
        "ingredients": [
            { "id": salt.id, "amount": 2 },
            { "id": water.id, "amount": 300 },
        ],
    });
    let (status, created) = server
        .json(Method::POST, "/api/recipes", Some(&author_token), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"]["username"], "nigella");
    assert_eq!(created["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(created["is_favorited"], false);
    let id = created["id"].as_i64().unwrap();

    // Same name again from the same author.
    let (status, _) = server
        .json(Method::POST, "/api/recipes", Some(&author_token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let recipe_uri = format!("/api/recipes/{id}");
    let (status, _) = server
        .json(
            Method::PATCH,
            &recipe_uri,
            Some(&reader_token),
            Some(json!({ "name": "Gruel" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .json(
            Method::PATCH,
            &recipe_uri,
            Some(&author_token),
            Some(json!({ "ingredients": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = server
        .json(
            Method::PATCH,
            &recipe_uri,
            Some(&author_token),
            Some(json!({ "cooking_time": 15 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["cooking_time"], 15);
    assert_eq!(updated["ingredients"], created["ingredients"]);

    let favorite_uri = format!("{recipe_uri}/favorite");
    let (status, summary) = server
        .json(Method::POST, &favorite_uri, Some(&reader_token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        summary,
        json!({
            "id": id,
            "name": "Porridge",
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "cooking_time": 15,
        })
    );
    let (status, _) = server
        .json(Method::POST, &favorite_uri, Some(&reader_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, favourites) = server
        .json(
            Method::GET,
            "/api/recipes?is_favorited=1&tags=breakfast",
            Some(&reader_token),
            None,
        )
        .await;
    assert_eq!(favourites.as_array().unwrap().len(), 1);
    assert_eq!(favourites[0]["is_favorited"], true);
    let (_, by_author) = server
        .json(
            Method::GET,
            &format!("/api/recipes?author={}", author.id),
            None,
            None,
        )
        .await;
    assert_eq!(by_author.as_array().unwrap().len(), 1);

    let (status, _) = server
        .json(Method::DELETE, &favorite_uri, Some(&reader_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = server
        .json(Method::DELETE, &favorite_uri, Some(&reader_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .json(Method::DELETE, &recipe_uri, Some(&reader_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server
        .json(Method::DELETE, &recipe_uri, Some(&author_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = server.json(Method::GET, &recipe_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn downloading_the_shopping_cart() {
    use crate::query::fixtures;
    use axum::http::{header, StatusCode};

    let server = TestServer::new();
    let (shopper, token) = server.user("shopper").await;
    let (author, _) = server.user("author").await;

    let response = server
        .send(Method::GET, "/api/recipes/download_shopping_cart", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let recipes = {
        let mut conn = server.state.db.lock().await;
        let salt = fixtures::ingredient(&mut conn, "Salt", "g");
        let eggs = fixtures::ingredient(&mut conn, "Eggs", "pcs");
        let tag = fixtures::tag(&mut conn, "Breakfast", "#E26C2D");
        [
            fixtures::recipe(&mut conn, &author, "Omelette", &[&tag], &[(&eggs, 3), (&salt, 2)]),
            fixtures::recipe(&mut conn, &author, "Frittata", &[&tag], &[(&eggs, 6), (&salt, 4)]),
        ]
    };
    for id in recipes {
        let (status, _) = server
            .json(
                Method::POST,
                &format!("/api/recipes/{id}/shopping_cart"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = server
        .send(Method::GET, "/api/recipes/download_shopping_cart", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = maplit::btreemap! {
        "content-type" => "text/plain; charset=utf-8".to_owned(),
        "content-disposition" => {
            format!("attachment; filename=shopper_id{}_shoplist.txt", shopper.id)
        },
    };
    for (name, expected) in headers {
        assert_eq!(response.headers()[name], expected.as_str());
    }
    assert!(response.headers().contains_key(header::CONTENT_DISPOSITION));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        "Shopping list for shopper\nEggs: 9 pcs\nSalt: 6 g"
    );
}

#[tokio::test]
async fn subscriptions() {
    use crate::query::fixtures;
    use axum::http::StatusCode;

    let server = TestServer::new();
    let (reader, token) = server.user("follower").await;
    let (author, _) = server.user("writer").await;
    {
        let mut conn = server.state.db.lock().await;
        let salt = fixtures::ingredient(&mut conn, "Salt", "g");
        let tag = fixtures::tag(&mut conn, "Dinner", "#49B64E");
        for name in ["Soup", "Stew", "Roast"] {
            fixtures::recipe(&mut conn, &author, name, &[&tag], &[(&salt, 1)]);
        }
    }

    let (status, _) = server
        .json(
            Method::POST,
            &format!("/api/users/{}/subscribe", reader.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let subscribe_uri = format!("/api/users/{}/subscribe?recipes_limit=1", author.id);
    let (status, entry) = server
        .json(Method::POST, &subscribe_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["username"], "writer");
    assert_eq!(entry["is_subscribed"], true);
    assert_eq!(entry["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(entry["recipes_count"], 3);

    let (status, _) = server
        .json(Method::POST, &subscribe_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = server
        .json(
            Method::GET,
            "/api/users/subscriptions?recipes_limit=2",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["recipes"].as_array().unwrap().len(), 2);

    let (status, profile) = server
        .json(Method::GET, &format!("/api/users/{}", author.id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["is_subscribed"], true);

    let (status, _) = server
        .json(
            Method::DELETE,
            &format!("/api/users/{}/subscribe", author.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = server
        .json(Method::GET, "/api/users/subscriptions", Some(&token), None)
        .await;
    assert_eq!(list, serde_json::json!([]));
}

#[tokio::test]
async fn ingredient_search() {
    use crate::query::fixtures;
    use axum::http::StatusCode;

    let server = TestServer::new();
    let milk = {
        let mut conn = server.state.db.lock().await;
        fixtures::ingredient(&mut conn, "Oat milk", "ml");
        fixtures::ingredient(&mut conn, "Flour", "g");
        fixtures::ingredient(&mut conn, "Milk", "ml")
    };

    let (status, found) = server
        .json(Method::GET, "/api/ingredients?name=mil", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Milk", "Oat milk"]);

    let (status, one) = server
        .json(Method::GET, &format!("/api/ingredients/{}", milk.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["measurement_unit"], "ml");
}
