//! End-to-end flows against a migrated Postgres database. Each test gets its
//! own database from `sqlx::test`, so `DATABASE_URL` must point at a server
//! the test user may create databases on.

use pantry::{config::Config, routes::routes, state::AppState};
use serde_json::{json, Value};
use sqlx::PgPool;
use warp::{http::StatusCode, test::request, Filter, Reply};

const PASSWORD: &str = "long-enough-password";
// 1x1 transparent png
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn config() -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        database_max_connections: 1,
        redis_url: None,
        jwt_secret: String::from("integration-secret"),
        session_lifetime_hours: 1,
        media_root: std::env::temp_dir().join("pantry-flow-tests"),
    }
}

fn api(
    pool: PgPool,
) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone + 'static {
    routes(AppState::from_pool(pool, config()))
}

async fn send<F>(
    api: &F,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let mut builder = request().method(method).path(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Token {token}"));
    }
    if let Some(body) = body {
        builder = builder
            .header("content-type", "application/json")
            .body(body.to_string());
    }

    let response = builder.reply(api).await;
    let value = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), value)
}

async fn register<F>(api: &F, username: &str, email: &str) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let body = json!({
        "email": email,
        "username": username,
        "first_name": "Test",
        "last_name": "Cook",
        "password": PASSWORD,
    });
    send(api, "POST", "/api/users", None, Some(body)).await
}

async fn login<F>(api: &F, email: &str) -> String
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let body = json!({ "email": email, "password": PASSWORD });
    let (status, body) = send(api, "POST", "/api/auth/token/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["auth_token"].as_str().unwrap().to_string()
}

/// Registers and logs in a regular user, returning its id and token.
async fn cook<F>(api: &F, username: &str) -> (i64, String)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let email = format!("{username}@example.com");
    let (status, body) = register(api, username, &email).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_i64().unwrap();
    (id, login(api, &email).await)
}

/// Catalog of one tag and three ingredients, written by an admin.
struct Catalog {
    tag: i64,
    milk: i64,
    flour: i64,
    millet: i64,
}

async fn catalog<F>(api: &F, pool: &PgPool) -> Catalog
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let (status, body) = register(api, "admin", "admin@example.com").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = 'admin'")
        .execute(pool)
        .await
        .unwrap();
    let admin = login(api, "admin@example.com").await;

    let tag = json!({ "name": "Lunch", "color": "#008000", "slug": "lunch" });
    let (status, tag) = send(api, "POST", "/api/tags", Some(&admin), Some(tag)).await;
    assert_eq!(status, StatusCode::CREATED, "{tag}");

    let mut ids = vec![];
    for (name, unit) in [("Milk", "ml"), ("Flour", "g"), ("Millet", "g")] {
        let body = json!({ "name": name, "measurement_unit": unit });
        let (status, body) =
            send(api, "POST", "/api/ingredients", Some(&admin), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["id"].as_i64().unwrap());
    }

    Catalog {
        tag: tag["id"].as_i64().unwrap(),
        milk: ids[0],
        flour: ids[1],
        millet: ids[2],
    }
}

fn recipe(name: &str, ingredients: &[(i64, i64)], tags: &[i64], cooking_time: i64) -> Value {
    json!({
        "name": name,
        "text": "Mix and bake.",
        "cooking_time": cooking_time,
        "image": PIXEL,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
        "tags": tags,
    })
}

fn ingredient_ids(recipe: &Value) -> Vec<i64> {
    recipe["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|part| part["id"].as_i64().unwrap())
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn email_is_unique_regardless_of_case(pool: PgPool) {
    let api = api(pool);

    let (status, _) = register(&api, "first", "Cook@x.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&api, "second", "cook@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"][0].is_string(), "{body}");

    let token = login(&api, "COOK@X.COM").await;
    let (status, me) = send(&api, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "first");
}

#[sqlx::test(migrations = "./migrations")]
async fn recipe_requires_positive_cooking_time(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, token) = cook(&api, "cook").await;

    let body = recipe("Porridge", &[(catalog.milk, 200)], &[catalog.tag], 0);
    let (status, body) = send(&api, "POST", "/api/recipes", Some(&token), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["cooking_time"][0].is_string(), "{body}");
}

#[sqlx::test(migrations = "./migrations")]
async fn favorite_and_cart_toggle_once_each_way(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, token) = cook(&api, "cook").await;

    let body = recipe("Porridge", &[(catalog.milk, 200)], &[catalog.tag], 10);
    let (status, created) = send(&api, "POST", "/api/recipes", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["is_favorited"], false);
    let id = created["id"].as_i64().unwrap();

    for segment in ["favorite", "shopping_cart"] {
        let path = format!("/api/recipes/{id}/{segment}");

        let (status, minified) = send(&api, "POST", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED, "{segment}");
        assert_eq!(minified["id"], id);

        let (status, _) = send(&api, "POST", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{segment}");

        let (status, _) = send(&api, "DELETE", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{segment}");

        let (status, _) = send(&api, "DELETE", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{segment}");
    }

    let path = "/api/recipes/99999/favorite";
    let (status, _) = send(&api, "POST", path, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn flags_follow_the_requester(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, token) = cook(&api, "cook").await;

    let body = recipe("Porridge", &[(catalog.milk, 200)], &[catalog.tag], 10);
    let (_, created) = send(&api, "POST", "/api/recipes", Some(&token), Some(body)).await;
    let id = created["id"].as_i64().unwrap();

    for segment in ["favorite", "shopping_cart"] {
        let path = format!("/api/recipes/{id}/{segment}");
        let (status, _) = send(&api, "POST", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = send(&api, "GET", "/api/recipes", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["is_favorited"], true);
    assert_eq!(page["results"][0]["is_in_shopping_cart"], true);

    let (status, page) = send(&api, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 0);
    assert_eq!(page["results"][0]["is_favorited"], false);
    assert_eq!(page["results"][0]["is_in_shopping_cart"], false);

    let (_, page) = send(&api, "GET", "/api/recipes?is_favorited=1", None, None).await;
    assert_eq!(page["results"].as_array().unwrap().len(), 1);

    let (_, other) = cook(&api, "other").await;
    let (_, page) = send(&api, "GET", "/api/recipes?is_favorited=1", Some(&other), None).await;
    assert!(page["results"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn update_replaces_the_ingredient_set(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, token) = cook(&api, "cook").await;

    let body = recipe(
        "Pancakes",
        &[(catalog.milk, 300), (catalog.flour, 200)],
        &[catalog.tag],
        20,
    );
    let (_, created) = send(&api, "POST", "/api/recipes", Some(&token), Some(body)).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(ingredient_ids(&created), vec![catalog.milk, catalog.flour]);

    let mut body = recipe("Millet pancakes", &[(catalog.millet, 150)], &[catalog.tag], 25);
    body.as_object_mut().unwrap().remove("image");
    let path = format!("/api/recipes/{id}");
    let (status, updated) = send(&api, "PATCH", &path, Some(&token), Some(body)).await;

    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["name"], "Millet pancakes");
    assert_eq!(ingredient_ids(&updated), vec![catalog.millet]);
    assert_eq!(updated["ingredients"][0]["amount"], 150);
    assert_eq!(updated["image"], created["image"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_update_leaves_the_recipe_untouched(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, token) = cook(&api, "cook").await;

    let body = recipe("Pancakes", &[(catalog.milk, 300)], &[catalog.tag], 20);
    let (_, created) = send(&api, "POST", "/api/recipes", Some(&token), Some(body)).await;
    let id = created["id"].as_i64().unwrap();
    let path = format!("/api/recipes/{id}");

    let body = recipe(
        "Renamed",
        &[(catalog.flour, 100), (99999, 1)],
        &[catalog.tag],
        5,
    );
    let (status, body) = send(&api, "PATCH", &path, Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["ingredients"][0].is_string(), "{body}");

    let (status, current) = send(&api, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["name"], "Pancakes");
    assert_eq!(current["cooking_time"], 20);
    assert_eq!(ingredient_ids(&current), vec![catalog.milk]);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_the_author_may_change_a_recipe(pool: PgPool) {
    let api = api(pool.clone());
    let catalog = catalog(&api, &pool).await;
    let (_, author) = cook(&api, "author").await;
    let (_, stranger) = cook(&api, "stranger").await;

    let body = recipe("Pancakes", &[(catalog.milk, 300)], &[catalog.tag], 20);
    let (_, created) = send(&api, "POST", "/api/recipes", Some(&author), Some(body)).await;
    let path = format!("/api/recipes/{}", created["id"]);

    let (status, _) = send(&api, "DELETE", &path, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&api, "DELETE", &path, Some(&author), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&api, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn follows_reject_self_and_duplicates(pool: PgPool) {
    let api = api(pool);
    let (me, token) = cook(&api, "reader").await;
    let (author, _) = cook(&api, "writer").await;

    let path = format!("/api/users/{me}/subscribe");
    let (status, _) = send(&api, "POST", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let path = format!("/api/users/{author}/subscribe");
    let (status, subscription) = send(&api, "POST", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subscription["is_subscribed"], true);
    assert_eq!(subscription["recipes_count"], 0);

    let (status, _) = send(&api, "POST", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = send(&api, "GET", "/api/users/subscriptions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["results"][0]["id"], author);

    let (status, _) = send(&api, "DELETE", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&api, "DELETE", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn ingredient_search_matches_name_prefix(pool: PgPool) {
    let api = api(pool.clone());
    catalog(&api, &pool).await;

    let (status, list) = send(&api, "GET", "/api/ingredients?name=mil", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let mut names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|ingredient| ingredient["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Milk", "Millet"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn tag_with_unknown_color_is_a_field_error(pool: PgPool) {
    let api = api(pool.clone());
    catalog(&api, &pool).await;
    let admin = login(&api, "admin@example.com").await;

    let tag = json!({ "name": "Dinner", "color": "purple", "slug": "dinner" });
    let (status, body) = send(&api, "POST", "/api/tags", Some(&admin), Some(tag)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["color"][0].is_string(), "{body}");
}
