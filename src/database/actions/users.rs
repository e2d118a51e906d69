use std::collections::HashSet;

use crate::{
    authentication::{
        cryptography::{generate_session_key, hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
    },
    config::Config,
    error::ApiError,
    pagination::{PageContext, PageRequest},
    payload::{PasswordPayload, UserPayload},
    projection::{UserCreated, UserRead},
    schema::{User, Uuid},
};

use sqlx::{Pool, Postgres};

use super::follows::subscribed_set;

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_users_by_ids(pool: &Pool<Postgres>, ids: Vec<Uuid>) -> Result<Vec<User>, ApiError> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(
    payload: &UserPayload,
    pool: &Pool<Postgres>,
) -> Result<UserCreated, ApiError> {
    payload.validate()?;
    let password = hash_password(&payload.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(password)
    .fetch_one(pool)
    .await?;

    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(user.into())
}

/// Checks credentials, opens a session row and returns the signed token.
pub async fn login_user(
    email: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let invalid = || ApiError::invalid("Unable to log in with provided credentials");

    let user = get_user(pool, email).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password)? {
        return Err(invalid());
    }

    let session_key = generate_session_key();
    sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2)")
        .bind(&session_key)
        .bind(user.id)
        .execute(pool)
        .await?;

    log::debug!("Opened session for user {}", user.id);

    generate_jwt_session(
        &user,
        &session_key,
        &config.jwt_secret,
        config.session_lifetime(),
    )
}

pub async fn logout_user(session: &SessionData, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM auth_tokens WHERE key = $1 AND user_id = $2")
        .bind(&session.session_key)
        .bind(session.user_id)
        .execute(pool)
        .await?;

    log::debug!("Closed session for user {}", session.user_id);

    Ok(())
}

pub async fn session_exists(
    session_key: &str,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM auth_tokens WHERE key = $1 AND user_id = $2")
            .bind(session_key)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Changes the password and closes every other session of the user.
pub async fn set_password(
    session: &SessionData,
    payload: &PasswordPayload,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    payload.validate()?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !verify_password(&payload.current_password, &user.password)? {
        return Err(ApiError::field("current_password", "Invalid password"));
    }

    let password = hash_password(&payload.new_password)?;

    let mut tr = pool.begin().await?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(&mut *tr)
        .await?;
    sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND key <> $2")
        .bind(user.id)
        .bind(&session.session_key)
        .execute(&mut *tr)
        .await?;
    tr.commit().await?;

    log::info!("User {} changed their password", user.id);

    Ok(())
}

pub async fn get_user_read(
    user_id: Uuid,
    requester: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserRead, ApiError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let subscribed = match requester {
        Some(session) => subscribed_set(session.user_id, vec![user.id], pool).await?,
        None => HashSet::new(),
    };

    Ok(UserRead::from_user(&user, subscribed.contains(&user.id)))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

pub async fn fetch_users(
    page: &PageRequest,
    requester: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRead>, ApiError> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let users: Vec<User> = rows.into_iter().map(|row| row.user).collect();

    let subscribed = match requester {
        Some(session) => {
            let ids = users.iter().map(|user| user.id).collect();
            subscribed_set(session.user_id, ids, pool).await?
        }
        None => HashSet::new(),
    };

    Ok(PageContext::from_rows(users, total_count, page)
        .map(|user| UserRead::from_user(&user, subscribed.contains(&user.id))))
}
