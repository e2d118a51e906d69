use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::ApiError,
    pagination::{PageContext, PageRequest},
    payload::validate_follow,
    projection::{RecipeMinified, Subscription, UserRead},
    schema::{User, Uuid},
};

use super::users::get_user_by_id;

/// Which of `following_ids` the user follows.
pub async fn subscribed_set(
    user_id: Uuid,
    following_ids: Vec<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, ApiError> {
    if following_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT following_id FROM follows WHERE user_id = $1 AND following_id = ANY($2)",
    )
    .bind(user_id)
    .bind(following_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_author_recipes(
    author_id: Uuid,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeMinified>, ApiError> {
    let rows: Vec<RecipeMinified> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

async fn build_subscription(
    user: &User,
    is_subscribed: bool,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ApiError> {
    Ok(Subscription {
        user: UserRead::from_user(user, is_subscribed),
        recipes: list_author_recipes(user.id, recipes_limit, pool).await?,
        recipes_count: count_author_recipes(user.id, pool).await?,
    })
}

pub async fn subscribe(
    session: &SessionData,
    following_id: Uuid,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let following = get_user_by_id(pool, following_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    validate_follow(session.user_id, following.id)?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(following.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(String::from(
            "You are already subscribed to this user",
        )));
    }

    log::info!("User {} subscribed to {}", session.user_id, following.id);

    build_subscription(&following, true, recipes_limit, pool).await
}

pub async fn unsubscribe(
    session: &SessionData,
    following_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(pool, following_id).await?.is_none() {
        return Err(ApiError::not_found("User"));
    }

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
        .bind(session.user_id)
        .bind(following_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::invalid("You are not subscribed to this user"));
    }

    log::info!("User {} unsubscribed from {}", session.user_id, following_id);

    Ok(())
}

#[derive(sqlx::FromRow)]
struct FollowedUserRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

pub async fn fetch_subscriptions(
    session: &SessionData,
    page: &PageRequest,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, ApiError> {
    let rows: Vec<FollowedUserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.following_id
        WHERE f.user_id = $1
        ORDER BY f.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);

    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        subscriptions.push(build_subscription(&row.user, true, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(subscriptions, total_count, page))
}
