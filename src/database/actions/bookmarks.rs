//! Favorites and shopping carts: one user-recipe relation each, toggled the same way.

use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::ApiError,
    projection::RecipeMinified,
    schema::{BookmarkKind, ShoppingListItem, Uuid},
};

use super::recipes::get_recipe;

pub async fn add_bookmark(
    kind: BookmarkKind,
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeMinified, ApiError> {
    session.authenticate(ActionType::ManageOwnBookmarks)?;

    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    // The unique (user_id, recipe_id) constraint settles concurrent adds.
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(kind.already_added().to_string()));
    }

    log::info!(
        "User {} added recipe {} to {}",
        session.user_id,
        recipe.id,
        kind.table()
    );

    Ok(RecipeMinified::from(&recipe))
}

pub async fn remove_bookmark(
    kind: BookmarkKind,
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageOwnBookmarks)?;

    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(ApiError::not_found("Recipe"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::invalid(kind.not_added()));
    }

    log::info!(
        "User {} removed recipe {} from {}",
        session.user_id,
        recipe_id,
        kind.table()
    );

    Ok(())
}

/// Which of `recipe_ids` the user has bookmarked.
pub async fn bookmarked_set(
    kind: BookmarkKind,
    user_id: Uuid,
    recipe_ids: Vec<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn count_bookmarks(
    kind: BookmarkKind,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        kind.table()
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}

/// Ingredient totals over every recipe in the user's shopping cart.
pub async fn shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, ApiError> {
    session.authenticate(ActionType::ManageOwnBookmarks)?;

    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, SUM(ri.amount)::BIGINT AS total
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    if items.is_empty() {
        return String::from("Your shopping cart is empty\n");
    }

    items
        .iter()
        .map(|item| format!("{} ({}) - {}\n", item.name, item.measurement_unit, item.total))
        .collect()
}
