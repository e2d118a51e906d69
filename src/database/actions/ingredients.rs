use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::ApiError,
    filters::ingredient_prefix_pattern,
    payload::IngredientPayload,
    schema::{Ingredient, Uuid},
};

/// All ingredients, or those whose name starts with `prefix` (case-insensitive).
pub async fn list_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match prefix {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(ingredient_prefix_pattern(prefix))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn create_ingredient(
    session: &SessionData,
    payload: &IngredientPayload,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ApiError> {
    session.authenticate(ActionType::ManageCatalog)?;
    payload.validate()?;

    let ingredient: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        RETURNING *
    ",
    )
    .bind(payload.name.trim())
    .bind(payload.measurement_unit.trim())
    .fetch_one(pool)
    .await?;

    log::info!("Created ingredient {} ({})", ingredient.name, ingredient.id);

    Ok(ingredient)
}

pub async fn delete_ingredient(
    session: &SessionData,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageCatalog)?;

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Ingredient"));
    }

    log::info!("Deleted ingredient {id}");

    Ok(())
}

/// Fails with a field error naming the first id that has no ingredient.
pub async fn ensure_ingredients_exist(
    ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .fetch_all(&mut *conn)
        .await?;

    match ids
        .iter()
        .find(|id| !found.iter().any(|row| row.0 == **id))
    {
        Some(missing) => Err(ApiError::field(
            "ingredients",
            &format!("Invalid pk \"{missing}\" - object does not exist"),
        )),
        None => Ok(()),
    }
}
