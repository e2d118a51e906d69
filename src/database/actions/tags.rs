use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::ApiError,
    payload::TagPayload,
    schema::{LinkedRecipeTag, Tag, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn create_tag(
    session: &SessionData,
    payload: &TagPayload,
    pool: &Pool<Postgres>,
) -> Result<Tag, ApiError> {
    session.authenticate(ActionType::ManageCatalog)?;
    payload.validate()?;
    let color = payload.color()?;

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(&payload.name)
            .bind(color)
            .bind(&payload.slug)
            .fetch_one(pool)
            .await?;

    log::info!("Created tag {} ({})", tag.slug, tag.id);

    Ok(tag)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn delete_tag(
    session: &SessionData,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageCatalog)?;

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Tag"));
    }

    log::info!("Deleted tag {id}");

    Ok(())
}

/// Tags of the given recipes, each row carrying its recipe id.
pub async fn list_recipe_tags(
    recipe_ids: Vec<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, ApiError> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Fails with a field error naming the first id that has no tag.
pub async fn ensure_tags_exist(ids: &[Uuid], conn: &mut PgConnection) -> Result<(), ApiError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .fetch_all(&mut *conn)
        .await?;

    match ids
        .iter()
        .find(|id| !found.iter().any(|row| row.0 == **id))
    {
        Some(missing) => Err(ApiError::field(
            "tags",
            &format!("Invalid pk \"{missing}\" - object does not exist"),
        )),
        None => Ok(()),
    }
}
