use std::collections::{HashMap, HashSet};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::ApiError,
    filters::RecipeFilter,
    pagination::{PageContext, PageRequest},
    payload::RecipePayload,
    projection::{RecipeRead, UserRead},
    schema::{BookmarkKind, Recipe, RecipePart, RecipeRow, Tag, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    bookmarks::{bookmarked_set, count_bookmarks},
    follows::subscribed_set,
    ingredients::ensure_ingredients_exist,
    tags::{ensure_tags_exist, list_recipe_tags},
    users::get_users_by_ids,
};

pub async fn fetch_recipes(
    filters: &[RecipeFilter],
    page: &PageRequest,
    requester: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRead>, ApiError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    for filter in filters {
        filter.push_sql(&mut builder);
    }
    builder.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());

    let rows: Vec<RecipeRow> = builder.build_query_as().fetch_all(pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let recipes = hydrate_recipes(recipes, requester, pool).await?;

    // Recipe pages report the requester's shopping cart size as `count`.
    let cart_count = match requester {
        Some(session) => count_bookmarks(BookmarkKind::ShoppingCart, session.user_id, pool).await?,
        None => 0,
    };

    Ok(PageContext::from_rows(recipes, total_count, page).with_count(cart_count))
}

pub async fn list_recipe_parts(
    recipe_ids: Vec<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Builds the read projection for a batch of recipes with one query per relation.
pub async fn hydrate_recipes(
    recipes: Vec<Recipe>,
    requester: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRead>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for linked in list_recipe_tags(recipe_ids.clone(), pool).await? {
        tags.entry(linked.recipe_id).or_default().push(linked.tag);
    }

    let mut parts: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    for part in list_recipe_parts(recipe_ids.clone(), pool).await? {
        parts.entry(part.recipe_id).or_default().push(part);
    }

    let authors: HashMap<Uuid, _> = get_users_by_ids(pool, author_ids.clone())
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let (favorited, in_cart, subscribed) = match requester {
        Some(session) => (
            bookmarked_set(
                BookmarkKind::Favorite,
                session.user_id,
                recipe_ids.clone(),
                pool,
            )
            .await?,
            bookmarked_set(
                BookmarkKind::ShoppingCart,
                session.user_id,
                recipe_ids.clone(),
                pool,
            )
            .await?,
            subscribed_set(session.user_id, author_ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).ok_or_else(|| {
                ApiError::Internal(format!("Author of recipe {} is missing", recipe.id))
            })?;

            Ok(RecipeRead {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserRead::from_user(author, subscribed.contains(&author.id)),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_recipe_read(
    id: Uuid,
    requester: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    hydrate_recipes(vec![recipe], requester, pool)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Recipe"))
}

/// Loads a recipe the session may modify: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id, ActionType::ManageAllRecipes)?;
            Ok(recipe)
        }
        None => Err(ApiError::not_found("Recipe")),
    }
}

/// Inserts one join row per ingredient and per tag.
async fn insert_recipe_links(
    recipe_id: Uuid,
    payload: &RecipePayload,
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    ensure_ingredients_exist(&payload.ingredient_ids(), conn).await?;
    ensure_tags_exist(&payload.tags, conn).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(&payload.ingredients, |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    builder.build().execute(&mut *conn).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    builder.push_values(&payload.tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    builder.build().execute(&mut *conn).await?;

    Ok(())
}

/// Creates the recipe with all of its ingredient and tag links, or nothing.
pub async fn create_recipe(
    session: &SessionData,
    payload: &RecipePayload,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    payload.validate(true)?;

    let mut tr = pool.begin().await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(payload.name.trim())
    .bind(image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_recipe_links(id.0, payload, &mut *tr).await?;

    tr.commit().await?;

    log::info!("User {} created recipe {}", session.user_id, id.0);

    Ok(id.0)
}

/// Replaces the ingredient and tag sets and the scalar fields in one
/// transaction. `image` of `None` keeps the stored image.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF, see [`get_recipe_mut`]
pub async fn update_recipe(
    id: Uuid,
    payload: &RecipePayload,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    payload.validate(false)?;

    let mut tr = pool.begin().await?;

    let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tr)
        .await?;
    if locked.is_none() {
        return Err(ApiError::not_found("Recipe"));
    }

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    insert_recipe_links(id, payload, &mut *tr).await?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = $1,
        text = $2,
        cooking_time = $3,
        image = COALESCE($4, image),
        pub_date = NOW()
        WHERE id = $5
    ",
    )
    .bind(payload.name.trim())
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await?;

    tr.commit().await?;

    log::info!("Updated recipe {id}");

    Ok(())
}

/// Join and bookmark rows go with the recipe (ON DELETE CASCADE).
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF, see [`get_recipe_mut`]
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe"));
    }

    log::info!("Deleted recipe {id}");

    Ok(())
}
