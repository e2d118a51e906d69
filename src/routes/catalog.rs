//! Tags and ingredients. Lists go through the catalog cache; writes rotate it.

use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::{ingredients, tags},
    cached_list, invalidate_catalog,
    error::ApiError,
    filters::name_has_prefix,
    form::QueryForm,
    jwt::SessionData,
    middleware::with_session,
    payload::{IngredientPayload, TagPayload},
    schema::{Ingredient, Tag, Uuid},
    state::{with_state, AppState},
    CacheKeyType,
};

use super::{json_body, json_reply, no_content, with_form};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list_tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_tags);

    let create_tag = warp::path!("tags")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body::<TagPayload>())
        .and(with_state(state.clone()))
        .and_then(create_tag);

    let retrieve_tag = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(retrieve_tag);

    let delete_tag = warp::path!("tags" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_tag);

    let list_ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(list_ingredients);

    let create_ingredient = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body::<IngredientPayload>())
        .and(with_state(state.clone()))
        .and_then(create_ingredient);

    let retrieve_ingredient = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(retrieve_ingredient);

    let delete_ingredient = warp::path!("ingredients" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(delete_ingredient);

    list_tags
        .or(create_tag)
        .unify()
        .or(retrieve_tag)
        .unify()
        .or(delete_tag)
        .unify()
        .or(list_ingredients)
        .unify()
        .or(create_ingredient)
        .unify()
        .or(retrieve_ingredient)
        .unify()
        .or(delete_ingredient)
        .unify()
        .boxed()
}

async fn list_tags(state: AppState) -> Result<Response, Rejection> {
    let pool = state.pool.clone();
    let list: Vec<Tag> = cached_list(state.cache.clone(), CacheKeyType::Tags.new("all"), || {
        async move { tags::list_tags(&pool).await }
    })
    .await?;

    Ok(json_reply(&list, StatusCode::OK))
}

async fn create_tag(
    session: SessionData,
    payload: TagPayload,
    state: AppState,
) -> Result<Response, Rejection> {
    let tag = tags::create_tag(&session, &payload, &state.pool).await?;
    invalidate_catalog(state.cache.clone()).await;

    Ok(json_reply(&tag, StatusCode::CREATED))
}

async fn retrieve_tag(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let tag = tags::get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn delete_tag(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    tags::delete_tag(&session, id, &state.pool).await?;
    invalidate_catalog(state.cache.clone()).await;

    Ok(no_content())
}

async fn list_ingredients(form: QueryForm, state: AppState) -> Result<Response, Rejection> {
    let prefix = form.get_str("name").map(str::to_owned);

    let list: Vec<Ingredient> = match state.cache.clone() {
        Some(cache) => {
            let pool = state.pool.clone();
            let all: Vec<Ingredient> = cached_list(
                Some(cache),
                CacheKeyType::Ingredients.new("all"),
                || async move { ingredients::list_ingredients(None, &pool).await },
            )
            .await?;

            match prefix {
                Some(prefix) => all
                    .into_iter()
                    .filter(|ingredient| name_has_prefix(&ingredient.name, &prefix))
                    .collect(),
                None => all,
            }
        }
        None => ingredients::list_ingredients(prefix.as_deref(), &state.pool).await?,
    };

    Ok(json_reply(&list, StatusCode::OK))
}

async fn create_ingredient(
    session: SessionData,
    payload: IngredientPayload,
    state: AppState,
) -> Result<Response, Rejection> {
    let ingredient = ingredients::create_ingredient(&session, &payload, &state.pool).await?;
    invalidate_catalog(state.cache.clone()).await;

    Ok(json_reply(&ingredient, StatusCode::CREATED))
}

async fn retrieve_ingredient(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let ingredient = ingredients::get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient"))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}

async fn delete_ingredient(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    ingredients::delete_ingredient(&session, id, &state.pool).await?;
    invalidate_catalog(state.cache.clone()).await;

    Ok(no_content())
}
