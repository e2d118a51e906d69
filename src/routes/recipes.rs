use warp::{
    filters::{path::FullPath, BoxedFilter},
    http::StatusCode,
    reply::Response,
    Filter, Rejection, Reply,
};

use crate::{
    actions::{bookmarks, recipes},
    error::ApiError,
    filters::RecipeFilter,
    form::QueryForm,
    jwt::SessionData,
    media::{remove_recipe_image, save_recipe_image},
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    payload::RecipePayload,
    permissions::ActionType,
    schema::{BookmarkKind, Uuid},
    state::{with_state, AppState},
    RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME,
};

use super::{json_body, json_reply, no_content, with_form};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_form())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body::<RecipePayload>())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let retrieve = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_recipe);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(json_body::<RecipePayload>())
        .and(with_state(state.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(bookmark_routes(BookmarkKind::Favorite, "favorite", state.clone()))
        .unify()
        .or(bookmark_routes(
            BookmarkKind::ShoppingCart,
            "shopping_cart",
            state,
        ))
        .unify()
        .boxed()
}

/// `POST` and `DELETE` on `/recipes/{id}/<segment>`.
fn bookmark_routes(
    kind: BookmarkKind,
    segment: &'static str,
    state: AppState,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id: Uuid, session: SessionData, state: AppState| {
            add_bookmark(kind, id, session, state)
        });

    let remove = path
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(move |id: Uuid, session: SessionData, state: AppState| {
            remove_bookmark(kind, id, session, state)
        });

    add.or(remove).unify().boxed()
}

async fn list_recipes(
    path: FullPath,
    form: QueryForm,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let filters = RecipeFilter::from_form(&form, session.as_ref().map(|s| s.user_id))?;
    let page = PageRequest::from_form(path.as_str(), &form, RECIPE_COUNT_PER_PAGE)?;
    let recipes = recipes::fetch_recipes(&filters, &page, session.as_ref(), &state.pool).await?;

    Ok(json_reply(&recipes, StatusCode::OK))
}

async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    payload.validate(true)?;

    let data = payload
        .image
        .as_deref()
        .ok_or_else(|| ApiError::field("image", "This field is required"))?;
    let image = save_recipe_image(&state.config.media_root, data).await?;

    let id = match recipes::create_recipe(&session, &payload, &image, &state.pool).await {
        Ok(id) => id,
        Err(e) => {
            remove_recipe_image(&state.config.media_root, &image).await;
            return Err(e.into());
        }
    };

    let recipe = recipes::get_recipe_read(id, Some(&session), &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn retrieve_recipe(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = recipes::get_recipe_read(id, session.as_ref(), &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn update_recipe(
    id: Uuid,
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<Response, Rejection> {
    let current = recipes::get_recipe_mut(id, &session, &state.pool).await?;
    payload.validate(false)?;

    let image = match payload.image.as_deref() {
        Some(data) => Some(save_recipe_image(&state.config.media_root, data).await?),
        None => None,
    };

    match recipes::update_recipe(id, &payload, image.as_deref(), &state.pool).await {
        Ok(()) => {
            if image.is_some() {
                remove_recipe_image(&state.config.media_root, &current.image).await;
            }
        }
        Err(e) => {
            if let Some(image) = image {
                remove_recipe_image(&state.config.media_root, &image).await;
            }
            return Err(e.into());
        }
    }

    let recipe = recipes::get_recipe_read(id, Some(&session), &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn delete_recipe(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let recipe = recipes::get_recipe_mut(id, &session, &state.pool).await?;
    recipes::delete_recipe(recipe.id, &state.pool).await?;
    remove_recipe_image(&state.config.media_root, &recipe.image).await;

    Ok(no_content())
}

async fn add_bookmark(
    kind: BookmarkKind,
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = bookmarks::add_bookmark(kind, &session, id, &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn remove_bookmark(
    kind: BookmarkKind,
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    bookmarks::remove_bookmark(kind, &session, id, &state.pool).await?;

    Ok(no_content())
}

async fn download_shopping_cart(
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let items = bookmarks::shopping_list(&session, &state.pool).await?;
    let body = bookmarks::render_shopping_list(&items);

    let reply = warp::reply::with_header(body, "Content-Type", "text/plain; charset=utf-8");
    let reply = warp::reply::with_header(
        reply,
        "Content-Disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );

    Ok(reply.into_response())
}
