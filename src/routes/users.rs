use warp::{
    filters::{path::FullPath, BoxedFilter},
    http::StatusCode,
    reply::Response,
    Filter, Rejection,
};

use crate::{
    actions::{follows, users},
    form::QueryForm,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    payload::{PasswordPayload, UserPayload},
    schema::Uuid,
    state::{with_state, AppState},
    SUBSCRIPTION_RECIPES_LIMIT, USER_COUNT_PER_PAGE,
};

use super::{json_body, json_reply, no_content, with_form};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_form())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users);

    let create = warp::path!("users")
        .and(warp::post())
        .and(json_body::<UserPayload>())
        .and(with_state(state.clone()))
        .and_then(create_user);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(current_user);

    let retrieve = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_user);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body::<PasswordPayload>())
        .and(with_state(state.clone()))
        .and_then(set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_form())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_form())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(unsubscribe);

    list.or(create)
        .unify()
        .or(me)
        .unify()
        .or(retrieve)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn recipes_limit(form: &QueryForm) -> Result<i64, Rejection> {
    Ok(form
        .get_number::<i64>("recipes_limit")?
        .unwrap_or(SUBSCRIPTION_RECIPES_LIMIT)
        .max(0))
}

async fn list_users(
    path: FullPath,
    form: QueryForm,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let page = PageRequest::from_form(path.as_str(), &form, USER_COUNT_PER_PAGE)?;
    let users = users::fetch_users(&page, session.as_ref(), &state.pool).await?;

    Ok(json_reply(&users, StatusCode::OK))
}

async fn create_user(payload: UserPayload, state: AppState) -> Result<Response, Rejection> {
    let user = users::register_user(&payload, &state.pool).await?;

    Ok(json_reply(&user, StatusCode::CREATED))
}

async fn current_user(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let user = users::get_user_read(session.user_id, Some(&session), &state.pool).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn retrieve_user(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let user = users::get_user_read(id, session.as_ref(), &state.pool).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn set_password(
    session: SessionData,
    payload: PasswordPayload,
    state: AppState,
) -> Result<Response, Rejection> {
    users::set_password(&session, &payload, &state.pool).await?;

    Ok(no_content())
}

async fn list_subscriptions(
    path: FullPath,
    form: QueryForm,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let page = PageRequest::from_form(path.as_str(), &form, USER_COUNT_PER_PAGE)?;
    let subscriptions =
        follows::fetch_subscriptions(&session, &page, recipes_limit(&form)?, &state.pool).await?;

    Ok(json_reply(&subscriptions, StatusCode::OK))
}

async fn subscribe(
    id: Uuid,
    form: QueryForm,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let subscription =
        follows::subscribe(&session, id, recipes_limit(&form)?, &state.pool).await?;

    Ok(json_reply(&subscription, StatusCode::CREATED))
}

async fn unsubscribe(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    follows::unsubscribe(&session, id, &state.pool).await?;

    Ok(no_content())
}
