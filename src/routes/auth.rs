use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::users,
    jwt::SessionData,
    middleware::with_session,
    payload::LoginPayload,
    projection::TokenRead,
    state::{with_state, AppState},
};

use super::{json_body, json_reply, no_content};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginPayload>())
        .and(with_state(state.clone()))
        .and_then(login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(logout);

    login.or(logout).unify().boxed()
}

async fn login(payload: LoginPayload, state: AppState) -> Result<Response, Rejection> {
    let auth_token =
        users::login_user(&payload.email, &payload.password, &state.config, &state.pool).await?;

    Ok(json_reply(&TokenRead { auth_token }, StatusCode::OK))
}

async fn logout(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    users::logout_user(&session, &state.pool).await?;

    Ok(no_content())
}
