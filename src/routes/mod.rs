//! The HTTP surface: one warp filter tree under `/api`, plus `/media`.

use std::convert::Infallible;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
    },
    reply::Response,
    Filter, Rejection, Reply,
};

use crate::{error::ApiError, form::QueryForm, state::AppState, MAX_BODY_SIZE};

mod auth;
mod catalog;
mod recipes;
mod users;

pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        users::routes(state.clone())
            .or(auth::routes(state.clone()))
            .unify()
            .or(catalog::routes(state.clone()))
            .unify()
            .or(recipes::routes(state.clone()))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.config.media_root.clone()))
        .map(|file: warp::filters::fs::File| file.into_response());

    api.or(media)
        .unify()
        .recover(handle_rejection)
        .with(warp::log("pantry::http"))
}

/// Raw query string as a [`QueryForm`]; a missing query is an empty form.
fn with_form() -> impl Filter<Extract = (QueryForm,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .map(|raw: String| QueryForm::from_query(&raw))
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn error_reply(status: StatusCode, detail: &str) -> Response {
    json_reply(&json!({ "detail": detail }), status)
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not found"));
    }

    if let Some(error) = err.find::<ApiError>() {
        if let ApiError::Internal(info) = error {
            log::error!("{info}");
        }
        return Ok(json_reply(&error.body(), error.status()));
    }

    let reply = if let Some(e) = err.find::<BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, &format!("Malformed request body: {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        error_reply(StatusCode::BAD_REQUEST, "Malformed query string")
    } else if err.find::<PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if err.find::<LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "Content-Length is required")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected an application/json body",
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(reply)
}
