use warp::{reject::Rejection, Filter};

use crate::{
    actions::users::session_exists,
    error::ApiError,
    state::{with_state, AppState},
};

use super::jwt::{verify_jwt_session, SessionData};

const AUTH_SCHEMES: &[&str] = &["Token", "Bearer"];

/// Extracts the token from `Authorization: Token <jwt>` (or `Bearer`).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() || !AUTH_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return None;
    }
    Some(token)
}

async fn authenticate(header: &str, state: &AppState) -> Result<SessionData, ApiError> {
    let token = parse_authorization(header).ok_or(ApiError::Unauthorized)?;
    let claims = verify_jwt_session(token, &state.config.jwt_secret)?;

    // Logged-out sessions keep a valid signature until they expire.
    if !session_exists(&claims.session_key, claims.user_id, &state.pool).await? {
        log::debug!("Rejected revoked session of user {}", claims.user_id);
        return Err(ApiError::Unauthorized);
    }

    Ok(claims.into())
}

/// Requires an authenticated requester.
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            let result: Result<SessionData, Rejection> = match header {
                Some(header) => authenticate(&header, &state).await.map_err(Rejection::from),
                None => Err(ApiError::Unauthorized.into()),
            };
            result
        })
}

/// Anonymous requests pass as `None`; a bad token is still rejected.
pub fn with_possible_session(
    state: AppState,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            let result: Result<Option<SessionData>, Rejection> = match header {
                Some(header) => authenticate(&header, &state)
                    .await
                    .map(Some)
                    .map_err(Rejection::from),
                None => Ok(None),
            };
            result
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("abc"), None);
        assert_eq!(parse_authorization("Token "), None);
    }
}
