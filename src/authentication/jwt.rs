use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::ApiError;
use crate::schema::{User, UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub session_key: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, session_key: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            session_key,
            role,
            iat,
            exp,
        }
    }
}

/// The authenticated requester, passed explicitly to every handler that
/// acts on someone's behalf.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub session_key: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Owners may always manage their own rows; others need `manage_all`.
    pub fn authenticate_owner(&self, owner_id: Uuid, manage_all: ActionType) -> Result<(), ApiError> {
        if owner_id == self.user_id {
            return Ok(());
        }
        self.authenticate(manage_all)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            session_key: value.session_key,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Invalid signing key: {e}")))
}

pub fn generate_jwt_session(
    user: &User,
    session_key: &str,
    secret: &str,
    lifetime: Duration,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        session_key.to_owned(),
        user.role.to_owned(),
        lifetime,
    );

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("Failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        log::debug!("Rejected session token: {e}");
        ApiError::Unauthorized
    })?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        log::debug!("Rejected session token of user {}: expired", session.user_id);
        return Err(ApiError::Unauthorized);
    }

    Ok(session)
}
