use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::{ApiError, ConfigError};
use crate::schema::UserRole;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub user_role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            user_role: role,
            iat,
            exp,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub user_role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::forbidden(
                "You don't have permission to perform this action",
            ));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.user_role == UserRole::Admin,
            user_role: value.user_role,
        }
    }
}

/// Signs and verifies session tokens with one HMAC-SHA256 secret.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime_hours: i64) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::new("JWT secret must not be empty"));
        }
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|_| ConfigError::new("JWT secret has an invalid length"))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }

    pub fn generate_session(&self, user: &User) -> Result<String, ApiError> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            self.lifetime,
        );

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session: {e}");
            ApiError::Query(format!("{e}"))
        })
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionData, ApiError> {
        let session: JwtSessionData = token.verify_with_key(&self.key).map_err(|e| {
            log::trace!("> Rejected session token: {e}");
            ApiError::Unauthenticated
        })?;

        let now = Local::now().timestamp();
        if (session.exp - now).is_negative() {
            log::trace!("> Session for {} expired", session.username);
            return Err(ApiError::Unauthenticated);
        }

        Ok(session.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
            role: UserRole::User,
        }
    }

    #[test]
    fn issued_session_round_trips() {
        let keys = SessionKeys::new("secret", 1).expect("valid secret");
        let token = keys.generate_session(&user()).expect("signing succeeds");
        let session = keys.verify_session(&token).expect("token verifies");

        assert_eq!(session.user_id, 7);
        assert_eq!(session.user_role, UserRole::User);
        assert!(!session.is_admin);
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let keys = SessionKeys::new("secret", 1).expect("valid secret");
        let other = SessionKeys::new("another secret", 1).expect("valid secret");
        let token = other.generate_session(&user()).expect("signing succeeds");

        assert_eq!(keys.verify_session(&token), Err(ApiError::Unauthenticated));
        assert_eq!(keys.verify_session("garbage"), Err(ApiError::Unauthenticated));

        let expired = SessionKeys::new("secret", -1).expect("valid secret");
        let token = expired.generate_session(&user()).expect("signing succeeds");
        assert_eq!(keys.verify_session(&token), Err(ApiError::Unauthenticated));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(SessionKeys::new("", 1).is_err());
    }
}
