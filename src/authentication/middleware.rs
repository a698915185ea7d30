use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::{error::ApiError, SESSION_COOKIE};

use super::jwt::{SessionData, SessionKeys};

/// `Authorization: Token <jwt>` / `Bearer <jwt>`, falling back to the session cookie.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .as_deref()
                .and_then(parse_authorization)
                .or(cookie)
        })
}

pub fn parse_authorization(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    match scheme {
        "Token" | "Bearer" => Some(token.to_string()),
        _ => None,
    }
}

fn with_keys(keys: SessionKeys) -> impl Filter<Extract = (SessionKeys,), Error = Infallible> + Clone {
    warp::any().map(move || keys.clone())
}

/// Rejects with `ApiError::Unauthenticated` unless a valid session is present.
pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    session_token()
        .and(with_keys(keys))
        .and_then(|token: Option<String>, keys: SessionKeys| async move {
            match token {
                Some(token) => keys.verify_session(&token).map_err(warp::reject::custom),
                None => Err(warp::reject::custom(ApiError::Unauthenticated)),
            }
        })
}

/// Anonymous callers and invalid tokens both yield `None`.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    session_token()
        .and(with_keys(keys))
        .map(|token: Option<String>, keys: SessionKeys| {
            token.and_then(|token| keys.verify_session(&token).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_schemes() {
        assert_eq!(parse_authorization("Token abc"), Some(String::from("abc")));
        assert_eq!(parse_authorization("Bearer  abc "), Some(String::from("abc")));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token"), None);
    }
}
