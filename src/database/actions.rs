pub mod ingredients;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod tags;
pub mod users;

use crate::jwt::SessionData;

use super::{
    error::ApiError,
    form::Form,
    pagination::PageRequest,
    schema::{Id, Recipe, User, UserView},
    store::Store,
};

pub async fn require_recipe<S: Store>(store: &S, recipe_id: Id) -> Result<Recipe, ApiError> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

pub async fn require_user<S: Store>(store: &S, user_id: Id) -> Result<User, ApiError> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// `is_subscribed` is relative to the viewer and false for anonymous callers.
pub async fn user_view<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    user: User,
) -> Result<UserView, ApiError> {
    let is_subscribed = match viewer {
        Some(session) if session.user_id != user.id => {
            store.is_following(session.user_id, user.id).await?
        }
        _ => false,
    };

    Ok(UserView::from_user(user, is_subscribed))
}

/// Reads `?page=` and `?limit=`.
pub fn page_request(form: &Form, default_size: i64) -> Result<PageRequest, ApiError> {
    let page = form.get_number::<i64>("page")?;
    let limit = form.get_number::<i64>("limit")?;

    Ok(PageRequest::new(page, limit, default_size))
}

pub(crate) fn validate_name(field: &str, value: &str, max_length: usize) -> Result<String, ApiError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ApiError::Validation(format!("'{field}' must not be empty")));
    }
    if value.chars().count() > max_length {
        return Err(ApiError::Validation(format!(
            "'{field}' must be at most {max_length} characters"
        )));
    }

    Ok(value.to_string())
}
