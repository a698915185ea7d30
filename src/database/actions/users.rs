use crate::{
    authentication::cryptography::{hash_password, verify_password},
    database::{
        error::ApiError,
        pagination::{PageContext, PageRequest},
        schema::{
            AuthToken, Credentials, Id, NewUserRecord, SubscriptionView, User, UserRole, UserView,
            UserWrite,
        },
        store::Store,
    },
    jwt::{SessionData, SessionKeys},
    NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH,
};

use super::{require_user, user_view, validate_name};

/// Hashes the password and stores a new `user`-role account.
pub async fn register_user<S: Store>(store: &S, form: UserWrite) -> Result<UserView, ApiError> {
    let email = form.email.trim().to_lowercase();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::validation("Enter a valid email address"));
    }
    let username = validate_name("username", &form.username, NAME_MAX_LENGTH)?;

    if form.password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    let password = hash_password(&form.password)?;
    let user = store
        .create_user(NewUserRecord {
            email,
            username,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            password,
            role: UserRole::User,
        })
        .await?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(UserView::from_user(user, false))
}

pub async fn login_user<S: Store>(
    store: &S,
    keys: &SessionKeys,
    credentials: Credentials,
) -> Result<AuthToken, ApiError> {
    let email = credentials.email.trim().to_lowercase();
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid credentials"))?;

    if !verify_password(&credentials.password, &user.password) {
        log::trace!("> Rejected login for {}", user.username);
        return Err(ApiError::validation("Invalid credentials"));
    }

    Ok(AuthToken {
        auth_token: keys.generate_session(&user)?,
    })
}

pub async fn get_user<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    user_id: Id,
) -> Result<UserView, ApiError> {
    let user = require_user(store, user_id).await?;

    user_view(store, viewer, user).await
}

pub async fn me<S: Store>(store: &S, session: &SessionData) -> Result<UserView, ApiError> {
    let user = require_user(store, session.user_id).await?;

    Ok(UserView::from_user(user, false))
}

pub async fn list_users<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    page: PageRequest,
) -> Result<PageContext<UserView>, ApiError> {
    let (rows, count) = store.list_users(page.offset(), page.limit()).await?;

    let mut views = Vec::with_capacity(rows.len());
    for user in rows {
        views.push(user_view(store, viewer, user).await?);
    }

    Ok(PageContext::from_rows(views, count, page))
}

pub(crate) fn check_recipes_limit(recipes_limit: Option<i64>) -> Result<(), ApiError> {
    if recipes_limit.is_some_and(|limit| limit < 0) {
        return Err(ApiError::validation("'recipes_limit' must not be negative"));
    }
    Ok(())
}

/// An author as seen by one of their followers.
pub async fn subscription_view<S: Store>(
    store: &S,
    author: User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, ApiError> {
    check_recipes_limit(recipes_limit)?;

    let recipes = store.list_author_recipes(author.id, recipes_limit).await?;
    let recipes_count = store.count_author_recipes(author.id).await?;

    Ok(SubscriptionView {
        user: UserView::from_user(author, true),
        recipes,
        recipes_count,
    })
}

pub async fn list_subscriptions<S: Store>(
    store: &S,
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
) -> Result<PageContext<SubscriptionView>, ApiError> {
    let (authors, count) = store
        .list_following(session.user_id, page.offset(), page.limit())
        .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        views.push(subscription_view(store, author, recipes_limit).await?);
    }

    Ok(PageContext::from_rows(views, count, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;

    fn write(email: &str, username: &str, password: &str) -> UserWrite {
        UserWrite {
            email: email.to_string(),
            username: username.to_string(),
            first_name: String::from("Ada"),
            last_name: String::new(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let store = MemoryStore::new();

        assert!(matches!(
            register_user(&store, write("no-at-sign", "ada", "long enough")).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            register_user(&store, write("ada@example.com", " ", "long enough")).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            register_user(&store, write("ada@example.com", "ada", "short")).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        register_user(&store, write("ada@example.com", "ada", "long enough"))
            .await
            .expect("first registration");

        let second = register_user(&store, write("Ada@Example.com", "ada2", "long enough")).await;
        assert!(matches!(second, Err(ApiError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let store = MemoryStore::new();
        let keys = SessionKeys::new("secret", 1).expect("valid secret");
        let user = register_user(&store, write("ada@example.com", "ada", "long enough"))
            .await
            .expect("registration");

        let token = login_user(
            &store,
            &keys,
            Credentials {
                email: String::from("ada@example.com"),
                password: String::from("long enough"),
            },
        )
        .await
        .expect("login succeeds");
        assert_eq!(
            keys.verify_session(&token.auth_token).map(|s| s.user_id),
            Ok(user.id)
        );

        let wrong = login_user(
            &store,
            &keys,
            Credentials {
                email: String::from("ada@example.com"),
                password: String::from("not the password"),
            },
        )
        .await;
        assert_eq!(wrong.map(|t| t.auth_token), Err(ApiError::validation("Invalid credentials")));
    }
}
