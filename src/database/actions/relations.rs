use crate::{
    database::{
        error::ApiError,
        schema::{Id, RecipeRelation, RecipeShort, SubscriptionView},
        store::Store,
    },
    jwt::SessionData,
    permissions::ActionType,
};

use super::{
    require_recipe, require_user,
    users::{check_recipes_limit, subscription_view},
};

fn relation_action(relation: RecipeRelation) -> ActionType {
    match relation {
        RecipeRelation::Favorite => ActionType::ManageOwnFavorites,
        RecipeRelation::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

/// Fails with `AlreadyExists` when the recipe is already in the relation.
/// The store decides that in the same step as the insert.
pub async fn add_recipe_relation<S: Store>(
    store: &S,
    session: &SessionData,
    relation: RecipeRelation,
    recipe_id: Id,
) -> Result<RecipeShort, ApiError> {
    session.authenticate(relation_action(relation))?;
    let recipe = require_recipe(store, recipe_id).await?;

    if !store
        .insert_relation(relation, session.user_id, recipe_id)
        .await?
    {
        return Err(ApiError::AlreadyExists(format!(
            "Recipe is already in {}",
            relation.label()
        )));
    }

    log::trace!("> Added recipe {recipe_id} to {} of {}", relation.label(), session.username);
    Ok(RecipeShort::from(&recipe))
}

pub async fn remove_recipe_relation<S: Store>(
    store: &S,
    session: &SessionData,
    relation: RecipeRelation,
    recipe_id: Id,
) -> Result<(), ApiError> {
    session.authenticate(relation_action(relation))?;
    require_recipe(store, recipe_id).await?;

    if !store
        .delete_relation(relation, session.user_id, recipe_id)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Recipe is not in {}",
            relation.label()
        )));
    }

    log::trace!("> Removed recipe {recipe_id} from {} of {}", relation.label(), session.username);
    Ok(())
}

pub async fn add_favorite<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
) -> Result<RecipeShort, ApiError> {
    add_recipe_relation(store, session, RecipeRelation::Favorite, recipe_id).await
}

pub async fn remove_favorite<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
) -> Result<(), ApiError> {
    remove_recipe_relation(store, session, RecipeRelation::Favorite, recipe_id).await
}

pub async fn add_to_shopping_cart<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
) -> Result<RecipeShort, ApiError> {
    add_recipe_relation(store, session, RecipeRelation::ShoppingCart, recipe_id).await
}

pub async fn remove_from_shopping_cart<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
) -> Result<(), ApiError> {
    remove_recipe_relation(store, session, RecipeRelation::ShoppingCart, recipe_id).await
}

/// Self-follow is refused before the author is even looked up.
pub async fn follow<S: Store>(
    store: &S,
    session: &SessionData,
    author_id: Id,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, ApiError> {
    if session.user_id == author_id {
        return Err(ApiError::SelfFollow);
    }
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    check_recipes_limit(recipes_limit)?;

    let author = require_user(store, author_id).await?;
    if !store.insert_follow(session.user_id, author_id).await? {
        return Err(ApiError::already_exists(
            "You are already subscribed to this user",
        ));
    }

    log::trace!("> {} subscribed to {}", session.username, author.username);
    subscription_view(store, author, recipes_limit).await
}

pub async fn unfollow<S: Store>(
    store: &S,
    session: &SessionData,
    author_id: Id,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    require_user(store, author_id).await?;

    if !store.delete_follow(session.user_id, author_id).await? {
        return Err(ApiError::not_found("You are not subscribed to this user"));
    }

    log::trace!("> {} unsubscribed from {author_id}", session.username);
    Ok(())
}
