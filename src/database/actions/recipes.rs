use std::collections::BTreeSet;

use crate::{
    database::{
        error::ApiError,
        form::Form,
        pagination::PageContext,
        schema::{
            Id, IngredientLine, Recipe, RecipeDraft, RecipeFilter, RecipeRelation, RecipeView,
            RecipeWrite,
        },
        store::Store,
    },
    jwt::SessionData,
    permissions::ActionType,
    NAME_MAX_LENGTH,
};

use super::{page_request, require_recipe, require_user, user_view, validate_name};

impl RecipeWrite {
    /// Field-level checks that need no storage lookups.
    pub fn validate(self) -> Result<RecipeDraft, ApiError> {
        let name = validate_name("name", &self.name, NAME_MAX_LENGTH)?;

        if self.cooking_time < 1 {
            return Err(ApiError::validation("Cooking time must be at least 1 minute"));
        }
        if self.ingredients.is_empty() {
            return Err(ApiError::validation("A recipe needs at least one ingredient"));
        }
        if self.ingredients.iter().any(|i| i.amount < 1) {
            return Err(ApiError::validation("Ingredient amounts must be at least 1"));
        }

        let mut seen = BTreeSet::new();
        if !self.ingredients.iter().all(|i| seen.insert(i.id)) {
            return Err(ApiError::validation("Ingredients must not repeat"));
        }

        let mut seen = BTreeSet::new();
        let tags = self.tags.into_iter().filter(|id| seen.insert(*id)).collect();

        Ok(RecipeDraft {
            name,
            image: self.image.trim().to_string(),
            text: self.text,
            cooking_time: self.cooking_time,
            tags,
            ingredients: self
                .ingredients
                .into_iter()
                .map(|i| IngredientLine {
                    ingredient_id: i.id,
                    amount: i.amount,
                })
                .collect(),
        })
    }
}

async fn check_references<S: Store>(store: &S, draft: &RecipeDraft) -> Result<(), ApiError> {
    for id in draft.tags.iter() {
        if store.get_tag(*id).await?.is_none() {
            return Err(ApiError::Validation(format!("Tag {id} does not exist")));
        }
    }
    for line in draft.ingredients.iter() {
        if store.get_ingredient(line.ingredient_id).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Ingredient {} not found",
                line.ingredient_id
            )));
        }
    }

    Ok(())
}

/// Authors manage their own recipes; everything else needs `ManageAllRecipes`.
fn can_manage(session: &SessionData, recipe: &Recipe) -> Result<(), ApiError> {
    if recipe.author_id == session.user_id {
        session.authenticate(ActionType::ManageOwnRecipes)
    } else {
        session.authenticate(ActionType::ManageAllRecipes)
    }
}

pub async fn build_recipe_view<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    recipe: Recipe,
) -> Result<RecipeView, ApiError> {
    let tags = store.list_recipe_tags(recipe.id).await?;
    let ingredients = store.list_recipe_ingredients(recipe.id).await?;
    let author = require_user(store, recipe.author_id).await?;
    let author = user_view(store, viewer, author).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(session) => (
            store
                .has_relation(RecipeRelation::Favorite, session.user_id, recipe.id)
                .await?,
            store
                .has_relation(RecipeRelation::ShoppingCart, session.user_id, recipe.id)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn create_recipe<S: Store>(
    store: &S,
    session: &SessionData,
    form: RecipeWrite,
) -> Result<RecipeView, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;

    let draft = form.validate()?;
    check_references(store, &draft).await?;

    let recipe_id = store.insert_recipe(session.user_id, &draft).await?;
    log::info!("{} created recipe {recipe_id}", session.username);

    let recipe = require_recipe(store, recipe_id).await?;
    build_recipe_view(store, Some(session), recipe).await
}

/// Replaces the recipe's fields, tags and ingredient lines.
pub async fn update_recipe<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
    form: RecipeWrite,
) -> Result<RecipeView, ApiError> {
    let recipe = require_recipe(store, recipe_id).await?;
    can_manage(session, &recipe)?;

    let draft = form.validate()?;
    check_references(store, &draft).await?;

    store.update_recipe(recipe_id, &draft).await?;
    log::info!("{} updated recipe {recipe_id}", session.username);

    let recipe = require_recipe(store, recipe_id).await?;
    build_recipe_view(store, Some(session), recipe).await
}

pub async fn delete_recipe<S: Store>(
    store: &S,
    session: &SessionData,
    recipe_id: Id,
) -> Result<(), ApiError> {
    let recipe = require_recipe(store, recipe_id).await?;
    can_manage(session, &recipe)?;

    if !store.delete_recipe(recipe_id).await? {
        return Err(ApiError::not_found("Recipe not found"));
    }
    log::info!("{} deleted recipe {recipe_id}", session.username);

    Ok(())
}

pub async fn get_recipe<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    recipe_id: Id,
) -> Result<RecipeView, ApiError> {
    let recipe = require_recipe(store, recipe_id).await?;

    build_recipe_view(store, viewer, recipe).await
}

/// Reads `author`, `tags` (repeatable), `is_favorited` and
/// `is_in_shopping_cart` from the query string.
pub fn recipe_filter(form: &Form, viewer: Option<&SessionData>) -> Result<RecipeFilter, ApiError> {
    let favorited = form.get_bool("is_favorited")?.unwrap_or(false);
    let in_cart = form.get_bool("is_in_shopping_cart")?.unwrap_or(false);
    let viewer_id = viewer.map(|session| session.user_id);

    Ok(RecipeFilter {
        author: form.get_number::<Id>("author")?,
        tags: form.get_all("tags"),
        favorited_by: viewer_id.filter(|_| favorited),
        in_cart_of: viewer_id.filter(|_| in_cart),
        match_nothing: viewer.is_none() && (favorited || in_cart),
    })
}

pub async fn list_recipes<S: Store>(
    store: &S,
    viewer: Option<&SessionData>,
    form: &Form,
    default_page_size: i64,
) -> Result<PageContext<RecipeView>, ApiError> {
    let filter = recipe_filter(form, viewer)?;
    let page = page_request(form, default_page_size)?;

    if filter.match_nothing {
        return Ok(PageContext::no_rows());
    }

    let (rows, count) = store
        .list_recipes(&filter, page.offset(), page.limit())
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for recipe in rows {
        views.push(build_recipe_view(store, viewer, recipe).await?);
    }

    Ok(PageContext::from_rows(views, count, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IngredientAmount, UserRole};

    fn write(ingredients: &[(Id, i32)], tags: &[Id]) -> RecipeWrite {
        RecipeWrite {
            ingredients: ingredients
                .iter()
                .map(|(id, amount)| IngredientAmount {
                    id: *id,
                    amount: *amount,
                })
                .collect(),
            tags: tags.to_vec(),
            image: String::new(),
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
        }
    }

    #[test]
    fn validation_rejects_bad_lines() {
        assert!(write(&[], &[]).validate().is_err());
        assert!(write(&[(1, 0)], &[]).validate().is_err());
        assert!(write(&[(1, 2), (1, 3)], &[]).validate().is_err());

        let mut slow = write(&[(1, 2)], &[]);
        slow.cooking_time = 0;
        assert!(matches!(slow.validate(), Err(ApiError::Validation(_))));

        let mut unnamed = write(&[(1, 2)], &[]);
        unnamed.name = String::from("   ");
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn duplicate_tags_collapse() {
        let draft = write(&[(1, 2), (2, 1)], &[3, 4, 3])
            .validate()
            .expect("valid write");

        assert_eq!(draft.tags, vec![3, 4]);
        assert_eq!(draft.ingredients.len(), 2);
    }

    #[test]
    fn anonymous_relation_filter_matches_nothing() {
        let form = Form::from_data(vec![(String::from("is_favorited"), String::from("1"))]);
        let filter = recipe_filter(&form, None).expect("valid filter");
        assert!(filter.match_nothing);

        let session = SessionData {
            user_id: 4,
            username: String::from("cook"),
            user_role: UserRole::User,
            is_admin: false,
        };
        let filter = recipe_filter(&form, Some(&session)).expect("valid filter");
        assert_eq!(filter.favorited_by, Some(4));
        assert!(!filter.match_nothing);
    }
}
