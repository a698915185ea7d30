use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    error::ApiError,
    schema::{
        Id, Ingredient, IngredientLine, NewIngredient, NewTag, NewUserRecord, Recipe, RecipeDraft,
        RecipeFilter, RecipeIngredient, RecipeRelation, RecipeShort, ShoppingListEntry, Tag, User,
    },
    store::Store,
};

#[derive(Default)]
struct MemoryState {
    last_id: Id,

    users: BTreeMap<Id, User>,
    ingredients: BTreeMap<Id, Ingredient>,
    tags: BTreeMap<Id, Tag>,

    recipes: BTreeMap<Id, Recipe>,
    recipe_tags: BTreeMap<Id, Vec<Id>>,
    recipe_lines: BTreeMap<Id, Vec<IngredientLine>>,

    favorites: BTreeSet<(Id, Id)>,
    shopping_cart: BTreeSet<(Id, Id)>,
    follows: BTreeSet<(Id, Id)>,
}

impl MemoryState {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn relation(&self, relation: RecipeRelation) -> &BTreeSet<(Id, Id)> {
        match relation {
            RecipeRelation::Favorite => &self.favorites,
            RecipeRelation::ShoppingCart => &self.shopping_cart,
        }
    }

    fn relation_mut(&mut self, relation: RecipeRelation) -> &mut BTreeSet<(Id, Id)> {
        match relation {
            RecipeRelation::Favorite => &mut self.favorites,
            RecipeRelation::ShoppingCart => &mut self.shopping_cart,
        }
    }

    /// Same checks the Postgres foreign keys and unique constraints make.
    fn check_links(&self, draft: &RecipeDraft) -> Result<(), ApiError> {
        if draft.tags.iter().any(|id| !self.tags.contains_key(id)) {
            return Err(ApiError::validation("Tag does not exist"));
        }
        if draft
            .ingredients
            .iter()
            .any(|line| !self.ingredients.contains_key(&line.ingredient_id))
        {
            return Err(ApiError::not_found("Ingredient does not exist"));
        }

        let distinct: BTreeSet<Id> = draft.ingredients.iter().map(|l| l.ingredient_id).collect();
        if distinct.len() != draft.ingredients.len() {
            return Err(ApiError::validation("Ingredients must not repeat"));
        }

        Ok(())
    }

    fn write_links(&mut self, recipe_id: Id, draft: &RecipeDraft) {
        let mut tags = draft.tags.clone();
        tags.sort_unstable();
        tags.dedup();

        self.recipe_tags.insert(recipe_id, tags);
        self.recipe_lines.insert(recipe_id, draft.ingredients.clone());
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if filter.match_nothing {
            return false;
        }
        if filter.author.is_some_and(|author| recipe.author_id != author) {
            return false;
        }
        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .get(&recipe.id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| self.tags.get(id))
                        .any(|tag| filter.tags.contains(&tag.slug))
                })
                .unwrap_or(false);
            if !tagged {
                return false;
            }
        }
        if let Some(user_id) = filter.favorited_by {
            if !self.favorites.contains(&(user_id, recipe.id)) {
                return false;
            }
        }
        if let Some(user_id) = filter.in_cart_of {
            if !self.shopping_cart.contains(&(user_id, recipe.id)) {
                return false;
            }
        }

        true
    }
}

fn page_of<T: Clone>(rows: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();

    (page, total)
}

/// `Store` kept in process memory; used by the test-suite and by the server
/// when no database is configured. Every operation runs under one lock, so
/// relation inserts are atomic in the same way a unique index is.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUserRecord) -> Result<User, ApiError> {
        let mut state = self.state.write().await;

        let taken = state.users.values().any(|u| {
            u.email.eq_ignore_ascii_case(&user.email) || u.username == user.username
        });
        if taken {
            return Err(ApiError::already_exists(
                "A user with that email or username already exists",
            ));
        }

        let id = state.next_id();
        let row = User {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: user.role,
        };
        state.users.insert(id, row.clone());

        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;

        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError> {
        let state = self.state.read().await;

        Ok(page_of(state.users.values().cloned().collect(), offset, limit))
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, ApiError> {
        let mut state = self.state.write().await;

        if state.ingredients.values().any(|i| i.name == ingredient.name) {
            return Err(ApiError::already_exists(
                "An ingredient with that name already exists",
            ));
        }

        let id = state.next_id();
        let row = Ingredient {
            id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        state.ingredients.insert(id, row.clone());

        Ok(row)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError> {
        Ok(self.state.read().await.ingredients.get(&id).cloned())
    }

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Ingredient> = state.ingredients.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(rows)
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, ApiError> {
        let mut state = self.state.write().await;

        if state
            .tags
            .values()
            .any(|t| t.name == tag.name || t.color.eq_ignore_ascii_case(&tag.color))
        {
            return Err(ApiError::already_exists(
                "A tag with that name or color already exists",
            ));
        }

        let id = state.next_id();
        let row = Tag {
            id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        state.tags.insert(id, row.clone());

        Ok(row)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError> {
        Ok(self.state.read().await.tags.get(&id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        Ok(self.state.read().await.tags.values().cloned().collect())
    }

    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Id, ApiError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&author_id) {
            return Err(ApiError::not_found("No user exists with specified id"));
        }
        state.check_links(draft)?;

        let id = state.next_id();
        state.recipes.insert(
            id,
            Recipe {
                id,
                author_id,
                name: draft.name.to_owned(),
                image: draft.image.to_owned(),
                text: draft.text.to_owned(),
                cooking_time: draft.cooking_time,
            },
        );
        state.write_links(id, draft);

        Ok(id)
    }

    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<(), ApiError> {
        let mut state = self.state.write().await;

        if !state.recipes.contains_key(&id) {
            return Err(ApiError::not_found("No recipe exists with specified id"));
        }
        state.check_links(draft)?;

        if let Some(recipe) = state.recipes.get_mut(&id) {
            recipe.name = draft.name.to_owned();
            recipe.image = draft.image.to_owned();
            recipe.text = draft.text.to_owned();
            recipe.cooking_time = draft.cooking_time;
        }
        state.write_links(id, draft);

        Ok(())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError> {
        let mut state = self.state.write().await;

        if state.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        state.recipe_tags.remove(&id);
        state.recipe_lines.remove(&id);
        state.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        state.shopping_cart.retain(|(_, recipe_id)| *recipe_id != id);

        Ok(true)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError> {
        Ok(self.state.read().await.recipes.get(&id).cloned())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), ApiError> {
        let state = self.state.read().await;
        let rows: Vec<Recipe> = state
            .recipes
            .values()
            .rev()
            .filter(|recipe| state.matches(recipe, filter))
            .cloned()
            .collect();

        Ok(page_of(rows, offset, limit))
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, ApiError> {
        let state = self.state.read().await;

        Ok(state
            .recipe_tags
            .get(&recipe_id)
            .map(|ids| ids.iter().filter_map(|id| state.tags.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<RecipeIngredient>, ApiError> {
        let state = self.state.read().await;

        Ok(state
            .recipe_lines
            .get(&recipe_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| {
                        state.ingredients.get(&line.ingredient_id).map(|i| RecipeIngredient {
                            id: i.id,
                            name: i.name.to_owned(),
                            measurement_unit: i.measurement_unit.to_owned(),
                            amount: line.amount,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<RecipeShort>, ApiError> {
        let state = self.state.read().await;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|recipe| recipe.author_id == author_id)
            .take(limit)
            .map(RecipeShort::from)
            .collect())
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, ApiError> {
        let state = self.state.read().await;

        Ok(state
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .count() as i64)
    }

    async fn insert_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let mut state = self.state.write().await;

        if !state.recipes.contains_key(&recipe_id) {
            return Err(ApiError::not_found("No recipe exists with specified id"));
        }

        Ok(state.relation_mut(relation).insert((user_id, recipe_id)))
    }

    async fn delete_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let mut state = self.state.write().await;

        Ok(state.relation_mut(relation).remove(&(user_id, recipe_id)))
    }

    async fn has_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let state = self.state.read().await;

        Ok(state.relation(relation).contains(&(user_id, recipe_id)))
    }

    async fn insert_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&author_id) {
            return Err(ApiError::not_found("No user exists with specified id"));
        }

        Ok(state.follows.insert((follower_id, author_id)))
    }

    async fn delete_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        Ok(self
            .state
            .write()
            .await
            .follows
            .remove(&(follower_id, author_id)))
    }

    async fn is_following(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .contains(&(follower_id, author_id)))
    }

    async fn list_following(
        &self,
        follower_id: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), ApiError> {
        let state = self.state.read().await;
        let rows: Vec<User> = state
            .follows
            .iter()
            .filter(|(follower, _)| *follower == follower_id)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();

        Ok(page_of(rows, offset, limit))
    }

    async fn cart_ingredient_totals(
        &self,
        user_id: Id,
    ) -> Result<Vec<ShoppingListEntry>, ApiError> {
        let state = self.state.read().await;
        let mut totals: BTreeMap<Id, i64> = BTreeMap::new();

        state
            .shopping_cart
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, recipe_id)| state.recipe_lines.get(recipe_id))
            .flatten()
            .for_each(|line| {
                *totals.entry(line.ingredient_id).or_insert(0) += i64::from(line.amount);
            });

        Ok(totals
            .into_iter()
            .filter_map(|(ingredient_id, total_amount)| {
                state
                    .ingredients
                    .get(&ingredient_id)
                    .map(|i| ShoppingListEntry {
                        name: i.name.to_owned(),
                        measurement_unit: i.measurement_unit.to_owned(),
                        total_amount,
                    })
            })
            .collect())
    }
}
