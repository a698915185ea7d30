use async_trait::async_trait;

use super::{
    error::ApiError,
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUserRecord, Recipe, RecipeDraft, RecipeFilter,
        RecipeIngredient, RecipeRelation, RecipeShort, ShoppingListEntry, Tag, User,
    },
};

/// Storage collaborator shared by the Postgres and in-memory backends.
///
/// Relation inserts report whether a row was created; uniqueness is decided
/// by the backend in the same step as the write, so two concurrent adds of
/// the same pair can never both succeed.
#[async_trait]
pub trait Store: Send + Sync + Clone + 'static {
    // Users

    /// Fails with `AlreadyExists` when the email or username is taken.
    async fn create_user(&self, user: NewUserRecord) -> Result<User, ApiError>;

    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Users ordered by id, with the total row count.
    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError>;

    // Reference data

    /// Fails with `AlreadyExists` when the name is taken.
    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, ApiError>;

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError>;

    /// All ingredients ordered by name.
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, ApiError>;

    /// Fails with `AlreadyExists` when the name or color is taken.
    async fn create_tag(&self, tag: NewTag) -> Result<Tag, ApiError>;

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;

    // Recipes

    /// Writes the recipe, its tag links and ingredient lines atomically.
    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Id, ApiError>;

    /// Replaces the recipe fields, tag links and ingredient lines atomically.
    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<(), ApiError>;

    /// Deletes the recipe and everything hanging off it. Returns false when
    /// no such recipe existed.
    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError>;

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError>;

    /// Newest first, with the total row count.
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), ApiError>;

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, ApiError>;

    /// Ingredient lines in the order they were written.
    async fn list_recipe_ingredients(&self, recipe_id: Id)
        -> Result<Vec<RecipeIngredient>, ApiError>;

    /// The author's recipes, newest first, optionally limited.
    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<RecipeShort>, ApiError>;

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, ApiError>;

    // Favorites and shopping cart

    /// Returns false when the pair was already present.
    async fn insert_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError>;

    /// Returns false when the pair was absent.
    async fn delete_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError>;

    async fn has_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError>;

    // Subscriptions

    /// Returns false when the pair was already present.
    async fn insert_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError>;

    /// Returns false when the pair was absent.
    async fn delete_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError>;

    async fn is_following(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError>;

    /// Authors followed by the user, ordered by id, with the total row count.
    async fn list_following(
        &self,
        follower_id: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), ApiError>;

    // Shopping list

    /// Amounts of every ingredient across the user's cart recipes, grouped
    /// by ingredient and summed. Order is unspecified.
    async fn cart_ingredient_totals(&self, user_id: Id)
        -> Result<Vec<ShoppingListEntry>, ApiError>;
}
