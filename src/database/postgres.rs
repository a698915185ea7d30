use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder, Transaction};

use super::{
    error::{constraint_error, ApiError},
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUserRecord, Recipe, RecipeDraft, RecipeFilter,
        RecipeIngredient, RecipeRelation, RecipeShort, ShoppingListEntry, Tag, User,
    },
    store::Store,
};

#[derive(sqlx::FromRow)]
struct CountedRecipe {
    #[sqlx(flatten)]
    recipe: Recipe,
    count: i64,
}

#[derive(sqlx::FromRow)]
struct CountedUser {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

fn split_counted<T, R>(rows: Vec<R>, split: impl Fn(R) -> (T, i64)) -> (Vec<T>, i64) {
    let mut total_count = 0;
    let rows = rows
        .into_iter()
        .map(|row| {
            let (row, count) = split(row);
            total_count = count;
            row
        })
        .collect();

    (rows, total_count)
}

/// `Store` backed by the Postgres schema in `sql/schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        log::info!("Connected to Postgres ({max_connections} connections)");
        Ok(Self::new(pool))
    }
}

async fn write_recipe_links(
    tx: &mut Transaction<'static, Postgres>,
    recipe_id: Id,
    draft: &RecipeDraft,
) -> Result<(), ApiError> {
    if !draft.tags.is_empty() {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query.push_values(&draft.tags, |mut row, tag_id| {
            row.push_bind(recipe_id).push_bind(*tag_id);
        });
        query.push(" ON CONFLICT DO NOTHING");

        query.build().execute(&mut **tx).await.map_err(|e| {
            constraint_error(
                e,
                ApiError::validation("Tags must not repeat"),
                ApiError::validation("Tag does not exist"),
            )
        })?;
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(&draft.ingredients, |mut row, line| {
        row.push_bind(recipe_id)
            .push_bind(line.ingredient_id)
            .push_bind(line.amount);
    });

    query.build().execute(&mut **tx).await.map_err(|e| {
        constraint_error(
            e,
            ApiError::validation("Ingredients must not repeat"),
            ApiError::not_found("Ingredient does not exist"),
        )
    })?;

    Ok(())
}

fn push_recipe_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    if filter.match_nothing {
        query.push(" AND FALSE");
    }
    if let Some(author_id) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author_id);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUserRecord) -> Result<User, ApiError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name, password, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ",
        )
        .bind(user.email)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                ApiError::already_exists("A user with that email or username already exists"),
                ApiError::validation("Invalid user"),
            )
        })?;

        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError> {
        let rows: Vec<CountedUser> = sqlx::query_as(
            "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let (users, count) = split_counted(rows, |row| (row.user, row.count));

        if users.is_empty() && offset > 0 {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await?;
            return Ok((users, count));
        }

        Ok((users, count))
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, ApiError> {
        let row: Ingredient = sqlx::query_as(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
        )
        .bind(ingredient.name)
        .bind(ingredient.measurement_unit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                ApiError::already_exists("An ingredient with that name already exists"),
                ApiError::validation("Invalid ingredient"),
            )
        })?;

        Ok(row)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, ApiError> {
        let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, ApiError> {
        let row: Tag =
            sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
                .bind(tag.name)
                .bind(tag.color)
                .bind(tag.slug)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    constraint_error(
                        e,
                        ApiError::already_exists("A tag with that name or color already exists"),
                        ApiError::validation("Invalid tag"),
                    )
                })?;

        Ok(row)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Id, ApiError> {
        let mut tx = self.pool.begin().await?;

        let id: (Id,) = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        ",
        )
        .bind(author_id)
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        write_recipe_links(&mut tx, id.0, draft).await?;
        tx.commit().await?;

        Ok(id.0)
    }

    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
        )
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("No recipe exists with specified id"));
        }

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        write_recipe_links(&mut tx, id, draft).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError> {
        // Lines, tag links, favorites and cart entries go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), ApiError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
        push_recipe_filter(&mut query, filter);

        query
            .push(" ORDER BY r.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<CountedRecipe> = query.build_query_as().fetch_all(&self.pool).await?;
        let (recipes, count) = split_counted(rows, |row| (row.recipe, row.count));

        if recipes.is_empty() && offset > 0 {
            let mut query: QueryBuilder<Postgres> =
                QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
            push_recipe_filter(&mut query, filter);
            let (count,): (i64,) = query.build_query_as().fetch_one(&self.pool).await?;
            return Ok((recipes, count));
        }

        Ok((recipes, count))
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, ApiError> {
        let rows: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<RecipeIngredient>, ApiError> {
        let rows: Vec<RecipeIngredient> = sqlx::query_as(
            "
            SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<RecipeShort>, ApiError> {
        // LIMIT NULL is no limit.
        let rows: Vec<RecipeShort> = sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1
            ORDER BY id DESC
            LIMIT $2
        ",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn insert_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            relation.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                ApiError::AlreadyExists(format!("Recipe is already in {}", relation.label())),
                ApiError::not_found("No recipe exists with specified id"),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            relation.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_relation(
        &self,
        relation: RecipeRelation,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, ApiError> {
        let row: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
            relation.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn insert_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                ApiError::already_exists("You are already subscribed to this author"),
                ApiError::not_found("No user exists with specified id"),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
            .bind(follower_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: Id, author_id: Id) -> Result<bool, ApiError> {
        let row: Option<(Id,)> =
            sqlx::query_as("SELECT author_id FROM follows WHERE follower_id = $1 AND author_id = $2")
                .bind(follower_id)
                .bind(author_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    async fn list_following(
        &self,
        follower_id: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), ApiError> {
        let rows: Vec<CountedUser> = sqlx::query_as(
            "
            SELECT u.*, COUNT(*) OVER() AS count
            FROM follows f
            INNER JOIN users u ON u.id = f.author_id
            WHERE f.follower_id = $1
            ORDER BY u.id
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(follower_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let (authors, count) = split_counted(rows, |row| (row.user, row.count));

        if authors.is_empty() && offset > 0 {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
                    .bind(follower_id)
                    .fetch_one(&self.pool)
                    .await?;
            return Ok((authors, count));
        }

        Ok((authors, count))
    }

    async fn cart_ingredient_totals(
        &self,
        user_id: Id,
    ) -> Result<Vec<ShoppingListEntry>, ApiError> {
        let rows: Vec<ShoppingListEntry> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount)::BIGINT AS total_amount
            FROM shopping_cart c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.id, i.name, i.measurement_unit
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
