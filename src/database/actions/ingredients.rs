use crate::{
    cache::cache::{CacheKeyType, IngredientList, ReferenceCache},
    database::{
        error::ApiError,
        schema::{Id, Ingredient, NewIngredient},
        store::Store,
    },
    jwt::SessionData,
    permissions::ActionType,
    NAME_MAX_LENGTH,
};

use super::validate_name;

/// Ingredients ordered by name, optionally narrowed to a case-insensitive
/// name prefix.
pub async fn list_ingredients<S: Store>(
    store: &S,
    cache: &ReferenceCache,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, ApiError> {
    let list = cache
        .get_or_fetch(CacheKeyType::Ingredients, || async {
            store
                .list_ingredients()
                .await
                .map(|ingredients| IngredientList { ingredients })
        })
        .await?;

    let Some(prefix) = name_prefix.map(|p| p.trim().to_lowercase()) else {
        return Ok(list.ingredients);
    };

    Ok(list
        .ingredients
        .into_iter()
        .filter(|i| i.name.to_lowercase().starts_with(&prefix))
        .collect())
}

pub async fn get_ingredient<S: Store>(store: &S, id: Id) -> Result<Ingredient, ApiError> {
    store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient not found"))
}

pub async fn create_ingredient<S: Store>(
    store: &S,
    cache: &ReferenceCache,
    session: &SessionData,
    form: NewIngredient,
) -> Result<Ingredient, ApiError> {
    session.authenticate(ActionType::ManageIngredients)?;

    let ingredient = store
        .create_ingredient(NewIngredient {
            name: validate_name("name", &form.name, NAME_MAX_LENGTH)?,
            measurement_unit: validate_name(
                "measurement_unit",
                &form.measurement_unit,
                NAME_MAX_LENGTH,
            )?,
        })
        .await?;

    cache.invalidate(CacheKeyType::Ingredients).await;
    log::info!("Created ingredient {} ({})", ingredient.name, ingredient.id);

    Ok(ingredient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::memory::MemoryStore, schema::UserRole};

    fn admin() -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("admin"),
            user_role: UserRole::Admin,
            is_admin: true,
        }
    }

    async fn seed(store: &MemoryStore, cache: &ReferenceCache, name: &str, unit: &str) {
        create_ingredient(
            store,
            cache,
            &admin(),
            NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            },
        )
        .await
        .expect("ingredient created");
    }

    #[tokio::test]
    async fn prefix_search_ignores_case() {
        let store = MemoryStore::new();
        let cache = ReferenceCache::disabled();
        seed(&store, &cache, "Flour", "g").await;
        seed(&store, &cache, "flaxseed", "g").await;
        seed(&store, &cache, "Egg", "pcs").await;

        let names: Vec<String> = list_ingredients(&store, &cache, Some("FL"))
            .await
            .expect("listing")
            .into_iter()
            .map(|i| i.name)
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.to_lowercase().starts_with("fl")));
        assert_eq!(list_ingredients(&store, &cache, None).await.map(|l| l.len()), Ok(3));
    }

    #[tokio::test]
    async fn only_admins_create_ingredients() {
        let store = MemoryStore::new();
        let cache = ReferenceCache::disabled();
        let user = SessionData {
            user_role: UserRole::User,
            is_admin: false,
            ..admin()
        };

        let result = create_ingredient(
            &store,
            &cache,
            &user,
            NewIngredient {
                name: String::from("Salt"),
                measurement_unit: String::from("g"),
            },
        )
        .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }
}
