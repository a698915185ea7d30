#![allow(dead_code)]
//! Fixtures shared by the integration tests. The helpers take any `Store`;
//! most suites run them against `MemoryStore`.

use recipe_share_sdk::{
    actions::recipes,
    jwt::{SessionData, SessionKeys},
    memory::MemoryStore,
    schema::{
        Id, Ingredient, IngredientAmount, NewIngredient, NewTag, NewUserRecord, RecipeWrite, Tag,
        UserRole,
    },
    store::Store,
    AppState, ReferenceCache,
};

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestUser {
    pub id: Id,
    pub token: String,
    pub session: SessionData,
}

impl TestUser {
    pub fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }
}

pub fn keys() -> SessionKeys {
    SessionKeys::new(JWT_SECRET, 1).expect("valid secret")
}

pub fn state(store: MemoryStore) -> AppState<MemoryStore> {
    AppState::new(store, keys(), ReferenceCache::disabled(), 6)
}

pub async fn create_user<S: Store>(store: &S, username: &str, role: UserRole) -> TestUser {
    let user = store
        .create_user(NewUserRecord {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: String::from("not-a-hash"),
            role,
        })
        .await
        .expect("user created");

    let keys = keys();
    let token = keys.generate_session(&user).expect("session signed");
    let session = keys.verify_session(&token).expect("session verifies");

    TestUser {
        id: user.id,
        token,
        session,
    }
}

pub async fn create_ingredient<S: Store>(store: &S, name: &str, unit: &str) -> Ingredient {
    store
        .create_ingredient(NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        })
        .await
        .expect("ingredient created")
}

pub async fn create_tag<S: Store>(store: &S, name: &str, color: &str, slug: &str) -> Tag {
    store
        .create_tag(NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        })
        .await
        .expect("tag created")
}

pub fn recipe_write(name: &str, lines: &[(Id, i32)], tags: &[Id]) -> RecipeWrite {
    RecipeWrite {
        ingredients: lines
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
        image: String::from("recipes/images/placeholder.png"),
        name: name.to_string(),
        text: String::from("Mix everything together."),
        cooking_time: 15,
    }
}

pub async fn create_recipe<S: Store>(
    store: &S,
    author: &TestUser,
    name: &str,
    lines: &[(Id, i32)],
    tags: &[Id],
) -> Id {
    recipes::create_recipe(store, &author.session, recipe_write(name, lines, tags))
        .await
        .expect("recipe created")
        .id
}
