//! Runs against a live database:
//! `DATABASE_URL=postgres://... cargo test --test postgres_test -- --ignored`
mod common;

use common::{create_ingredient, create_recipe, create_user};
use recipe_share_sdk::{
    actions::{recipes, relations, shopping_list::download_shopping_cart},
    error::ApiError,
    form::Form,
    postgres::PgStore,
    schema::{RecipeRelation, UserRole},
    store::Store,
};
use sqlx::{postgres::PgPoolOptions, Executor};

const SCHEMA: &str = include_str!("../sql/schema.sql");

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL is set");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("database reachable");

    let (users_table,): (Option<String>,) =
        sqlx::query_as("SELECT to_regclass('public.users')::TEXT")
            .fetch_one(&pool)
            .await
            .expect("catalog lookup");
    if users_table.is_none() {
        pool.execute(SCHEMA).await.expect("schema applied");
    }

    PgStore::new(pool)
}

// Rows are never cleaned up, so names carry a per-run suffix.
fn unique(name: &str) -> String {
    format!("{name}-{}", chrono::Utc::now().timestamp_micros())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn cart_totals_are_grouped_in_sql() {
    let store = store().await;
    let cook = create_user(&store, &unique("cook"), UserRole::User).await;
    let flour_name = unique("Flour");
    let egg_name = unique("Egg");
    let flour = create_ingredient(&store, &flour_name, "g").await;
    let egg = create_ingredient(&store, &egg_name, "pcs").await;

    let a = create_recipe(&store, &cook, "Pancakes", &[(flour.id, 200), (egg.id, 2)], &[]).await;
    let b = create_recipe(&store, &cook, "Bread", &[(flour.id, 150)], &[]).await;
    for id in [a, b] {
        relations::add_to_shopping_cart(&store, &cook.session, id)
            .await
            .expect("added");
    }

    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert_eq!(
        list.lines(),
        vec![
            format!("{egg_name} (pcs) - 2"),
            format!("{flour_name} (g) - 350"),
        ]
    );

    recipes::delete_recipe(&store, &cook.session, a)
        .await
        .expect("deleted");
    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert_eq!(list.lines(), vec![format!("{flour_name} (g) - 150")]);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_favorite_hits_the_unique_constraint() {
    let store = store().await;
    let cook = create_user(&store, &unique("fan"), UserRole::User).await;
    let egg = create_ingredient(&store, &unique("Egg"), "pcs").await;
    let omelette = create_recipe(&store, &cook, "Omelette", &[(egg.id, 3)], &[]).await;

    relations::add_favorite(&store, &cook.session, omelette)
        .await
        .expect("first add");
    assert!(matches!(
        relations::add_favorite(&store, &cook.session, omelette).await,
        Err(ApiError::AlreadyExists(_))
    ));

    relations::remove_favorite(&store, &cook.session, omelette)
        .await
        .expect("removed");
    assert!(matches!(
        relations::remove_favorite(&store, &cook.session, omelette).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(!store
        .has_relation(RecipeRelation::Favorite, cook.id, omelette)
        .await
        .expect("lookup"));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn page_past_the_end_keeps_the_total() {
    let store = store().await;
    let cook = create_user(&store, &unique("author"), UserRole::User).await;
    let rice = create_ingredient(&store, &unique("Rice"), "g").await;
    create_recipe(&store, &cook, "Risotto", &[(rice.id, 250)], &[]).await;
    create_recipe(&store, &cook, "Pilaf", &[(rice.id, 300)], &[]).await;

    let author = cook.id.to_string();
    let form = Form::from_data(vec![
        ("author".to_string(), author),
        ("page".to_string(), "5".to_string()),
        ("limit".to_string(), "1".to_string()),
    ]);
    let page = recipes::list_recipes(&store, None, &form, 6)
        .await
        .expect("listing");

    assert!(page.results.is_empty());
    assert_eq!(page.count, 2);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, Some(2));
}
