mod common;

use common::{create_ingredient, create_recipe, create_user};
use recipe_share_sdk::{
    actions::{recipes, relations, shopping_list::download_shopping_cart},
    error::ApiError,
    memory::MemoryStore,
    schema::UserRole,
};

#[tokio::test]
async fn empty_cart_produces_header_only() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;

    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");

    assert!(list.is_empty());
    assert_eq!(list.render(), "Shopping list\n");
}

#[tokio::test]
async fn shared_ingredients_are_summed_across_recipes() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let flour = create_ingredient(&store, "Flour", "g").await;
    let egg = create_ingredient(&store, "Egg", "pcs").await;

    let a = create_recipe(&store, &cook, "Pancakes", &[(flour.id, 200), (egg.id, 2)], &[]).await;
    let b = create_recipe(&store, &cook, "Bread", &[(flour.id, 150)], &[]).await;

    relations::add_to_shopping_cart(&store, &cook.session, a)
        .await
        .expect("added A");
    relations::add_to_shopping_cart(&store, &cook.session, b)
        .await
        .expect("added B");

    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");

    assert_eq!(list.lines(), vec!["Egg (pcs) - 2", "Flour (g) - 350"]);
    assert_eq!(
        list.render(),
        "Shopping list\nEgg (pcs) - 2\nFlour (g) - 350\n"
    );
    assert_eq!(list.filename(), "shopping-list.txt");
}

#[tokio::test]
async fn report_only_covers_the_callers_cart() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let guest = create_user(&store, "guest", UserRole::User).await;
    let salt = create_ingredient(&store, "Salt", "g").await;
    let milk = create_ingredient(&store, "Milk", "ml").await;

    let soup = create_recipe(&store, &cook, "Soup", &[(salt.id, 5)], &[]).await;
    let shake = create_recipe(&store, &cook, "Shake", &[(milk.id, 300)], &[]).await;

    relations::add_to_shopping_cart(&store, &cook.session, soup)
        .await
        .expect("cook adds soup");
    relations::add_to_shopping_cart(&store, &guest.session, shake)
        .await
        .expect("guest adds shake");

    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert_eq!(list.lines(), vec!["Salt (g) - 5"]);

    // Favorites never feed the shopping list.
    relations::add_favorite(&store, &cook.session, shake)
        .await
        .expect("favorited");
    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert_eq!(list.lines(), vec!["Salt (g) - 5"]);
}

#[tokio::test]
async fn removed_and_deleted_recipes_leave_the_report() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let rice = create_ingredient(&store, "Rice", "g").await;

    let risotto = create_recipe(&store, &cook, "Risotto", &[(rice.id, 250)], &[]).await;
    let pilaf = create_recipe(&store, &cook, "Pilaf", &[(rice.id, 300)], &[]).await;
    for id in [risotto, pilaf] {
        relations::add_to_shopping_cart(&store, &cook.session, id)
            .await
            .expect("added");
    }

    relations::remove_from_shopping_cart(&store, &cook.session, risotto)
        .await
        .expect("removed");
    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert_eq!(list.lines(), vec!["Rice (g) - 300"]);

    recipes::delete_recipe(&store, &cook.session, pilaf)
        .await
        .expect("deleted");
    let list = download_shopping_cart(&store, &cook.session)
        .await
        .expect("report built");
    assert!(list.is_empty());

    assert!(matches!(
        relations::remove_from_shopping_cart(&store, &cook.session, pilaf).await,
        Err(ApiError::NotFound(_))
    ));
}
