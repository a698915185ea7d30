mod common;

use common::{create_ingredient, create_recipe, create_tag, create_user, recipe_write};
use recipe_share_sdk::{
    actions::{recipes, relations},
    error::ApiError,
    form::Form,
    memory::MemoryStore,
    schema::{RecipeRelation, UserRole},
    store::Store,
};

fn form(pairs: &[(&str, &str)]) -> Form {
    Form::from_data(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[tokio::test]
async fn created_recipe_is_returned_in_full() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let flour = create_ingredient(&store, "Flour", "g").await;
    let egg = create_ingredient(&store, "Egg", "pcs").await;
    let breakfast = create_tag(&store, "Breakfast", "#E26C2D", "breakfast").await;

    let view = recipes::create_recipe(
        &store,
        &cook.session,
        recipe_write(
            "Pancakes",
            &[(flour.id, 200), (egg.id, 2)],
            &[breakfast.id, breakfast.id],
        ),
    )
    .await
    .expect("recipe created");

    assert_eq!(view.author.id, cook.id);
    assert_eq!(view.tags, vec![breakfast]);
    assert_eq!(view.ingredients.len(), 2);
    assert_eq!(view.ingredients[0].name, "Flour");
    assert_eq!(view.ingredients[0].amount, 200);
    assert!(!view.is_favorited);
    assert!(!view.is_in_shopping_cart);
}

#[tokio::test]
async fn invalid_writes_are_rejected() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let flour = create_ingredient(&store, "Flour", "g").await;

    let cases = [
        recipe_write("Nothing", &[], &[]),
        recipe_write("Zero", &[(flour.id, 0)], &[]),
        recipe_write("Twice", &[(flour.id, 1), (flour.id, 2)], &[]),
        recipe_write("Unknown tag", &[(flour.id, 1)], &[77]),
    ];
    for write in cases {
        let name = write.name.clone();
        let result = recipes::create_recipe(&store, &cook.session, write).await;
        assert!(
            matches!(result, Err(ApiError::Validation(_))),
            "{name} should fail validation"
        );
    }

    let mut instant = recipe_write("Instant", &[(flour.id, 1)], &[]);
    instant.cooking_time = 0;
    assert!(matches!(
        recipes::create_recipe(&store, &cook.session, instant).await,
        Err(ApiError::Validation(_))
    ));

    assert!(matches!(
        recipes::create_recipe(&store, &cook.session, recipe_write("Ghost", &[(9999, 1)], &[])).await,
        Err(ApiError::NotFound(_))
    ));

    let (_, count) = store
        .list_recipes(&Default::default(), 0, 10)
        .await
        .expect("listing");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn only_authors_and_admins_edit_recipes() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let stranger = create_user(&store, "stranger", UserRole::User).await;
    let admin = create_user(&store, "admin", UserRole::Admin).await;
    let flour = create_ingredient(&store, "Flour", "g").await;
    let sugar = create_ingredient(&store, "Sugar", "g").await;

    let id = create_recipe(&store, &cook, "Cake", &[(flour.id, 300)], &[]).await;

    assert!(matches!(
        recipes::update_recipe(
            &store,
            &stranger.session,
            id,
            recipe_write("Stolen cake", &[(flour.id, 1)], &[])
        )
        .await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        recipes::delete_recipe(&store, &stranger.session, id).await,
        Err(ApiError::Forbidden(_))
    ));

    let view = recipes::update_recipe(
        &store,
        &cook.session,
        id,
        recipe_write("Sweet cake", &[(flour.id, 250), (sugar.id, 100)], &[]),
    )
    .await
    .expect("author updates");
    assert_eq!(view.name, "Sweet cake");
    assert_eq!(view.ingredients.len(), 2);

    recipes::delete_recipe(&store, &admin.session, id)
        .await
        .expect("admin deletes");
    assert!(matches!(
        recipes::get_recipe(&store, None, id).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn deletion_cascades_out_of_carts_and_favorites() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let fan = create_user(&store, "fan", UserRole::User).await;
    let flour = create_ingredient(&store, "Flour", "g").await;
    let id = create_recipe(&store, &cook, "Bread", &[(flour.id, 500)], &[]).await;

    relations::add_favorite(&store, &fan.session, id)
        .await
        .expect("favorited");
    relations::add_to_shopping_cart(&store, &fan.session, id)
        .await
        .expect("carted");

    recipes::delete_recipe(&store, &cook.session, id)
        .await
        .expect("deleted");

    for relation in [RecipeRelation::Favorite, RecipeRelation::ShoppingCart] {
        assert!(!store
            .has_relation(relation, fan.id, id)
            .await
            .expect("lookup"));
    }
    assert!(store
        .cart_ingredient_totals(fan.id)
        .await
        .expect("totals")
        .is_empty());
}

#[tokio::test]
async fn listing_filters_and_orders_newest_first() {
    let store = MemoryStore::new();
    let cook = create_user(&store, "cook", UserRole::User).await;
    let baker = create_user(&store, "baker", UserRole::User).await;
    let flour = create_ingredient(&store, "Flour", "g").await;
    let breakfast = create_tag(&store, "Breakfast", "#E26C2D", "breakfast").await;
    let dinner = create_tag(&store, "Dinner", "#49B64E", "dinner").await;

    let porridge = create_recipe(&store, &cook, "Porridge", &[(flour.id, 50)], &[breakfast.id]).await;
    let pie = create_recipe(&store, &baker, "Pie", &[(flour.id, 400)], &[dinner.id]).await;
    let waffles = create_recipe(&store, &baker, "Waffles", &[(flour.id, 250)], &[breakfast.id]).await;

    let all = recipes::list_recipes(&store, None, &form(&[]), 6)
        .await
        .expect("listing");
    let ids: Vec<_> = all.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![waffles, pie, porridge]);

    let baker_id = baker.id.to_string();
    let by_baker = recipes::list_recipes(&store, None, &form(&[("author", baker_id.as_str())]), 6)
        .await
        .expect("listing");
    assert_eq!(by_baker.count, 2);

    let tagged = recipes::list_recipes(
        &store,
        None,
        &form(&[("tags", "breakfast"), ("tags", "brunch")]),
        6,
    )
    .await
    .expect("listing");
    let ids: Vec<_> = tagged.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![waffles, porridge]);

    relations::add_favorite(&store, &cook.session, pie)
        .await
        .expect("favorited");
    let favorites = recipes::list_recipes(&store, Some(&cook.session), &form(&[("is_favorited", "1")]), 6)
        .await
        .expect("listing");
    assert_eq!(favorites.count, 1);
    assert!(favorites.results[0].is_favorited);

    let anonymous = recipes::list_recipes(&store, None, &form(&[("is_favorited", "1")]), 6)
        .await
        .expect("listing");
    assert_eq!(anonymous.count, 0);

    let paged = recipes::list_recipes(&store, None, &form(&[("page", "2"), ("limit", "2")]), 6)
        .await
        .expect("listing");
    assert_eq!(paged.count, 3);
    assert_eq!(paged.results.len(), 1);
    assert_eq!(paged.previous, Some(1));
    assert_eq!(paged.next, None);
}
