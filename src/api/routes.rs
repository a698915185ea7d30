use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{Filter, Rejection, Reply};

use crate::{
    cache::cache::ReferenceCache,
    database::{form::FormData, schema::Id, store::Store},
    jwt::SessionKeys,
    middleware::{with_possible_session, with_session},
};

use super::handlers::*;

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Everything a request handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState<S: Store> {
    pub store: S,
    pub keys: SessionKeys,
    pub cache: ReferenceCache,
    pub page_size: i64,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, keys: SessionKeys, cache: ReferenceCache, page_size: i64) -> Self {
        Self {
            store,
            keys,
            cache,
            page_size,
        }
    }
}

fn with_state<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = (AppState<S>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Repeated keys survive, e.g. `?tags=breakfast&tags=lunch`.
fn query() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::query::<FormData>()
}

/// The full `/api` surface with JSON error bodies and request logging.
pub fn routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let api = auth_routes(state.clone())
        .or(user_routes(state.clone()))
        .or(tag_routes(state.clone()))
        .or(ingredient_routes(state.clone()))
        .or(recipe_routes(state));

    warp::path("api")
        .and(api)
        .recover(handle_rejection)
        .with(warp::log("recipes::api"))
}

fn auth_routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_login::<S>);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and_then(handle_logout);

    login.or(logout)
}

fn user_routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path!("users")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_list_users::<S>);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_register::<S>);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_me::<S>);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(query())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_list_subscriptions::<S>);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_get_user::<S>);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(query())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_subscribe::<S>);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state))
        .and_then(handle_unsubscribe::<S>);

    list.or(register)
        .or(me)
        .or(subscriptions)
        .or(detail)
        .or(subscribe)
        .or(unsubscribe)
}

fn tag_routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_list_tags::<S>);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_create_tag::<S>);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_get_tag::<S>);

    list.or(create).or(detail)
}

fn ingredient_routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(query())
        .and(with_state(state.clone()))
        .and_then(handle_list_ingredients::<S>);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_create_ingredient::<S>);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_get_ingredient::<S>);

    list.or(create).or(detail)
}

fn recipe_routes<S: Store>(
    state: AppState<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_download_shopping_cart::<S>);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_list_recipes::<S>);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_create_recipe::<S>);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_get_recipe::<S>);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(state.keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_update_recipe::<S>);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_delete_recipe::<S>);

    let favorite = warp::path!("recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_add_favorite::<S>);

    let unfavorite = warp::path!("recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_remove_favorite::<S>);

    let add_to_cart = warp::path!("recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_add_to_cart::<S>);

    let remove_from_cart = warp::path!("recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state))
        .and_then(handle_remove_from_cart::<S>);

    download
        .or(list)
        .or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(unfavorite)
        .or(add_to_cart)
        .or(remove_from_cart)
}
