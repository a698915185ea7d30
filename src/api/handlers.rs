use std::convert::Infallible;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status},
    Rejection, Reply,
};

use crate::{
    actions::{ingredients, recipes, relations, shopping_list, tags, users},
    database::{
        error::ApiError,
        form::{Form, FormData},
        schema::{Credentials, Id, NewIngredient, NewTag, RecipeWrite, UserWrite},
        store::Store,
    },
    jwt::SessionData,
    SESSION_COOKIE,
};

use super::routes::AppState;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

// Auth

pub async fn handle_login<S: Store>(
    credentials: Credentials,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let token = users::login_user(&state.store, &state.keys, credentials)
        .await
        .map_err(reject::custom)?;

    Ok(json(&token))
}

/// Sessions are stateless tokens; logout only clears the cookie.
pub async fn handle_logout(session: SessionData) -> Result<impl Reply, Rejection> {
    log::trace!("> {} logged out", session.username);

    Ok(with_header(
        with_status(warp::reply(), StatusCode::NO_CONTENT),
        "set-cookie",
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"),
    ))
}

// Users

pub async fn handle_list_users<S: Store>(
    query: FormData,
    viewer: Option<SessionData>,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(query);
    let page = crate::actions::page_request(&form, state.page_size).map_err(reject::custom)?;
    let users = users::list_users(&state.store, viewer.as_ref(), page)
        .await
        .map_err(reject::custom)?;

    Ok(json(&users))
}

pub async fn handle_register<S: Store>(
    form: UserWrite,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let user = users::register_user(&state.store, form)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&user), StatusCode::CREATED))
}

pub async fn handle_me<S: Store>(
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let user = users::me(&state.store, &session)
        .await
        .map_err(reject::custom)?;

    Ok(json(&user))
}

pub async fn handle_get_user<S: Store>(
    user_id: Id,
    viewer: Option<SessionData>,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let user = users::get_user(&state.store, viewer.as_ref(), user_id)
        .await
        .map_err(reject::custom)?;

    Ok(json(&user))
}

pub async fn handle_list_subscriptions<S: Store>(
    query: FormData,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(query);
    let page = crate::actions::page_request(&form, state.page_size).map_err(reject::custom)?;
    let recipes_limit = form
        .get_number::<i64>("recipes_limit")
        .map_err(reject::custom)?;

    let subscriptions = users::list_subscriptions(&state.store, &session, page, recipes_limit)
        .await
        .map_err(reject::custom)?;

    Ok(json(&subscriptions))
}

pub async fn handle_subscribe<S: Store>(
    author_id: Id,
    query: FormData,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipes_limit = Form::from_data(query)
        .get_number::<i64>("recipes_limit")
        .map_err(reject::custom)?;

    let subscription = relations::follow(&state.store, &session, author_id, recipes_limit)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&subscription), StatusCode::CREATED))
}

pub async fn handle_unsubscribe<S: Store>(
    author_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    relations::unfollow(&state.store, &session, author_id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

// Tags

pub async fn handle_list_tags<S: Store>(state: AppState<S>) -> Result<impl Reply, Rejection> {
    let tags = tags::list_tags(&state.store, &state.cache)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tags))
}

pub async fn handle_get_tag<S: Store>(id: Id, state: AppState<S>) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(&state.store, id)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tag))
}

pub async fn handle_create_tag<S: Store>(
    session: SessionData,
    form: NewTag,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let tag = tags::create_tag(&state.store, &state.cache, &session, form)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&tag), StatusCode::CREATED))
}

// Ingredients

pub async fn handle_list_ingredients<S: Store>(
    query: FormData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(query);
    let list = ingredients::list_ingredients(&state.store, &state.cache, form.get_str("name"))
        .await
        .map_err(reject::custom)?;

    Ok(json(&list))
}

pub async fn handle_get_ingredient<S: Store>(
    id: Id,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(&state.store, id)
        .await
        .map_err(reject::custom)?;

    Ok(json(&ingredient))
}

pub async fn handle_create_ingredient<S: Store>(
    session: SessionData,
    form: NewIngredient,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::create_ingredient(&state.store, &state.cache, &session, form)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&ingredient), StatusCode::CREATED))
}

// Recipes

pub async fn handle_list_recipes<S: Store>(
    query: FormData,
    viewer: Option<SessionData>,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(query);
    let page = recipes::list_recipes(&state.store, viewer.as_ref(), &form, state.page_size)
        .await
        .map_err(reject::custom)?;

    Ok(json(&page))
}

pub async fn handle_create_recipe<S: Store>(
    session: SessionData,
    form: RecipeWrite,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::create_recipe(&state.store, &session, form)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&recipe), StatusCode::CREATED))
}

pub async fn handle_get_recipe<S: Store>(
    recipe_id: Id,
    viewer: Option<SessionData>,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe(&state.store, viewer.as_ref(), recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipe))
}

pub async fn handle_update_recipe<S: Store>(
    recipe_id: Id,
    session: SessionData,
    form: RecipeWrite,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::update_recipe(&state.store, &session, recipe_id, form)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipe))
}

pub async fn handle_delete_recipe<S: Store>(
    recipe_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    recipes::delete_recipe(&state.store, &session, recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_add_favorite<S: Store>(
    recipe_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipe = relations::add_favorite(&state.store, &session, recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&recipe), StatusCode::CREATED))
}

pub async fn handle_remove_favorite<S: Store>(
    recipe_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    relations::remove_favorite(&state.store, &session, recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_add_to_cart<S: Store>(
    recipe_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let recipe = relations::add_to_shopping_cart(&state.store, &session, recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&recipe), StatusCode::CREATED))
}

pub async fn handle_remove_from_cart<S: Store>(
    recipe_id: Id,
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    relations::remove_from_shopping_cart(&state.store, &session, recipe_id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_download_shopping_cart<S: Store>(
    session: SessionData,
    state: AppState<S>,
) -> Result<impl Reply, Rejection> {
    let list = shopping_list::download_shopping_cart(&state.store, &session)
        .await
        .map_err(reject::custom)?;

    let disposition = format!("attachment; filename=\"{}\"", list.filename());
    Ok(with_header(list.render(), "content-disposition", disposition))
}

// Rejections

/// Every failure leaves as `{"detail": "..."}`.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<ApiError>() {
        (e.status_code(), e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, String::from("Invalid query string"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, String::from("Request body is too large"))
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, String::from("Expected a JSON body"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, String::from("Method not allowed"))
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, String::from("Internal server error"))
    };

    Ok(with_status(json(&ErrorBody { detail }), status))
}
