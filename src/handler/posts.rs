//! Post handlers: create, list, get, update, delete

use hyper::StatusCode;
use serde_json::{Map, Value};

use super::{parse_id, post_not_found, store_failure, HttpResponse};
use crate::config::AppState;
use crate::http;
use crate::model::NewPost;

const SAVE_FAILED: &str = "There was an error while saving the post to the database";
const LIST_FAILED: &str = "The posts information could not be retrieved.";
const GET_FAILED: &str = "The post information could not be retrieved.";
const REMOVE_FAILED: &str = "The post could not be removed";
const UPDATE_FAILED: &str = "The post information could not be modified.";

/// POST /posts
pub async fn create(state: &AppState, body: &Map<String, Value>) -> HttpResponse {
    let new_post = match NewPost::from_body(body) {
        Ok(post) => post,
        Err(err) => return http::error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    // Historically answered 200 rather than 201
    let created = if state.config.api.strict_status_codes {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    match state.store.insert(new_post).await {
        Ok(post) => http::json_response(created, &post),
        Err(err) => store_failure(SAVE_FAILED, &err),
    }
}

/// GET /posts
pub async fn list(state: &AppState) -> HttpResponse {
    match state.store.find().await {
        Ok(posts) => http::json_response(StatusCode::OK, &posts),
        Err(err) => store_failure(LIST_FAILED, &err),
    }
}

/// GET /posts/:id
pub async fn get(state: &AppState, raw_id: &str) -> HttpResponse {
    let Some(id) = parse_id(raw_id) else {
        return post_not_found();
    };

    match state.store.find_by_id(id).await {
        Ok(Some(post)) => http::json_response(StatusCode::OK, &post),
        Ok(None) => post_not_found(),
        Err(err) => store_failure(GET_FAILED, &err),
    }
}

/// DELETE /posts/:id
pub async fn delete(state: &AppState, raw_id: &str) -> HttpResponse {
    let Some(id) = parse_id(raw_id) else {
        return post_not_found();
    };

    match state.store.remove(id).await {
        Ok(0) => post_not_found(),
        Ok(_) => http::build_204_response(),
        Err(err) => store_failure(REMOVE_FAILED, &err),
    }
}

/// PUT /posts/:id
pub async fn update(state: &AppState, raw_id: &str, body: &Map<String, Value>) -> HttpResponse {
    let new_post = match NewPost::from_body(body) {
        Ok(post) => post,
        Err(err) => return http::error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let Some(id) = parse_id(raw_id) else {
        return post_not_found();
    };

    match state.store.update(id, new_post).await {
        Ok(Some(post)) => http::json_response(StatusCode::OK, &post),
        Ok(None) => post_not_found(),
        Err(err) => store_failure(UPDATE_FAILED, &err),
    }
}
