//! Comment handlers: list a post's comments, add a comment to a post

use hyper::StatusCode;
use serde_json::{Map, Value};

use super::{parse_id, post_not_found, store_failure, HttpResponse};
use crate::config::AppState;
use crate::http;
use crate::model::{comment_text, NewComment};
use crate::store::StoreError;

const LIST_FAILED: &str = "The comments information could not be retrieved.";
const LOOKUP_FAILED: &str = "There was an error getting the post from the database";
const SAVE_FAILED: &str = "There was an error while saving the comment to the database";

/// GET /posts/:id/comments
pub async fn list(state: &AppState, raw_id: &str) -> HttpResponse {
    let Some(post_id) = parse_id(raw_id) else {
        return post_not_found();
    };

    match state.store.find_post_comments(post_id).await {
        Ok(Some(comments)) => http::json_response(StatusCode::OK, &comments),
        Ok(None) => post_not_found(),
        Err(err) => store_failure(LIST_FAILED, &err),
    }
}

/// POST /posts/:id/comments
pub async fn create(state: &AppState, raw_id: &str, body: &Map<String, Value>) -> HttpResponse {
    let text = match comment_text(body) {
        Ok(text) => text,
        Err(err) => {
            // Historically answered 404 rather than 400
            let status = if state.config.api.strict_status_codes {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::NOT_FOUND
            };
            return http::error_response(status, &err.to_string());
        }
    };
    let Some(post_id) = parse_id(raw_id) else {
        return post_not_found();
    };

    match state.store.find_by_id(post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return post_not_found(),
        Err(err) => return store_failure(LOOKUP_FAILED, &err),
    }

    match state.store.insert_comment(NewComment { post_id, text }).await {
        Ok(comment) => http::json_response(StatusCode::CREATED, &comment),
        // Post removed between the lookup and the insert
        Err(StoreError::MissingParent(_)) => post_not_found(),
        Err(err) => store_failure(SAVE_FAILED, &err),
    }
}
