//! Request handler module
//!
//! Routing dispatch plus the post and comment handlers. Each handler
//! validates its input, performs its store operation(s), and maps the outcome
//! to a status code and JSON body.

pub mod comments;
pub mod posts;
pub mod router;

// Re-export main entry point
pub use router::handle_request;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use crate::http;
use crate::logger;
use crate::model::PostId;
use crate::store::StoreError;

pub const POST_NOT_FOUND: &str = "The post with the specified ID does not exist.";

pub type HttpResponse = Response<Full<Bytes>>;

/// Path segment to store id; anything that is not an id names no post
fn parse_id(raw: &str) -> Option<PostId> {
    raw.parse().ok()
}

fn post_not_found() -> HttpResponse {
    http::error_response(StatusCode::NOT_FOUND, POST_NOT_FOUND)
}

/// Log a failed store call and answer 500 with its diagnostic
fn store_failure(message: &str, err: &StoreError) -> HttpResponse {
    logger::log_store_error(message, err);
    http::server_error_response(message, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1"), Some(1));
        assert_eq!(parse_id("999"), Some(999));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("1.5"), None);
    }
}
