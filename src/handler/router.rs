//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: health checks, route matching
//! under the configured base path, method dispatch, body parsing, and the
//! per-request access log.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{comments, posts, HttpResponse};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Resource addressed by a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `/posts`
    Posts,
    /// `/posts/:id`
    Post(&'a str),
    /// `/posts/:id/comments`
    PostComments(&'a str),
}

impl<'a> Route<'a> {
    /// Match `path` against the post routes mounted under `base_path`.
    /// A single trailing slash is ignored.
    pub fn resolve(path: &'a str, base_path: &str) -> Option<Self> {
        let rest = path.strip_prefix(base_path)?.strip_prefix("/posts")?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Some(Self::Posts);
        }

        let rest = rest.strip_prefix('/')?;
        match rest.split_once('/') {
            None if !rest.is_empty() => Some(Self::Post(rest)),
            Some((id, "comments")) if !id.is_empty() => Some(Self::PostComments(id)),
            _ => None,
        }
    }

    pub const fn allow(self) -> &'static str {
        match self {
            Self::Posts | Self::PostComments(_) => "GET, POST, OPTIONS",
            Self::Post(_) => "GET, PUT, DELETE, OPTIONS",
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let mut response = match request_timeout(&state) {
        Some(limit) => tokio::time::timeout(limit, route_request(req, &state))
            .await
            .unwrap_or_else(|_| {
                logger::log_warning(&format!(
                    "Request timed out after {}s: {} {}",
                    limit.as_secs(),
                    entry.method,
                    entry.path
                ));
                http::build_timeout_response()
            }),
        None => route_request(req, &state).await,
    };
    http::apply_common_headers(&mut response, &state.config.http);

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.access_log_format);
    }

    Ok(response)
}

/// Upper bound on producing one response (`performance.write_timeout`, 0 disables)
fn request_timeout(state: &AppState) -> Option<Duration> {
    match state.config.performance.write_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    // 1. Health check endpoints
    if let Some(response) = health_check(&path, state).await {
        return response;
    }

    // 2. Post routes
    let Some(route) = Route::resolve(&path, &state.config.api.base_path) else {
        return http::build_404_response();
    };

    if method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors, route.allow());
    }

    if let Some(response) = check_body_size(&req, state.config.http.max_body_size) {
        return response;
    }

    // 3. Dispatch
    let limit = state.config.http.max_body_size;
    match (method, route) {
        (Method::GET, Route::Posts) => posts::list(state).await,
        (Method::POST, Route::Posts) => match read_body(req, limit).await {
            Ok(body) => posts::create(state, &body).await,
            Err(response) => response,
        },
        (Method::GET, Route::Post(id)) => posts::get(state, id).await,
        (Method::PUT, Route::Post(id)) => match read_body(req, limit).await {
            Ok(body) => posts::update(state, id, &body).await,
            Err(response) => response,
        },
        (Method::DELETE, Route::Post(id)) => posts::delete(state, id).await,
        (Method::GET, Route::PostComments(id)) => comments::list(state, id).await,
        (Method::POST, Route::PostComments(id)) => match read_body(req, limit).await {
            Ok(body) => comments::create(state, id, &body).await,
            Err(response) => response,
        },
        (method, route) => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            http::build_405_response(route.allow())
        }
    }
}

/// Liveness always answers; readiness round-trips the store
async fn health_check(path: &str, state: &AppState) -> Option<HttpResponse> {
    let health = &state.config.health;
    if !health.enabled {
        return None;
    }

    if path == health.liveness_path {
        return Some(http::build_health_response(StatusCode::OK, "ok"));
    }

    if path == health.readiness_path {
        return Some(match state.store.ping().await {
            Ok(()) => http::build_health_response(StatusCode::OK, "ok"),
            Err(err) => {
                logger::log_store_error("Readiness check failed", &err);
                http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
        });
    }

    None
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Parse the request body as a JSON object, or produce the 4xx to send back
async fn read_body<B>(req: Request<B>, limit: u64) -> Result<Map<String, Value>, HttpResponse>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    http::read_json_object(req.into_body(), limit)
        .await
        .map_err(|err| match err {
            http::BodyError::TooLarge => {
                logger::log_warning(&format!(
                    "Request body too large: more than {limit} bytes received"
                ));
                http::build_413_response()
            }
            other => {
                if let http::BodyError::Read(cause) = &other {
                    logger::log_warning(&format!("{other}: {cause}"));
                }
                http::error_response(StatusCode::BAD_REQUEST, &other.to_string())
            }
        })
}
