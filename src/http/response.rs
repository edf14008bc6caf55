//! HTTP response building module
//!
//! Builders for the JSON and plain responses the post API returns.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::HttpConfig;

const JSON: &str = "application/json; charset=utf-8";

/// Error payload: a fixed human-readable message, plus the raw store
/// diagnostic on server errors
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_error: Option<&'a str>,
}

/// Build JSON response
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return server_error_response("Failed to serialize response", &e.to_string());
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", JSON)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// `{"errorMessage": message}` with the given status
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorBody {
            error_message: message,
            server_error: None,
        },
    )
}

/// 500 with `{"errorMessage": message, "serverError": diagnostic}`
pub fn server_error_response(message: &str, diagnostic: &str) -> Response<Full<Bytes>> {
    let body = ErrorBody {
        error_message: message,
        server_error: Some(diagnostic),
    };
    let json = serde_json::to_vec(&body)
        .unwrap_or_else(|_| br#"{"errorMessage":"Internal Server Error"}"#.to_vec());

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", JSON)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 204 No Content response
pub fn build_204_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("204", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response for unknown paths
pub fn build_404_response() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    if let Ok(value) = allow.parse() {
        response.headers_mut().insert("Allow", value);
    }
    response
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
}

/// Build 503 response for a request that ran past its deadline
pub fn build_timeout_response() -> Response<Full<Bytes>> {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Request timed out")
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool, allow: &str) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", allow)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build health check response
pub fn build_health_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache, no-store")
        .body(Full::new(Bytes::from(text)))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from(text)))
        })
}

/// Add the headers every response carries: `Server`, and the CORS origin
/// when enabled
pub fn apply_common_headers(response: &mut Response<Full<Bytes>>, http: &HttpConfig) {
    let headers = response.headers_mut();
    if let Ok(value) = http.server_name.parse() {
        headers.insert("Server", value);
    }
    if http.enable_cors {
        headers.insert(
            "Access-Control-Allow-Origin",
            hyper::header::HeaderValue::from_static("*"),
        );
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
