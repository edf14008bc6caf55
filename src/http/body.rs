//! Request body reading module
//!
//! Collects a request body, bounded by `http.max_body_size`, and parses it
//! as a JSON object.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Failed to read request body")]
    Read(String),
    /// More than the allowed number of bytes arrived, whatever the headers said
    #[error("Payload Too Large")]
    TooLarge,
    #[error("Request body must be a JSON object")]
    NotAnObject,
}

/// Read the whole body, at most `limit` bytes, as a JSON object.
///
/// An empty body is an empty object, so it fails field validation rather
/// than JSON parsing.
pub async fn read_json_object<B>(body: B, limit: u64) -> Result<Map<String, Value>, BodyError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                BodyError::TooLarge
            } else {
                BodyError::Read(e.to_string())
            }
        })?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(BodyError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::Bytes;

    async fn read(raw: &'static str) -> Result<Map<String, Value>, BodyError> {
        read_json_object(Full::new(Bytes::from(raw)), 1024).await
    }

    #[tokio::test]
    async fn test_reads_object() {
        let map = read(r#"{"title":"A","contents":"B"}"#).await.unwrap();
        assert_eq!(map["title"], "A");
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        assert!(read("").await.unwrap().is_empty());
        assert!(read("  \n").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_objects() {
        for raw in ["{not json", "[1,2]", "\"text\"", "42", "null"] {
            assert!(
                matches!(read(raw).await, Err(BodyError::NotAnObject)),
                "body: {raw}"
            );
        }
    }

    #[tokio::test]
    async fn test_enforces_limit() {
        let raw = r#"{"title":"A","contents":"B"}"#;
        let exact = u64::try_from(raw.len()).unwrap();

        let body = read_json_object(Full::new(Bytes::from(raw)), exact).await;
        assert_eq!(body.unwrap()["contents"], "B");

        let body = read_json_object(Full::new(Bytes::from(raw)), exact - 1).await;
        assert!(matches!(body, Err(BodyError::TooLarge)));
    }
}
