//! HTTP protocol layer module
//!
//! Response builders and request body parsing shared by the handlers,
//! decoupled from the post/comment logic.

pub mod body;
pub mod response;

pub use body::{read_json_object, BodyError};
pub use response::{
    apply_common_headers, build_204_response, build_404_response, build_405_response,
    build_413_response, build_health_response, build_options_response, build_timeout_response,
    error_response, json_response, server_error_response,
};
