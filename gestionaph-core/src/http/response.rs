//! JSON response helpers

use crate::error::{ActionResult, PortalError};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;

pub type Resp = Response<Full<Bytes>>;

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Resp {
    let payload = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Failed to serialize response body: {}", e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error");
        }
    };
    let mut response = Response::new(Full::new(Bytes::from(payload)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// `{ok:false, error}` with the given status
pub fn json_error(status: StatusCode, message: &str) -> Resp {
    let mut response =
        Response::new(Full::new(Bytes::from(json!({"ok": false, "error": message}).to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn not_found() -> Resp {
    json_error(StatusCode::NOT_FOUND, "not_found")
}

pub fn payload_too_large() -> Resp {
    json_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
}

/// Body that failed to parse as the expected request shape
pub fn invalid_data() -> Resp {
    json_error(StatusCode::BAD_REQUEST, "Invalid data")
}

pub fn status_for(err: &PortalError) -> StatusCode {
    use crate::residents::IdentityError;

    match err {
        PortalError::Validation(_) => StatusCode::BAD_REQUEST,
        PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortalError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        PortalError::Identity(IdentityError::InvalidCredentials)
        | PortalError::Identity(IdentityError::UnknownUser(_)) => StatusCode::UNAUTHORIZED,
        PortalError::Identity(IdentityError::EmailAlreadyExists(_)) => StatusCode::CONFLICT,
        PortalError::Identity(IdentityError::Password(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        PortalError::Identity(_) => StatusCode::BAD_REQUEST,
        PortalError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failed operation: log the cause, answer `{ok:false, error}` with a user-safe message
pub fn failure(operation: &str, err: &PortalError, fallback: &str) -> Resp {
    json_response(status_for(err), &ActionResult::from_error(operation, err, fallback))
}

pub fn action(result: &ActionResult) -> Resp {
    json_response(StatusCode::OK, result)
}
