//! Reply building: the JSON status envelope and its HTTP mapping.
//!
//! Every JSON body starts with `"status"` and `"message"`. Domain
//! failures ride an HTTP 200 (the soft-error convention) so clients can
//! tell business errors from transport errors without HTTP-layer
//! retries; only malformed requests (400), internal faults (500) and
//! the no-body replies (404 unknown route, 405 wrong method) use the
//! HTTP code itself.

use bytes::Bytes;
use gridgate_core::{GridError, HubUrl, CODE_UNAVAILABLE};
use http::StatusCode;
use serde_json::{Map, Value};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_PROPERTIES: &str = "text/x-java-properties";

/// A transport-agnostic response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
}

impl Reply {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
        }
    }

    fn json(status: StatusCode, payload: &Value) -> Self {
        Self {
            status,
            content_type: Some(CONTENT_TYPE_JSON),
            body: Bytes::from(serde_json::to_vec(payload).expect("envelope serialization")),
        }
    }

    pub fn text(status: StatusCode, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type: Some(content_type),
            body: Bytes::from(body),
        }
    }
}

fn envelope(code: u32, message: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("status".into(), Value::from(code));
    map.insert("message".into(), Value::from(message));
    map
}

/// `{"status":200,"message":"OK", ...payload}` under HTTP 200.
pub fn success_json(payload: Map<String, Value>) -> Reply {
    let mut map = envelope(200, "OK");
    map.extend(payload);
    Reply::json(StatusCode::OK, &Value::Object(map))
}

/// HTTP 200 with no body (side-effect-only operations).
pub fn success_empty() -> Reply {
    Reply::empty(StatusCode::OK)
}

/// Domain failure under HTTP 200. Transport codes never reach clients:
/// they are clamped to 503 Unavailable.
pub fn soft_error(err: GridError) -> Reply {
    let code = if err.is_transport() {
        CODE_UNAVAILABLE
    } else {
        err.code()
    };
    Reply::json(
        StatusCode::OK,
        &Value::Object(envelope(code, err.message())),
    )
}

/// Malformed request: HTTP 400 with the envelope naming the fault.
pub fn format_error(err: GridError) -> Reply {
    Reply::json(
        StatusCode::BAD_REQUEST,
        &Value::Object(envelope(err.code(), err.message())),
    )
}

/// Internal fault: HTTP 500.
pub fn system_error(err: GridError) -> Reply {
    Reply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &Value::Object(envelope(err.code(), err.message())),
    )
}

/// The `/lb` family when load-balancing is disabled: HTTP 503 with the
/// envelope carried along.
pub fn unavailable_error(err: GridError) -> Reply {
    Reply::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &Value::Object(envelope(err.code(), err.message())),
    )
}

/// Prefix matched but not the method: HTTP 405, no body.
pub fn method_error() -> Reply {
    Reply::empty(StatusCode::METHOD_NOT_ALLOWED)
}

/// No route matched: HTTP 404, no body.
pub fn no_handler() -> Reply {
    Reply::empty(StatusCode::NOT_FOUND)
}

/// `"URL":{"ns","ref","path"}` as carried by bean payloads.
pub fn url_json(url: &HubUrl) -> Value {
    serde_json::json!({
        "ns": url.ns().unwrap_or(""),
        "ref": url.reference().unwrap_or(""),
        "path": url.path().unwrap_or(""),
    })
}
