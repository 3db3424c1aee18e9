//! TinkerPop WebSocket request and response messages.
//!
//! A request frame is binary: one byte holding the mime type length, the
//! mime type itself, then the JSON request body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::row::Row;

/// Column every Gremlin result row is exposed under.
pub const RESULT_COLUMN: &str = "result";

pub const SUCCESS: u16 = 200;
pub const NO_CONTENT: u16 = 204;
pub const PARTIAL_CONTENT: u16 = 206;
pub const AUTHENTICATE: u16 = 407;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a, A: Serialize> {
    request_id: Uuid,
    op: &'a str,
    processor: &'a str,
    args: A,
}

#[derive(Debug, Serialize)]
struct EvalArgs<'a> {
    gremlin: &'a str,
    bindings: JsonValue,
    language: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthArgs {
    sasl: String,
    sasl_mechanism: &'static str,
}

/// Builds the frame evaluating `gremlin` as a script.
pub fn eval_frame(mime_type: &str, request_id: Uuid, gremlin: &str) -> Result<Vec<u8>, GraphError> {
    let request = Request {
        request_id,
        op: "eval",
        processor: "",
        args: EvalArgs {
            gremlin,
            bindings: JsonValue::Object(Default::default()),
            language: "gremlin-groovy",
        },
    };
    frame(mime_type, &request)
}

/// Builds the SASL PLAIN answer to a 407 challenge for `request_id`.
pub fn auth_frame(
    mime_type: &str,
    request_id: Uuid,
    username: &str,
    password: &str,
) -> Result<Vec<u8>, GraphError> {
    let request = Request {
        request_id,
        op: "authentication",
        processor: "",
        args: AuthArgs {
            sasl: sasl_plain(username, password),
            sasl_mechanism: "PLAIN",
        },
    };
    frame(mime_type, &request)
}

/// `base64("\0user\0password")`
pub fn sasl_plain(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{}\0{}", username, password))
}

fn frame<A: Serialize>(mime_type: &str, request: &Request<'_, A>) -> Result<Vec<u8>, GraphError> {
    let mime_len = u8::try_from(mime_type.len()).map_err(|_| GraphError::MissingSetting {
        setting: "gremlin.mime_type (at most 255 bytes)".to_string(),
    })?;
    let body = serde_json::to_vec(request)?;

    let mut out = Vec::with_capacity(1 + mime_type.len() + body.len());
    out.push(mime_len);
    out.extend_from_slice(mime_type.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// One response message; a request may receive several.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Absent on some server-side errors.
    #[serde(default)]
    pub request_id: Option<Uuid>,
    pub status: Status,
    #[serde(default)]
    pub result: ResponseResult,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub data: JsonValue,
}

impl Response {
    /// Parses one message. An unreadable frame is a backend failure, so the
    /// error carries the query kind; the caller fills in the query text.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GraphError> {
        serde_json::from_slice(bytes)
            .map_err(|e| GraphError::query("malformed Gremlin response", "", e))
    }

    /// Server message, prefixed with the status code.
    pub fn describe(&self) -> String {
        if self.status.message.is_empty() {
            format!("status {}", self.status.code)
        } else {
            format!("status {}: {}", self.status.code, self.status.message)
        }
    }

    /// One row per result item. A typed `g:List` wrapper is unwrapped.
    pub fn into_rows(self) -> Vec<Row> {
        let data = match self.result.data {
            JsonValue::Object(mut map) if map.get("@type").and_then(JsonValue::as_str) == Some("g:List") => {
                map.remove("@value").unwrap_or(JsonValue::Null)
            }
            other => other,
        };

        match data {
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| Row::single(RESULT_COLUMN, item))
                .collect(),
            JsonValue::Null => Vec::new(),
            other => vec![Row::single(RESULT_COLUMN, other)],
        }
    }
}
