pub mod recorder;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use recorder::EventRecorder;

pub const DEFAULT_NAME: &str = "World";
pub const STATUS_OK: u16 = 200;

/// Event handed to the function by the platform.
///
/// Only `message` is interpreted. Everything else the transport sends along
/// (headers, path, method, body, ...) is kept verbatim in `transport` so it
/// shows up when the event is recorded. An explicit `"message": null` is kept
/// as `Some(Value::Null)` and recorded as such.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<Value>,
    #[serde(flatten)]
    pub transport: Map<String, Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl IncomingRequest {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(Value::String(message.into())),
            ..Default::default()
        }
    }

    /// The name to greet.
    ///
    /// The top-level `message` wins. When it is absent or null, the `message`
    /// of a string `body` holding a JSON object is used instead. An empty
    /// string counts as present and non-string values are rendered as text.
    pub fn name(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(display_name)
            .or_else(|| self.body_message())
    }

    fn body_message(&self) -> Option<String> {
        let body = self.transport.get("body")?.as_str()?;
        match serde_json::from_str::<Value>(body).ok()? {
            Value::Object(fields) => fields.get("message").and_then(display_name),
            _ => None,
        }
    }
}

/// Text a JavaScript template literal would produce for `value`; `None` for null.
fn display_name(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(template_text(other)),
    }
}

fn template_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(template_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// What the function returns to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingResponse {
    pub status_code: u16,
    pub body: String,
}

impl OutgoingResponse {
    pub fn json(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

impl Greeting {
    pub fn for_name(name: Option<&str>) -> Self {
        Self {
            message: format!("Hello, {}!", name.unwrap_or(DEFAULT_NAME)),
        }
    }
}

#[derive(Clone)]
pub struct RequestHandler {
    recorder: Arc<dyn EventRecorder>,
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler").finish_non_exhaustive()
    }
}

impl RequestHandler {
    pub fn new(recorder: impl EventRecorder + 'static) -> Self {
        Self {
            recorder: Arc::new(recorder),
        }
    }
    pub fn with_shared_recorder(recorder: Arc<dyn EventRecorder>) -> Self {
        Self { recorder }
    }

    pub async fn handle(&self, event: IncomingRequest) -> OutgoingResponse {
        self.respond(&event)
    }

    pub fn respond(&self, event: &IncomingRequest) -> OutgoingResponse {
        self.recorder.record(event);
        let greeting = Greeting::for_name(event.name().as_deref());
        OutgoingResponse::json(STATUS_OK, json!({ "message": greeting.message }))
    }
}
