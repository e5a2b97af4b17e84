use std::sync::Mutex;

use super::IncomingRequest;

/// Receives every event the handler sees, before the response is built.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: &IncomingRequest);
}

/// Emits one `tracing` line per event with the serialized payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, event: &IncomingRequest) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!("Received event: {}", json),
            Err(err) => tracing::warn!("Received event that could not be serialized: {}", err),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRecorder;

impl EventRecorder for SilentRecorder {
    fn record(&self, _event: &IncomingRequest) {}
}

/// Keeps the serialized events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<String>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: &IncomingRequest) {
        let json = serde_json::to_string(event).unwrap_or_else(|err| format!("<{}>", err));
        if let Ok(mut events) = self.events.lock() {
            events.push(json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_recorder_keeps_serialized_events_in_order() {
        let recorder = MemoryRecorder::new();
        recorder.record(&IncomingRequest::with_message("first"));
        recorder.record(&serde_json::from_value(json!({"path": "/x"})).unwrap());

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], r#"{"message":"first"}"#);
        assert_eq!(events[1], r#"{"path":"/x"}"#);
    }

    #[test]
    fn silent_recorder_accepts_anything() {
        SilentRecorder.record(&IncomingRequest::default());
    }
}
