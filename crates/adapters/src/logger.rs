//! Structured JSON line logger adapter.

use crate::log_sink::LogSink;
use config_ignore_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use config_ignore_shared::redaction::{REDACTED, is_secret_key};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLineLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLineLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn encode(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        if let Some(extra) = event.fields {
            fields.extend(extra);
        }
        redact_fields(&mut fields);

        let mut payload = serde_json::Map::new();
        payload.insert("timestampMs".to_string(), Value::from(now_epoch_ms()));
        payload.insert("level".to_string(), Value::from(event.level.as_str()));
        payload.insert("event".to_string(), Value::from(&*event.event));
        payload.insert("message".to_string(), Value::from(&*event.message));
        if !fields.is_empty() {
            let map = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            payload.insert("fields".to_string(), Value::Object(map));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_string(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| {
                "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"log serialization failed\"}\n"
                    .to_string()
            },
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl LoggerPort for JsonLineLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let line = self.encode(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

fn redact_fields(fields: &mut LogFields) {
    for (key, value) in fields.iter_mut() {
        if is_secret_key(key) {
            *value = Value::String(REDACTED.to_string());
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                if is_secret_key(key) {
                    *nested = Value::String(REDACTED.to_string());
                } else {
                    redact_value(nested);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        },
        _ => {},
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
