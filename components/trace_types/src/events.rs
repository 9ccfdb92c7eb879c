// Trace event types
//
// Mirrors the Chrome trace event JSON format. Field names follow the wire format
// (`cat`, `ph`, `pid`, `tid`, `ts`, `dur`) and accept the long-form aliases.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{Result, TraceError};

/// Event phase code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    /// Duration begin (`B`)
    Begin,
    /// Duration end (`E`)
    End,
    /// Complete event with a duration (`X`)
    Complete,
    /// Instant event (`I`, legacy `i`)
    Instant,
    /// Metadata event (`M`)
    Metadata,
    /// Nestable async begin (`b`)
    AsyncBegin,
    /// Nestable async end (`e`)
    AsyncEnd,
    /// Nestable async instant (`n`)
    AsyncInstant,
    /// Mark event (`R`)
    Mark,
    /// Sample event (`P`)
    Sample,
    /// Counter event (`C`)
    Counter,
    /// Any other phase code, kept verbatim
    Other(String),
}

impl Phase {
    /// The wire code for this phase
    pub fn code(&self) -> &str {
        match self {
            Self::Begin => "B",
            Self::End => "E",
            Self::Complete => "X",
            Self::Instant => "I",
            Self::Metadata => "M",
            Self::AsyncBegin => "b",
            Self::AsyncEnd => "e",
            Self::AsyncInstant => "n",
            Self::Mark => "R",
            Self::Sample => "P",
            Self::Counter => "C",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for Phase {
    fn from(code: String) -> Self {
        match code.as_str() {
            "B" => Self::Begin,
            "E" => Self::End,
            "X" => Self::Complete,
            "I" | "i" => Self::Instant,
            "M" => Self::Metadata,
            "b" => Self::AsyncBegin,
            "e" => Self::AsyncEnd,
            "n" => Self::AsyncInstant,
            "R" => Self::Mark,
            "P" => Self::Sample,
            "C" => Self::Counter,
            _ => Self::Other(code),
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.code().to_string()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One instrumentation record from the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Event name
    pub name: String,
    /// Comma-separated category list
    #[serde(rename = "cat", alias = "category", default)]
    pub category: String,
    /// Phase code
    #[serde(rename = "ph", alias = "phase")]
    pub phase: Phase,
    /// Process ID
    #[serde(rename = "pid", alias = "processId", default)]
    pub process_id: u64,
    /// Thread ID
    #[serde(rename = "tid", alias = "threadId", default)]
    pub thread_id: u64,
    /// Timestamp in microseconds
    #[serde(rename = "ts", alias = "timestampMicros", default)]
    pub timestamp: f64,
    /// Duration in microseconds (complete events only)
    #[serde(
        rename = "dur",
        alias = "durationMicros",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    /// Event identifier, used to stitch `Profile`/`ProfileChunk` fragments
    #[serde(
        default,
        deserialize_with = "deserialize_event_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Free-form event arguments
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

fn deserialize_event_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

impl TraceEvent {
    /// Create a new trace event with no duration and empty args
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        phase: Phase,
        process_id: u64,
        thread_id: u64,
        timestamp: f64,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            phase,
            process_id,
            thread_id,
            timestamp,
            duration: None,
            id: None,
            args: Value::Null,
        }
    }

    /// Set the duration of this event
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the event arguments
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// Set the event identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Timestamp at which this event ends (`ts + dur`)
    pub fn end_timestamp(&self) -> f64 {
        self.timestamp + self.duration.unwrap_or(0.0)
    }

    /// The `args.data` object, if present
    pub fn data(&self) -> Option<&Value> {
        self.args.get("data")
    }

    /// Frame this event is scoped to
    ///
    /// Checks `args.data.frame`, then `args.data.frameID`, then `args.frame`.
    pub fn frame_id(&self) -> Option<&str> {
        self.data()
            .and_then(|data| data.get("frame").or_else(|| data.get("frameID")))
            .and_then(Value::as_str)
            .or_else(|| self.args.get("frame").and_then(Value::as_str))
    }

    /// Whether the category list contains `category`
    pub fn has_category(&self, category: &str) -> bool {
        self.category.split(',').any(|c| c == category)
    }
}

/// A complete, already-captured event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceLog {
    /// Events in arrival order (not necessarily sorted)
    #[serde(rename = "traceEvents")]
    pub events: Vec<TraceEvent>,
    /// Capture metadata, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TraceLog {
    /// Create a log from events in arrival order
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self {
            events,
            metadata: None,
        }
    }

    /// Parse a log from JSON
    ///
    /// Accepts both the bare array form and the `{"traceEvents": [...]}` object form.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(TraceError::InvalidTraceJson)?;
        match value {
            Value::Array(_) => {
                let events = serde_json::from_value(value).map_err(TraceError::InvalidTraceJson)?;
                Ok(Self::new(events))
            }
            _ => serde_json::from_value(value).map_err(TraceError::InvalidTraceJson),
        }
    }

    /// Number of events in the log
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log has no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_codes() {
        assert_eq!(Phase::from("B".to_string()), Phase::Begin);
        assert_eq!(Phase::from("i".to_string()), Phase::Instant);
        assert_eq!(Phase::from("I".to_string()), Phase::Instant);
        assert_eq!(Phase::from("O".to_string()), Phase::Other("O".to_string()));
        assert_eq!(Phase::Complete.code(), "X");
        assert_eq!(Phase::Other("O".to_string()).to_string(), "O");
    }

    #[test]
    fn test_event_deserialize_wire_names() {
        let event: TraceEvent = serde_json::from_value(json!({
            "name": "navigationStart",
            "cat": "blink.user_timing",
            "ph": "R",
            "pid": 1,
            "tid": 2,
            "ts": 100.5,
            "args": {"frame": "F1"}
        }))
        .unwrap();

        assert_eq!(event.name, "navigationStart");
        assert_eq!(event.phase, Phase::Mark);
        assert_eq!(event.process_id, 1);
        assert_eq!(event.thread_id, 2);
        assert_eq!(event.timestamp, 100.5);
        assert_eq!(event.frame_id(), Some("F1"));
    }

    #[test]
    fn test_event_deserialize_long_names() {
        let event: TraceEvent = serde_json::from_value(json!({
            "name": "RunTask",
            "category": "toplevel",
            "phase": "X",
            "processId": 3,
            "threadId": 4,
            "timestampMicros": 10,
            "durationMicros": 5
        }))
        .unwrap();

        assert_eq!(event.phase, Phase::Complete);
        assert_eq!(event.end_timestamp(), 15.0);
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let event: TraceEvent = serde_json::from_value(json!({
            "name": "Profile", "ph": "P", "ts": 0, "id": 7
        }))
        .unwrap();
        assert_eq!(event.id.as_deref(), Some("7"));
    }

    #[test]
    fn test_frame_id_lookup_order() {
        let event = TraceEvent::new("x", "", Phase::Instant, 1, 1, 0.0)
            .with_args(json!({"data": {"frameID": "A"}, "frame": "B"}));
        assert_eq!(event.frame_id(), Some("A"));

        let event = TraceEvent::new("x", "", Phase::Instant, 1, 1, 0.0)
            .with_args(json!({"frame": "B"}));
        assert_eq!(event.frame_id(), Some("B"));
    }

    #[test]
    fn test_has_category() {
        let event = TraceEvent::new("x", "loading,rail,devtools.timeline", Phase::Instant, 1, 1, 0.0);
        assert!(event.has_category("rail"));
        assert!(!event.has_category("rai"));
    }

    #[test]
    fn test_log_from_array_and_object() {
        let array = r#"[{"name":"a","ph":"I","ts":1}]"#;
        let object = r#"{"traceEvents":[{"name":"a","ph":"I","ts":1}],"metadata":{"v":1}}"#;

        let from_array = TraceLog::from_json_str(array).unwrap();
        let from_object = TraceLog::from_json_str(object).unwrap();

        assert_eq!(from_array.events, from_object.events);
        assert_eq!(from_object.metadata, Some(json!({"v": 1})));
    }

    #[test]
    fn test_log_invalid_json() {
        let err = TraceLog::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::InvalidTraceJson);
    }
}
