// Network record types
//
// Records are produced by an external network observer. Times are monotonic
// seconds on the same clock as trace timestamps (which are microseconds).

use serde::{Deserialize, Serialize};

/// Resource type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    XHR,
    Fetch,
    EventSource,
    WebSocket,
    Manifest,
    SignedExchange,
    Ping,
    CSPViolationReport,
    Preflight,
    #[default]
    Other,
}

/// Resource priority
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourcePriority {
    VeryLow,
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

/// What caused a request to be issued
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InitiatorType {
    Parser,
    Script,
    Preload,
    #[serde(rename = "SignedExchange")]
    SignedExchange,
    Preflight,
    #[default]
    Other,
}

/// Request initiator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    /// Initiator kind
    #[serde(rename = "type", default)]
    pub kind: InitiatorType,
    /// URL of the resource that issued the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request id of the initiating request, when the observer resolved it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Initiator {
    /// Initiator pointing at the request that loaded `url`
    pub fn parser(url: impl Into<String>) -> Self {
        Self {
            kind: InitiatorType::Parser,
            url: Some(url.into()),
            request_id: None,
        }
    }

    /// Initiator pointing directly at another request id
    pub fn request(request_id: impl Into<String>) -> Self {
        Self {
            kind: InitiatorType::Script,
            url: None,
            request_id: Some(request_id.into()),
        }
    }
}

/// One observed network request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    /// Unique request id; redirect hops are suffixed `:redirect`
    pub request_id: String,
    /// Request URL
    pub url: String,
    /// Start time (seconds)
    pub start_time: f64,
    /// End time (seconds)
    pub end_time: f64,
    /// What issued this request
    #[serde(default)]
    pub initiator: Initiator,
    /// Fetch priority
    #[serde(default)]
    pub priority: ResourcePriority,
    /// Resource type
    #[serde(default)]
    pub resource_type: ResourceType,
    /// Request ids of the redirect hops that led to this request
    #[serde(default)]
    pub redirects: Vec<String>,
    /// Frame that issued the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    /// Network protocol (`h2`, `http/1.1`, `data`, ...)
    #[serde(default)]
    pub protocol: String,
    /// Bytes transferred over the wire
    #[serde(default)]
    pub transfer_size: u64,
    /// Whether the request came from `<link rel=preload>`
    #[serde(default)]
    pub is_link_preload: bool,
    /// Response MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Whether the request completed
    #[serde(default = "default_finished")]
    pub finished: bool,
}

fn default_finished() -> bool {
    true
}

impl NetworkRecord {
    /// Create a finished record with default metadata
    pub fn new(request_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            start_time: 0.0,
            end_time: 0.0,
            initiator: Initiator::default(),
            priority: ResourcePriority::default(),
            resource_type: ResourceType::default(),
            redirects: Vec::new(),
            frame_id: None,
            protocol: String::new(),
            transfer_size: 0,
            is_link_preload: false,
            mime_type: String::new(),
            finished: true,
        }
    }

    /// Set start and end times
    pub fn with_timing(mut self, start_time: f64, end_time: f64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Set the initiator
    pub fn with_initiator(mut self, initiator: Initiator) -> Self {
        self.initiator = initiator;
        self
    }

    /// Set the resource type
    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: ResourcePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the frame id
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    /// Set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Whether this is a `data:` URL
    pub fn is_data_url(&self) -> bool {
        self.url.starts_with("data:") || self.protocol == "data"
    }

    /// URL path without query string or fragment
    pub fn url_path(&self) -> &str {
        let without_fragment = self.url.split('#').next().unwrap_or("");
        without_fragment.split('?').next().unwrap_or("")
    }
}
