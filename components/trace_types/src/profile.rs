// CPU profile types

use serde::{Deserialize, Serialize};

/// Profile node identifier
pub type ProfileNodeId = u32;

/// Call frame information for a profile node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", default)]
pub struct CallFrame {
    /// Function name
    pub function_name: String,
    /// Script ID
    pub script_id: String,
    /// URL of the script
    pub url: String,
    /// Line number (0-based)
    pub line_number: i32,
    /// Column number (0-based)
    pub column_number: i32,
}

impl CallFrame {
    /// Call frame with only a function name
    pub fn named(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            ..Self::default()
        }
    }

    /// Set the script URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Default for CallFrame {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            script_id: "0".to_string(),
            url: String::new(),
            line_number: 0,
            column_number: 0,
        }
    }
}

/// A single node in a sampled CPU profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNode {
    /// Unique identifier within the profile
    pub id: ProfileNodeId,
    /// Function call frame
    #[serde(default)]
    pub call_frame: CallFrame,
    /// Parent node, absent for the root
    #[serde(default, alias = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent: Option<ProfileNodeId>,
}

impl ProfileNode {
    /// Create a node
    pub fn new(id: ProfileNodeId, call_frame: CallFrame, parent: Option<ProfileNodeId>) -> Self {
        Self {
            id,
            call_frame,
            parent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_parent_aliases() {
        let a: ProfileNode = serde_json::from_value(json!({
            "id": 2, "callFrame": {"functionName": "foo"}, "parent": 1
        }))
        .unwrap();
        let b: ProfileNode = serde_json::from_value(json!({
            "id": 2, "callFrame": {"functionName": "foo"}, "parentId": 1
        }))
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.parent, Some(1));
        assert_eq!(a.call_frame.script_id, "0");
    }

    #[test]
    fn test_call_frame_builder() {
        let frame = CallFrame::named("Foo").with_url("fileA.js");
        assert_eq!(frame.function_name, "Foo");
        assert_eq!(frame.url, "fileA.js");
        assert_eq!(frame.line_number, 0);
    }
}
