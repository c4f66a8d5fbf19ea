//! Vocabulary shared by artifact readers.
//!
//! Sessions keep artifacts exactly as submitted (`serde_json::Value`).
//! The validators and the simulation runner both read fields leniently, one
//! field at a time, so a single malformed field never hides the rest of an
//! artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value types an input may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Number,
    Boolean,
    Object,
    /// A string drawn from a closed set.
    Enum,
}

impl InputType {
    pub const ALL: [InputType; 5] = [
        InputType::String,
        InputType::Number,
        InputType::Boolean,
        InputType::Object,
        InputType::Enum,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Number => "number",
            InputType::Boolean => "boolean",
            InputType::Object => "object",
            InputType::Enum => "enum",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        InputType::ALL.into_iter().find(|t| t.as_str() == raw.trim())
    }

    /// Whether a JSON value has this declared type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            InputType::String | InputType::Enum => value.is_string(),
            InputType::Number => value.is_number(),
            InputType::Boolean => value.is_boolean(),
            InputType::Object => value.is_object(),
        }
    }
}
