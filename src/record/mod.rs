//! The persisted lesson document format and its versioned upgrade path.
//!
//! Records mirror what the storage collaborator keeps: a lesson document plus flat node
//! and edge collections. They are deliberately loose (optional fields, legacy port
//! strings, handles of any JSON scalar type) and are converted into the strict
//! [`LessonGraph`](crate::lesson::LessonGraph) model once, at load time.

mod convert;
mod upgrade;

pub use convert::{LoadedLesson, load_lesson_json};
pub use upgrade::{UpgradeReport, upgrade};

use crate::lesson::LessonMeta;
use serde::{Deserialize, Deserializer, Serialize};

/// Complete persisted lesson document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    /// Documents written before versioning was introduced have no version field.
    #[serde(default = "unversioned", alias = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub lesson: LessonMeta,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

fn unversioned() -> u32 {
    1
}

impl LessonRecord {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A node as stored: `{ id, type, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: NodeDataRecord,
}

/// The union of every node type's stored fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDataRecord {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ui_style")]
    pub ui_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ai_action")]
    pub ai_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "fallback_text")]
    pub fallback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "game_id")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
    /// Legacy quizzes stored the correct option's text instead of per-answer flags.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "correct_answer")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<PortRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<PortRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "outcomes")]
    pub options: Option<Vec<PortRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<PortRecord>>,
}

/// A stored port: a bare string in the legacy layout, an object afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRecord {
    Legacy(String),
    Port {
        id: String,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct: Option<bool>,
    },
}

impl PortRecord {
    pub fn is_legacy(&self) -> bool {
        matches!(self, PortRecord::Legacy(_))
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PortRecord::Legacy(_) => None,
            PortRecord::Port { id, .. } => Some(id),
        }
    }
}

/// An edge as stored. Handles may have been saved as numbers or booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(
        default,
        alias = "source_handle",
        deserialize_with = "loose_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    #[serde(
        default,
        alias = "target_handle",
        deserialize_with = "loose_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
}

/// Coerces any JSON scalar into a handle string. Null and blank strings mean "no handle".
fn loose_handle<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let handle = match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => Some(other.to_string()),
    };
    Ok(handle.filter(|h| !h.is_empty()))
}
