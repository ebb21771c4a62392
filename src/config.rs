use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Tuning for the fallback ladder used by [`crate::engine::TraversalEngine::advance`].
///
/// Exact handle matches and the default exit are always honoured. The two fallback rules
/// can be switched off to surface authoring slips during review instead of papering over
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraversalConfig {
    /// Take a node's only outgoing edge even when its handle does not match.
    pub single_edge_fallback: bool,
    /// Take the first edge when every outgoing edge carries the same handle.
    pub duplicate_handle_fallback: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            single_edge_fallback: true,
            duplicate_handle_fallback: true,
        }
    }
}

impl TraversalConfig {
    /// Only exact matches and default exits.
    pub fn strict() -> Self {
        Self {
            single_edge_fallback: false,
            duplicate_handle_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocatorConfig {
    /// Length of generated port ids.
    pub id_length: usize,
    /// Consecutive collisions tolerated before generated ids grow by one character.
    pub max_attempts: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            id_length: 8,
            max_attempts: 64,
        }
    }
}

/// What the editor does with edges whose source port was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrphanPolicy {
    /// Delete the edges together with the port.
    #[default]
    Delete,
    /// Keep the edges; they show up as orphan warnings and never match during traversal.
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub orphan_policy: OrphanPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Upper bound on transitions handled by one `pump` call. Blocks that emit as soon as
    /// they are activated would otherwise spin forever on a cyclic graph.
    pub max_steps_per_pump: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_steps_per_pump: 1024,
        }
    }
}

/// Top-level configuration. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LessonflowConfig {
    pub traversal: TraversalConfig,
    pub allocator: AllocatorConfig,
    pub editor: EditorConfig,
    pub player: PlayerConfig,
}

impl LessonflowConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
