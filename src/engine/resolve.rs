use crate::config::TraversalConfig;
use crate::lesson::Edge;
use crate::schema::normalize_handle;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rung of the fallback ladder selected an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchRule {
    /// The edge's source handle equals the outcome token.
    ExactHandle,
    /// No token was given and the edge has no source handle.
    DefaultExit,
    /// The node has a single outgoing edge, taken regardless of its handle.
    SingleEdge,
    /// Every outgoing edge shares one handle; the first was taken.
    DuplicateHandle,
}

impl MatchRule {
    /// Whether the match papered over an authoring inconsistency.
    pub fn is_fallback(&self) -> bool {
        matches!(self, MatchRule::SingleEdge | MatchRule::DuplicateHandle)
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::ExactHandle => write!(f, "exact handle"),
            MatchRule::DefaultExit => write!(f, "default exit"),
            MatchRule::SingleEdge => write!(f, "single-edge fallback"),
            MatchRule::DuplicateHandle => write!(f, "duplicate-handle fallback"),
        }
    }
}

/// Picks the edge to follow out of a node.
///
/// `outgoing` must be the node's outgoing edges in stored order. The result depends only
/// on the edges, the token and the config. Rules are tried strictly in order:
///
/// 1. an edge whose source handle equals the token;
/// 2. with no token, the first edge without a source handle;
/// 3. the only outgoing edge, if there is exactly one;
/// 4. the first edge, if all edges share one source handle;
///
/// and `None` when nothing applies. Blank tokens count as no token.
pub fn resolve_edge<'e>(
    outgoing: &[&'e Edge],
    token: Option<&str>,
    config: &TraversalConfig,
) -> Option<(&'e Edge, MatchRule)> {
    let token = normalize_handle(token);

    if let Some(token) = token {
        if let Some(edge) = outgoing
            .iter()
            .find(|e| normalize_handle(e.source_handle.as_deref()) == Some(token))
        {
            return Some((*edge, MatchRule::ExactHandle));
        }
    } else if let Some(edge) = outgoing
        .iter()
        .find(|e| normalize_handle(e.source_handle.as_deref()).is_none())
    {
        return Some((*edge, MatchRule::DefaultExit));
    }

    match outgoing {
        [only] if config.single_edge_fallback => Some((*only, MatchRule::SingleEdge)),
        [first, _, ..]
            if config.duplicate_handle_fallback
                && outgoing
                    .iter()
                    .map(|e| normalize_handle(e.source_handle.as_deref()))
                    .all_equal() =>
        {
            Some((*first, MatchRule::DuplicateHandle))
        }
        _ => None,
    }
}
