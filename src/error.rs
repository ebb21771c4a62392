use thiserror::Error;

/// A malformed node or edge record. Raised at the authoring and load boundary so that a
/// bad record never reaches the traversal engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Node '{node_id}' has an unknown node type: '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("{record} is missing required field '{field}'")]
    MissingField { record: String, field: String },

    #[error("Duplicate node id '{0}'")]
    DuplicateNodeId(String),

    #[error("Duplicate edge id '{0}'")]
    DuplicateEdgeId(String),

    #[error("Node '{node_id}' defines port id '{port_id}' more than once")]
    DuplicatePortId { node_id: String, port_id: String },

    #[error("Edge '{edge_id}' references node '{missing_node_id}', which does not exist")]
    DanglingReference {
        edge_id: String,
        missing_node_id: String,
    },

    #[error("Edge '{edge_id}' uses handle '{handle}', which node '{node_id}' does not define")]
    UnknownHandle {
        edge_id: String,
        node_id: String,
        handle: String,
    },

    #[error("Node '{node_id}' still stores legacy ports in '{collection}'; run the schema upgrade first")]
    LegacyPorts { node_id: String, collection: String },

    #[error("Node '{node_id}' is invalid: {message}")]
    InvalidNode { node_id: String, message: String },
}

/// Errors raised by the port allocator's authoring operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("Node '{node_id}' of type '{node_type}' has no {kind} ports")]
    UnsupportedKind {
        node_id: String,
        node_type: String,
        kind: String,
    },

    #[error("Port '{port_id}' not found on node '{node_id}'")]
    PortNotFound { node_id: String, port_id: String },

    #[error("Node '{0}' must keep at least one input port")]
    LastInput(String),
}

/// Errors that can occur while driving a play session.
///
/// Reaching the end of a lesson is not an error; see [`crate::engine::Step::NoPath`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    #[error("Cannot start a lesson whose graph has no nodes")]
    EmptyGraph,

    #[error("No lesson session has been started")]
    NotStarted,

    #[error("Node '{0}' is not part of the loaded lesson")]
    NodeNotFound(String),
}

/// Errors raised while reading or converting persisted lesson records.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to parse lesson JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid custom data: {0}")]
    Conversion(String),
}

/// Errors raised when encoding, decoding or storing binary artifacts.
#[derive(Error, Debug, Clone)]
pub enum ArtifactError {
    #[error("Artifact error: {0}")]
    Generic(String),

    #[error("Snapshot for lesson '{snapshot}' cannot be restored into lesson '{loaded}'")]
    LessonMismatch { snapshot: String, loaded: String },

    #[error("Snapshot references node '{0}', which the lesson does not contain")]
    UnknownNode(String),
}

/// Errors reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lesson '{0}' not found")]
    LessonNotFound(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the authoring editor.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("An edge from '{source_id}' to '{target_id}' on handle {handle:?} already exists")]
    DuplicateEdge {
        source_id: String,
        target_id: String,
        handle: Option<String>,
    },
}

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
