use super::definition::{CURRENT_SCHEMA_VERSION, LessonGraph};
use crate::engine::Session;
use crate::error::ArtifactError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{Read, Write};

/// A validated lesson graph packed for fast loading by a player.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LessonBundle {
    pub schema_version: u32,
    pub graph: LessonGraph,
}

impl LessonBundle {
    pub fn new(graph: LessonGraph) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            graph,
        }
    }

    /// Saves the bundle to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        write_artifact(self, path)
    }

    /// Loads a bundle from a file.
    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        Self::from_bytes(&read_artifact(path)?)
    }

    /// Deserializes a bundle from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let bundle: Self = decode(bytes)?;
        if bundle.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(ArtifactError::Generic(format!(
                "Bundle schema version {} is newer than supported version {}",
                bundle.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(bundle)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode(self)
    }
}

/// A paused play session, tied to the lesson it was recorded against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub lesson_id: String,
    pub session: Session,
}

impl SessionSnapshot {
    pub fn new(lesson_id: impl Into<String>, session: Session) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            session,
        }
    }

    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        write_artifact(self, path)
    }

    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        Self::from_bytes(&read_artifact(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        decode(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode(self)
    }

    /// Checks that the snapshot belongs to `graph` and hands back the session.
    pub fn restore_into(self, graph: &LessonGraph) -> Result<Session, ArtifactError> {
        if self.lesson_id != graph.lesson.id {
            return Err(ArtifactError::LessonMismatch {
                snapshot: self.lesson_id,
                loaded: graph.lesson.id.clone(),
            });
        }
        let session = self.session;
        if let Some(missing) = session
            .history()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(session.current()))
            .find(|id| graph.node(id).is_none())
        {
            return Err(ArtifactError::UnknownNode(missing.to_string()));
        }
        Ok(session)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ArtifactError> {
    encode_to_vec(value, standard())
        .map_err(|e| ArtifactError::Generic(format!("Serialization failed: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ArtifactError> {
    decode_from_slice(bytes, standard())
        .map(|(value, _)| value) // bincode 2 returns (data, bytes_read)
        .map_err(|e| ArtifactError::Generic(format!("Deserialization failed: {}", e)))
}

fn write_artifact<T: Serialize>(value: &T, path: &str) -> Result<(), ArtifactError> {
    let bytes = encode(value)?;
    let mut file = fs::File::create(path)
        .map_err(|e| ArtifactError::Generic(format!("Could not create file '{}': {}", path, e)))?;
    file.write_all(&bytes)
        .map_err(|e| ArtifactError::Generic(format!("Could not write to file '{}': {}", path, e)))?;
    Ok(())
}

fn read_artifact(path: &str) -> Result<Vec<u8>, ArtifactError> {
    let mut file = fs::File::open(path)
        .map_err(|e| ArtifactError::Generic(format!("Could not open file '{}': {}", path, e)))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| ArtifactError::Generic(format!("Could not read from file '{}': {}", path, e)))?;
    Ok(bytes)
}
