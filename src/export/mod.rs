//! Model export and serialization
//!
//! Persists the selected model as a checksummed artifact, in a compact
//! bincode encoding or as portable JSON.

mod serializer;

pub use serializer::{
    load_artifact, save_artifact, ArtifactMetadata, ModelArtifact, SerializationFormat,
};
