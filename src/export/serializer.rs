//! Artifact envelope and atomic persistence of the selected model

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Result, TrainerError};
use crate::training::{ModelKind, Params, RegressorModel};

/// Serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerializationFormat {
    /// Binary format using bincode (efficient)
    #[default]
    Binary,
    /// JSON format (portable, human-readable)
    Json,
}

/// Description of the persisted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Registry name the model was selected under
    pub model_name: String,
    pub model_kind: ModelKind,
    /// Hyperparameters chosen by the search
    pub best_params: Params,
    /// R² on the test split at selection time
    pub test_r2: Option<f64>,
    pub n_features: usize,
    /// Version of the crate that wrote the artifact
    pub crate_version: String,
    /// RFC 3339 timestamp
    pub trained_at: String,
}

impl ArtifactMetadata {
    pub fn new(model_name: impl Into<String>, model: &RegressorModel, n_features: usize) -> Self {
        Self {
            model_name: model_name.into(),
            model_kind: model.kind(),
            best_params: Params::new(),
            test_r2: None,
            n_features,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_best_params(mut self, params: Params) -> Self {
        self.best_params = params;
        self
    }

    pub fn with_test_r2(mut self, score: f64) -> Self {
        self.test_r2 = Some(score);
        self
    }
}

/// On-disk envelope around the encoded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    pub metadata: ArtifactMetadata,
    /// bincode encoding of the `RegressorModel`
    pub model_data: Vec<u8>,
    /// FNV-1a hash of `model_data`
    pub checksum: u64,
}

impl ModelArtifact {
    pub const MAGIC: [u8; 4] = [b'M', b'T', b'R', b'M'];
    pub const VERSION: u32 = 1;

    pub fn new(model: &RegressorModel, metadata: ArtifactMetadata) -> Result<Self> {
        let model_data = bincode::serialize(model)?;
        let checksum = compute_checksum(&model_data);
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        })
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        compute_checksum(&self.model_data) == self.checksum
    }

    /// Check the envelope and decode the model
    pub fn into_model(self) -> Result<(RegressorModel, ArtifactMetadata)> {
        if self.magic != Self::MAGIC {
            return Err(TrainerError::SerializationError(
                "Not a model artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(TrainerError::SerializationError(format!(
                "Unsupported artifact version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(TrainerError::SerializationError(
                "Checksum verification failed - file may be corrupted".to_string(),
            ));
        }
        let model: RegressorModel = bincode::deserialize(&self.model_data)?;
        Ok((model, self.metadata))
    }

    fn encode(&self, format: SerializationFormat) -> Result<Vec<u8>> {
        Ok(match format {
            SerializationFormat::Binary => bincode::serialize(self)?,
            SerializationFormat::Json => serde_json::to_vec_pretty(self)?,
        })
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let is_json = bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .map_or(false, |&b| b == b'{');
        if is_json {
            Ok(serde_json::from_slice(bytes)?)
        } else {
            Ok(bincode::deserialize(bytes)?)
        }
    }
}

/// Compute checksum using FNV-1a hash
fn compute_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Write `model` to `path`, replacing any existing file.
///
/// The bytes go to a temporary file in the destination directory which is
/// synced and then renamed over `path`; a failure at any point leaves `path`
/// untouched and removes the temporary file.
pub fn save_artifact(
    model: &RegressorModel,
    metadata: ArtifactMetadata,
    path: impl AsRef<Path>,
    format: SerializationFormat,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = ModelArtifact::new(model, metadata)?.encode(format)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(&bytes)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TrainerError::IoError(e.error))?;
    Ok(())
}

/// Load an artifact written by [`save_artifact`] in either format
pub fn load_artifact(path: impl AsRef<Path>) -> Result<(RegressorModel, ArtifactMetadata)> {
    let bytes = fs::read(path.as_ref())?;
    ModelArtifact::decode(&bytes)?.into_model()
}
