use crate::domain::error::{AppError, Result};
use crate::domain::price_model::TrainedModel;
use crate::domain::schema::PriceSchema;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAGIC: &[u8; 4] = b"PRCM";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2 + 32;

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::ArtifactIo(msg.into())
}

/// The single on-disk model artifact.
///
/// Layout: `PRCM` magic, little-endian `u16` format version, SHA-256 of the payload,
/// then the bincode payload (manifest + fitted pipeline).
#[derive(Debug, Clone)]
pub struct ModelArtifactStore {
    path: PathBuf,
}

impl ModelArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serializes and atomically replaces the artifact.
    pub fn save(&self, trained: &TrainedModel) -> Result<()> {
        let bytes = encode_artifact(trained)?;
        atomic_write_bytes(&self.path, &bytes)?;
        tracing::info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            rows = trained.manifest.training_rows,
            "Saved model artifact"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<TrainedModel> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::ModelNotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => {
                return Err(io_err(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };
        tracing::info!(path = %self.path.display(), "Loading model");
        decode_artifact(&bytes)
    }

    /// Loads and checks the manifest against the schema the caller expects.
    pub fn load_for(&self, schema: &PriceSchema) -> Result<TrainedModel> {
        let trained = self.load()?;
        if !trained.manifest.matches(schema) {
            return Err(AppError::SchemaMismatch {
                expected: schema.required_columns(),
                found: trained.manifest.field_names(),
            });
        }
        Ok(trained)
    }
}

pub fn encode_artifact(trained: &TrainedModel) -> Result<Vec<u8>> {
    let payload = bincode::serialize(trained)
        .map_err(|e| io_err(format!("Failed to serialize model: {e}")))?;
    let digest = Sha256::digest(&payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&digest);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode_artifact(bytes: &[u8]) -> Result<TrainedModel> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(io_err("File is not a model artifact"));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(io_err(format!(
            "Unsupported artifact format version {version} (expected {FORMAT_VERSION})"
        )));
    }

    let stored = &bytes[6..HEADER_LEN];
    let payload = &bytes[HEADER_LEN..];
    let actual = Sha256::digest(payload);
    if stored != actual.as_slice() {
        return Err(io_err(format!(
            "Checksum mismatch: header {} payload {}",
            hex::encode(stored),
            hex::encode(actual)
        )));
    }

    bincode::deserialize(payload).map_err(|e| io_err(format!("Failed to decode model: {e}")))
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))?;
    Ok(())
}

/// Writes to a sibling temp file, syncs it, then renames over `path`.
/// Readers see either the previous file or the complete new one.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(format!(
            "Failed to write temp file {}: {e}",
            tmp_path.display()
        )));
    }

    // rename replaces the destination in one step on both Unix and Windows.
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    sync_parent_dir(path)
}

/// Flushes the directory entry written by the rename so it survives a power loss.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| io_err(format!("Failed to sync dir {}: {e}", parent.display())))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
