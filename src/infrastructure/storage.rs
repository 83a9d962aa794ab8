use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

pub const MODEL_FILE_NAME: &str = "model.bin";

/// On-disk layout: `<data_dir>/models/model.bin` and `<data_dir>/data/uploads/`.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    data_dir: PathBuf,
    models_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            models_dir: data_dir.join("models"),
            uploads_dir: data_dir.join("data").join("uploads"),
        }
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        ensure_dir(&self.models_dir)?;
        ensure_dir(&self.uploads_dir)?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(MODEL_FILE_NAME)
    }

    /// Keeps a timestamp-prefixed copy of an uploaded CSV. Never read back by the app.
    pub fn archive_upload(&self, original_name: Option<&str>, bytes: &[u8]) -> std::io::Result<PathBuf> {
        ensure_dir(&self.uploads_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let name = sanitize_file_name(original_name.unwrap_or("upload.csv"));
        let mut path = self.uploads_dir.join(format!("{}_{}", stamp, name));
        if path.exists() {
            let short_id = Uuid::new_v4().simple().to_string();
            path = self
                .uploads_dir
                .join(format!("{}_{}_{}", stamp, &short_id[..8], name));
        }

        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Strips directories and anything outside `[A-Za-z0-9._-]`; guarantees a `.csv` suffix.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');
    let cleaned = if cleaned.is_empty() { "upload" } else { cleaned };

    if cleaned.to_lowercase().ends_with(".csv") {
        cleaned.to_string()
    } else {
        format!("{}.csv", cleaned)
    }
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
