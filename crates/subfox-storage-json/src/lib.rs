use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use subfox_core::{storage::CacheStore, CoreError, CACHE_KEY};
use subfox_domain::Subscription;
use tracing::warn;

pub mod backup;

pub use backup::{export_file_name, export_to_dir, read_import_file};

const CACHE_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// File-backed key-value cache. Each key maps to one pretty-printed JSON
/// file inside `root`; writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    root: PathBuf,
    key: String,
}

impl JsonCacheStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        Self::with_key(root, CACHE_KEY)
    }

    pub fn with_key(root: PathBuf, key: &str) -> Result<Self, CoreError> {
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            key: key.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, CACHE_EXTENSION))
    }

    /// Path of the file backing the subscription collection.
    pub fn path(&self) -> PathBuf {
        self.key_path(&self.key)
    }
}

impl CacheStore for JsonCacheStore {
    fn load(&self) -> Vec<Subscription> {
        let path = self.path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cache unreadable; starting empty");
                return Vec::new();
            }
        };
        if data.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cache content malformed; starting empty");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[Subscription]) -> Result<(), CoreError> {
        let path = self.path();
        let data = serialize_records(records)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &data).map_err(|err| CoreError::Cache(err.to_string()))?;
        replace_file(&tmp, &path).map_err(|err| CoreError::Cache(err.to_string()))
    }
}

pub(crate) fn serialize_records(records: &[Subscription]) -> Result<String, CoreError> {
    serde_json::to_string_pretty(records).map_err(|err| CoreError::Serde(err.to_string()))
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Moves `tmp` over `path`. The temp file is removed when the rename fails.
pub(crate) fn replace_file(tmp: &Path, path: &Path) -> std::io::Result<()> {
    fs::rename(tmp, path).map_err(|err| {
        let _ = fs::remove_file(tmp);
        err
    })
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
