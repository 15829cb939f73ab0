#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use once_cell::sync::Lazy;
use subfox_config::RemoteConfig;
use subfox_core::SessionController;
use subfox_remote::LiveFactory;
use subfox_storage_json::JsonCacheStore;
use tempfile::TempDir;

pub const SANDBOX_USER: &str = "test";

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory that outlives the test.
pub fn temp_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

/// Controller over a JSON cache in `cache_dir` and an unconfigured live
/// backend, so only the sandbox user can sync.
pub fn controller(cache_dir: PathBuf) -> (SessionController, Arc<JsonCacheStore>) {
    let cache = Arc::new(JsonCacheStore::new(cache_dir).expect("create cache store"));
    let controller = SessionController::new(
        cache.clone(),
        Arc::new(LiveFactory::new(RemoteConfig::default())),
        SANDBOX_USER,
    );
    (controller, cache)
}
