//! Configuration

use std::path::PathBuf;

/// Startup configuration. The chat-platform credential is consumed by the
/// external transport binding, not by the core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store file location; `None` keeps all records in memory.
    pub store_path: Option<PathBuf>,
    /// Base URL of the geocoding service.
    pub geocoder_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: std::env::var_os("DB_PATH").map(PathBuf::from),
            geocoder_url: crate::locate::OpenMeteoGeocoder::DEFAULT_URL.to_string(),
        }
    }
}

impl Config {
    /// Config for tests with a temp-dir store.
    pub fn for_test(temp_dir: &std::path::Path) -> Self {
        Self {
            store_path: Some(temp_dir.join("users.json")),
            geocoder_url: "http://localhost:0".to_string(),
        }
    }
}
