//! Location of the local SQLite cache.

use capm_data::DataError;
use capm_data::cache::SqliteCache;
use std::path::PathBuf;

/// Platform cache directory for capm.
///
/// - Linux: `~/.cache/capm/`
/// - macOS: `~/Library/Caches/capm/`
/// - Windows: `%LOCALAPPDATA%\capm\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("capm")
}

/// Path of the cache database.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("capm.db")
}

/// Open the cache, creating its directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let path = cache_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    SqliteCache::new(&path)
}
