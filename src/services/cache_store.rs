//! Cache Store: file-backed, keyed by `(cast_type, lat, lon)`.
//!
//! All I/O here is synchronous (`std::fs`); callers are expected to run it
//! through `tokio::task::spawn_blocking` so a slow disk never stalls the
//! async reactor.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::Utc;

use crate::services::upstream::CastType;
use crate::timeseries::is_valid_response;

/// Fresh/stale boundary for a cache entry.
pub const CACHE_TTL_SECONDS: u64 = 120;

#[derive(Debug, Clone)]
pub struct CacheStore {
    data_dir: PathBuf,
    save_history: bool,
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub present: bool,
    pub age_seconds: Option<u64>,
    pub bytes: Option<Vec<u8>>,
}

impl CacheLookup {
    pub fn is_fresh(&self) -> bool {
        self.present
            && self
                .age_seconds
                .is_some_and(|age| age <= CACHE_TTL_SECONDS)
    }
}

impl CacheStore {
    pub fn new(data_dir: impl Into<PathBuf>, save_history: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            save_history,
        }
    }

    fn cache_path(&self, cast_type: CastType, lat: f64, lon: f64) -> PathBuf {
        self.data_dir.join("cache").join(format!(
            "yr-cache-{}.{:.3}_{:.3}.json",
            cast_type.cache_key_name(),
            lat,
            lon
        ))
    }

    fn history_path(&self, cast_type: CastType, lat: f64, lon: f64, now: chrono::DateTime<Utc>) -> PathBuf {
        self.data_dir
            .join("history")
            .join(now.format("%Y-%m-%d").to_string())
            .join(format!(
                "yr-{}-{:.3}_{:.3}-{}.json",
                cast_type.cache_key_name(),
                lat,
                lon,
                now.format("%Y%m%dT%H%M%S")
            ))
    }

    /// Look up an entry without interpreting freshness; the caller decides.
    pub fn lookup(&self, cast_type: CastType, lat: f64, lon: f64) -> CacheLookup {
        let path = self.cache_path(cast_type, lat, lon);
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(_) => {
                return CacheLookup {
                    present: false,
                    age_seconds: None,
                    bytes: None,
                }
            }
        };

        let age_seconds = metadata
            .modified()
            .ok()
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
            .map(|d| d.as_secs())
            .unwrap_or(u64::MAX);

        let bytes = std::fs::read(&path).ok();

        CacheLookup {
            present: bytes.is_some(),
            age_seconds: Some(age_seconds),
            bytes,
        }
    }

    /// Full-file replace. Parent directories are created lazily here rather
    /// than at service start, to tolerate a data dir wiped out from under us.
    pub fn write(&self, cast_type: CastType, lat: f64, lon: f64, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.cache_path(cast_type, lat, lon);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        if self.save_history {
            self.append_history(cast_type, lat, lon, bytes);
        }

        Ok(())
    }

    /// Debug-only archive. Failures here are logged, never propagated —
    /// history is not read by any core logic.
    fn append_history(&self, cast_type: CastType, lat: f64, lon: f64, bytes: &[u8]) {
        let path = self.history_path(cast_type, lat, lon, Utc::now());
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create history dir {:?}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, bytes) {
            tracing::warn!("failed to write history file {:?}: {}", path, e);
        }
    }

    /// Re-validate shape before handing back a stale entry; an entry that no
    /// longer parses as a valid response is treated as absent.
    pub fn read_stale(
        &self,
        cast_type: CastType,
        lat: f64,
        lon: f64,
    ) -> Option<(serde_json::Value, u64)> {
        let lookup = self.lookup(cast_type, lat, lon);
        let bytes = lookup.bytes?;
        let age = lookup.age_seconds.unwrap_or(u64::MAX);

        let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        if !is_valid_response(&json) {
            return None;
        }
        Some((json, age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_missing_file_is_absent() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), false);
        let result = store.lookup(CastType::Nowcast, 60.1, 24.9);
        assert!(!result.present);
    }

    #[test]
    fn test_write_then_lookup_is_fresh() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), false);
        let body = serde_json::json!({"properties": {"timeseries": [{"time": "2026-01-01T00:00:00Z"}]}});
        store
            .write(CastType::Nowcast, 60.1, 24.9, body.to_string().as_bytes())
            .unwrap();

        let result = store.lookup(CastType::Nowcast, 60.1, 24.9);
        assert!(result.present);
        assert!(result.is_fresh());
    }

    #[test]
    fn test_read_stale_rejects_invalid_shape() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), false);
        store
            .write(CastType::Nowcast, 60.1, 24.9, b"{\"not\":\"valid\"}")
            .unwrap();

        assert!(store.read_stale(CastType::Nowcast, 60.1, 24.9).is_none());
    }

    #[test]
    fn test_read_stale_accepts_valid_shape() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), false);
        let body = serde_json::json!({"properties": {"timeseries": [{"time": "2026-01-01T00:00:00Z"}]}});
        store
            .write(CastType::Nowcast, 60.1, 24.9, body.to_string().as_bytes())
            .unwrap();

        let (json, age) = store.read_stale(CastType::Nowcast, 60.1, 24.9).unwrap();
        assert!(is_valid_response(&json));
        assert!(age < 5);
    }

    #[test]
    fn test_history_disabled_by_default_writes_nothing() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), false);
        store
            .write(CastType::Nowcast, 60.1, 24.9, b"{\"properties\":{\"timeseries\":[{}]}}")
            .unwrap();
        assert!(!dir.path().join("history").exists());
    }

    #[test]
    fn test_history_enabled_writes_file() {
        let dir = tempdir();
        let store = CacheStore::new(dir.path(), true);
        store
            .write(CastType::Locationforecast, 59.91, 10.75, b"{\"properties\":{\"timeseries\":[{}]}}")
            .unwrap();
        assert!(dir.path().join("history").exists());
    }

    /// Minimal temp-dir helper so this module doesn't need a `tempfile`
    /// dev-dependency just for a handful of filesystem tests.
    struct TempDir(PathBuf);
    impl TempDir {
        fn path(&self) -> &std::path::Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir() -> TempDir {
        let mut path = std::env::temp_dir();
        let unique = format!(
            "ledcast-test-{}-{}",
            std::process::id(),
            std::ptr::addr_of!(path) as usize
        );
        path.push(unique);
        std::fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }
}
