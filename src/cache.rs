use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::Digest as _;
use tokio::fs;
use tokio::sync::Mutex;

use crate::formats::CacheEntry;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Key-value store for rendered fragments. Expired entries read as `None`.
#[async_trait]
pub trait FragmentCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, fragment: &str, ttl: Duration) -> anyhow::Result<()>;
}

pub struct InMemoryFragmentCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Clock,
}

impl InMemoryFragmentCache {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for InMemoryFragmentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FragmentCache for InMemoryFragmentCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = (self.clock)();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.fragment.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, fragment: &str, ttl: Duration) -> anyhow::Result<()> {
        let entry = new_entry(key, fragment, ttl, (self.clock)());
        self.entries.lock().await.insert(key.to_owned(), entry);
        Ok(())
    }
}

/// One JSON file per key under `<base_dir>/fragments/`.
#[derive(Clone)]
pub struct LocalFsFragmentCache {
    base_dir: PathBuf,
    clock: Clock,
}

impl std::fmt::Debug for LocalFsFragmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFsFragmentCache")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl LocalFsFragmentCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(base_dir, system_clock())
    }

    pub fn with_clock(base_dir: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            base_dir: base_dir.into(),
            clock,
        }
    }

    fn fragments_dir(&self) -> PathBuf {
        self.base_dir.join("fragments")
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.fragments_dir().join(format!("{}.json", sha256_hex(key)))
    }
}

#[async_trait]
impl FragmentCache for LocalFsFragmentCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.entry_path(key);
        let Some(entry) = read_entry(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?
        else {
            return Ok(None);
        };
        if entry.key != key {
            tracing::warn!(path = %path.display(), "cache entry key mismatch; ignoring");
            return Ok(None);
        }
        if entry.expires_at <= (self.clock)() {
            tracing::debug!(key, expires_at = %entry.expires_at, "cache entry expired");
            if let Err(err) = fs::remove_file(&path).await {
                tracing::debug!(path = %path.display(), ?err, "failed to remove expired cache entry");
            }
            return Ok(None);
        }
        Ok(Some(entry.fragment))
    }

    async fn set(&self, key: &str, fragment: &str, ttl: Duration) -> anyhow::Result<()> {
        let entry = new_entry(key, fragment, ttl, (self.clock)());
        let path = self.entry_path(key);
        write_entry_atomic(&path, &entry)
            .await
            .with_context(|| format!("write: {}", path.display()))
    }
}

fn new_entry(key: &str, fragment: &str, ttl: Duration, now: DateTime<Utc>) -> CacheEntry {
    CacheEntry {
        key: key.to_owned(),
        fragment: fragment.to_owned(),
        stored_at: now,
        expires_at: now + ttl,
    }
}

async fn read_entry(path: &Path) -> anyhow::Result<Option<CacheEntry>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let entry = serde_json::from_slice(&bytes).context("parse cache entry json")?;
    Ok(Some(entry))
}

async fn write_entry_atomic(path: &Path, entry: &CacheEntry) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec(entry).context("serialize cache entry")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path).await {
        if let Err(remove_err) = fs::remove_file(&tmp_path).await {
            tracing::warn!(
                path = %tmp_path.display(),
                ?remove_err,
                "failed to remove tmp cache entry"
            );
        }
        return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
    }
    Ok(())
}

fn sha256_hex(input: &str) -> String {
    hex::encode(sha2::Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone as _;

    use super::*;

    fn manual_clock() -> (Clock, Arc<AtomicI64>) {
        let offset_secs = Arc::new(AtomicI64::new(0));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let offset = Arc::clone(&offset_secs);
        let clock: Clock =
            Arc::new(move || start + Duration::seconds(offset.load(Ordering::SeqCst)));
        (clock, offset_secs)
    }

    #[tokio::test]
    async fn in_memory_round_trip_until_expiry() -> anyhow::Result<()> {
        let (clock, offset) = manual_clock();
        let cache = InMemoryFragmentCache::with_clock(clock);

        assert_eq!(cache.get("k").await?, None);
        cache.set("k", "<ol></ol>", Duration::hours(24)).await?;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("k").await?.as_deref(), Some("<ol></ol>"));

        offset.store(24 * 3600 - 1, Ordering::SeqCst);
        assert_eq!(cache.get("k").await?.as_deref(), Some("<ol></ol>"));

        offset.store(24 * 3600, Ordering::SeqCst);
        assert_eq!(cache.get("k").await?, None);
        assert!(cache.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn local_fs_entries_survive_new_instance() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let (clock, _) = manual_clock();

        let cache = LocalFsFragmentCache::with_clock(temp.path(), Arc::clone(&clock));
        cache.set("story_1", "<p>one</p>", Duration::hours(24)).await?;

        let reopened = LocalFsFragmentCache::with_clock(temp.path(), clock);
        assert_eq!(reopened.get("story_1").await?.as_deref(), Some("<p>one</p>"));
        assert_eq!(reopened.get("story_2").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn local_fs_expired_entry_is_removed() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let (clock, offset) = manual_clock();
        let cache = LocalFsFragmentCache::with_clock(temp.path(), clock);

        cache.set("story_1", "<p>one</p>", Duration::hours(24)).await?;
        let path = cache.entry_path("story_1");
        assert!(path.exists());

        offset.store(25 * 3600, Ordering::SeqCst);
        assert_eq!(cache.get("story_1").await?, None);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn local_fs_corrupt_entry_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let cache = LocalFsFragmentCache::new(temp.path());
        let path = cache.entry_path("story_1");
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, b"not json")?;

        assert!(cache.get("story_1").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn local_fs_failed_rename_leaves_no_tmp_file() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let cache = LocalFsFragmentCache::new(temp.path());
        // A non-empty directory in the entry's place makes the final rename fail.
        let path = cache.entry_path("story_1");
        std::fs::create_dir_all(&path)?;
        std::fs::write(path.join("occupied"), b"x")?;

        assert!(cache.set("story_1", "<p>one</p>", Duration::hours(24)).await.is_err());

        let leftovers = std::fs::read_dir(path.parent().unwrap())?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn entry_file_name_is_key_digest() {
        let cache = LocalFsFragmentCache::new("data");
        let path = cache.entry_path("abc");
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.json")
        );
    }
}
