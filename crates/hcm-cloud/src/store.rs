//! Persistence collaborator for normalized resource records
//!
//! Orchestrators hand only their final classified ids to a [`ResourceStore`].
//! [`FileResourceStore`] keeps the records in `.hcm/state.json`.

use crate::error::{CloudError, Result};
use crate::operation::ResourceKind;
use crate::vendor::Vendor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".hcm";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_STAGING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// Normalized record of one cloud resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub vendor: Vendor,
    pub resource: ResourceKind,
    pub cloud_id: String,
    pub region: String,

    /// Parent cloud ids (load balancer, listener, ...) keyed by role
    #[serde(default)]
    pub parents: HashMap<String, String>,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(
        vendor: Vendor,
        resource: ResourceKind,
        cloud_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            vendor,
            resource,
            cloud_id: cloud_id.into(),
            region: region.into(),
            parents: HashMap::new(),
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, role: impl Into<String>, cloud_id: impl Into<String>) -> Self {
        self.parents.insert(role.into(), cloud_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Store key (vendor:resource:cloud_id)
    pub fn key(&self) -> String {
        record_key(self.vendor, self.resource, &self.cloud_id)
    }
}

pub fn record_key(vendor: Vendor, resource: ResourceKind, cloud_id: &str) -> String {
    format!("{vendor}:{resource}:{cloud_id}")
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Insert or replace records; existing records keep their creation time
    async fn upsert(&self, records: Vec<ResourceRecord>) -> Result<()>;

    /// Remove records, returning how many existed
    async fn remove(&self, vendor: Vendor, resource: ResourceKind, cloud_ids: &[String])
    -> Result<usize>;

    async fn get(
        &self,
        vendor: Vendor,
        resource: ResourceKind,
        cloud_id: &str,
    ) -> Result<Option<ResourceRecord>>;

    async fn list(&self, vendor: Vendor, resource: ResourceKind) -> Result<Vec<ResourceRecord>>;
}

/// Snapshot persisted in the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub resources: HashMap<String, ResourceRecord>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

/// JSON-file resource store guarded by an exclusive lock file
///
/// Writers take `.hcm/lock.json` with an exclusive create, so only one
/// process can hold it. The snapshot is written to a temporary file and
/// renamed over `state.json`; the previous snapshot is kept as a backup.
pub struct FileResourceStore {
    dir: PathBuf,
}

impl FileResourceStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn load(&self) -> Result<StoreSnapshot> {
        let content = match fs::read_to_string(self.path(STATE_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), "no resource state yet");
                return Ok(StoreSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        if snapshot.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "resource state version {} is newer than supported version {STATE_VERSION}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Replace the snapshot; readers see either the old or the new file
    pub async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path(STATE_STAGING);
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        match fs::copy(self.path(STATE_FILE), self.path(STATE_BACKUP)).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::rename(&staging, self.path(STATE_FILE)).await?;

        tracing::debug!(resources = snapshot.resources.len(), "saved resource state");
        Ok(())
    }

    /// Take the store lock
    ///
    /// A lock held for more than an hour is treated as abandoned and taken
    /// over once; any other held lock fails with `LockError`.
    pub async fn acquire_lock(&self) -> Result<StoreLock> {
        fs::create_dir_all(&self.dir).await?;
        let lock_path = self.path(LOCK_FILE);

        match create_lock_file(&lock_path).await {
            Err(CloudError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {}
            other => return other,
        }

        let holder = read_lock_holder(&lock_path).await?;
        let age = Utc::now().signed_duration_since(holder.acquired_at);
        if age < chrono::Duration::hours(STALE_LOCK_HOURS) {
            return Err(CloudError::LockError(format!(
                "resource state is locked by {} since {}",
                holder.holder, holder.acquired_at
            )));
        }

        tracing::warn!(
            holder = %holder.holder,
            since = %holder.acquired_at,
            "taking over abandoned resource state lock"
        );
        match fs::remove_file(&lock_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        create_lock_file(&lock_path).await.map_err(|e| match e {
            CloudError::Io(io) if io.kind() == ErrorKind::AlreadyExists => CloudError::LockError(
                "resource state lock was taken while replacing an abandoned one".to_string(),
            ),
            other => other,
        })
    }

    /// Load, modify and save the snapshot under the lock
    async fn modify<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreSnapshot) -> T + Send,
        T: Send,
    {
        let lock = self.acquire_lock().await?;
        let outcome = async {
            let mut snapshot = self.load().await?;
            let value = f(&mut snapshot);
            snapshot.updated_at = Utc::now();
            self.save(&snapshot).await?;
            Ok(value)
        }
        .await;
        lock.release().await?;
        outcome
    }
}

/// Create the lock file exclusively and record who holds it
async fn create_lock_file(path: &Path) -> Result<StoreLock> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let lock = StoreLock {
        path: path.to_path_buf(),
        released: false,
    };

    let holder = LockHolder {
        holder: format!(
            "{}:{}",
            std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            std::process::id()
        ),
        acquired_at: Utc::now(),
    };
    file.write_all(&serde_json::to_vec(&holder)?).await?;
    file.sync_all().await?;
    Ok(lock)
}

async fn read_lock_holder(path: &Path) -> Result<LockHolder> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CloudError::LockError(
                "resource state lock changed hands, try again".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    // an empty or partial file belongs to a holder that is still writing it
    serde_json::from_str(&content).map_err(|_| {
        CloudError::LockError("resource state lock is being acquired by another process".to_string())
    })
}

#[async_trait]
impl ResourceStore for FileResourceStore {
    async fn upsert(&self, records: Vec<ResourceRecord>) -> Result<()> {
        self.modify(move |snapshot| {
            for mut record in records {
                let key = record.key();
                if let Some(existing) = snapshot.resources.get(&key) {
                    record.created_at = existing.created_at;
                    record.updated_at = Utc::now();
                }
                snapshot.resources.insert(key, record);
            }
        })
        .await
    }

    async fn remove(
        &self,
        vendor: Vendor,
        resource: ResourceKind,
        cloud_ids: &[String],
    ) -> Result<usize> {
        let keys: Vec<String> = cloud_ids
            .iter()
            .map(|id| record_key(vendor, resource, id))
            .collect();
        self.modify(move |snapshot| {
            keys.iter()
                .filter(|k| snapshot.resources.remove(k.as_str()).is_some())
                .count()
        })
        .await
    }

    async fn get(
        &self,
        vendor: Vendor,
        resource: ResourceKind,
        cloud_id: &str,
    ) -> Result<Option<ResourceRecord>> {
        let snapshot = self.load().await?;
        Ok(snapshot
            .resources
            .get(&record_key(vendor, resource, cloud_id))
            .cloned())
    }

    async fn list(&self, vendor: Vendor, resource: ResourceKind) -> Result<Vec<ResourceRecord>> {
        let snapshot = self.load().await?;
        let mut records: Vec<ResourceRecord> = snapshot
            .resources
            .into_values()
            .filter(|r| r.vendor == vendor && r.resource == resource)
            .collect();
        records.sort_by(|a, b| a.cloud_id.cmp(&b.cloud_id));
        Ok(records)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockHolder {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// Held store lock; removed on release or drop
pub struct StoreLock {
    path: PathBuf,
    released: bool,
}

impl StoreLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
