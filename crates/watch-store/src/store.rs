use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::watch_types::{StoreError, Watch};

/// Thread-safe registry of watches mirrored to a JSON file.
///
/// A single mutex guards both the in-memory collection and the file write,
/// so concurrent mutations serialize against each other. The whole
/// collection is rewritten on every mutation; watch counts are small enough
/// that this stays cheap. Reads hand out clones, so callers never touch the
/// backing collection directly.
pub struct WatchStore {
    watches: Mutex<Vec<Watch>>,
    path: PathBuf,
}

impl WatchStore {
    /// Open the store at `path`, creating an empty watch file if none
    /// exists. A file that exists but does not parse is fatal; there is no
    /// partial-recovery mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let watches: Vec<Watch> = match fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent).await?;
                    }
                }
                fs::write(&path, b"[]").await?;
                Vec::new()
            }
            Err(err) => return Err(StoreError::Persistence(err)),
        };

        info!("loaded {} watches from {}", watches.len(), path.display());

        Ok(Self {
            watches: Mutex::new(watches),
            path,
        })
    }

    /// Append a watch and persist the collection.
    ///
    /// On a persistence failure the append stays visible in memory; callers
    /// must treat disk state as possibly stale and may retry the whole
    /// operation.
    pub async fn create(&self, watch: Watch) -> Result<(), StoreError> {
        let mut watches = self.watches.lock().await;
        debug!("creating watch {} for user {}", watch.id, watch.user_id);
        watches.push(watch);
        self.persist(&watches).await
    }

    /// Flip a watch's active flag and persist. Returns
    /// `StoreError::NotFound` when no watch has the given id.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), StoreError> {
        let mut watches = self.watches.lock().await;
        match watches.iter_mut().find(|watch| watch.id == id) {
            Some(watch) => watch.active = active,
            None => return Err(StoreError::NotFound(id)),
        }
        self.persist(&watches).await
    }

    /// Look up a single watch by id.
    pub async fn get(&self, id: Uuid) -> Result<Watch, StoreError> {
        let watches = self.watches.lock().await;
        watches
            .iter()
            .find(|watch| watch.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// All watches belonging to a user, active or not.
    pub async fn list_for_user(&self, user_id: &str) -> Vec<Watch> {
        let watches = self.watches.lock().await;
        watches
            .iter()
            .filter(|watch| watch.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Snapshot of the watches currently being monitored.
    pub async fn list_active(&self) -> Vec<Watch> {
        let watches = self.watches.lock().await;
        watches.iter().filter(|watch| watch.active).cloned().collect()
    }

    async fn persist(&self, watches: &[Watch]) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(watches)?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }
}
