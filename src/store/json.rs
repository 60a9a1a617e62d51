//! JSON-file store under a data directory.
//!
//! Layout:
//!   <data_dir>/actions.json: every live action record, creation order
//!   <data_dir>/users.json: user directory, maintained by hand
//!
//! Missing files read as empty lists.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::RecordStore;
use crate::action::{ActionPatch, ActionRecord, NewActionRecord, User};
use crate::error::{CapaError, Result};

const ACTIONS_FILE: &str = "actions.json";
const USERS_FILE: &str = "users.json";

pub struct JsonStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on actions.json within this process.
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn actions_path(&self) -> PathBuf {
        self.dir.join(ACTIONS_FILE)
    }

    fn users_path(&self) -> PathBuf {
        self.dir.join(USERS_FILE)
    }

    async fn load_actions(&self) -> Result<Vec<ActionRecord>> {
        load_list(&self.actions_path()).await
    }

    async fn save_actions(&self, records: &[ActionRecord]) -> Result<()> {
        save_list(&self.actions_path(), records).await
    }
}

async fn load_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    debug!(path = %path.display(), "loaded list");
    Ok(serde_json::from_str(&content)?)
}

/// Writes via a sibling temp file and rename so a crash never leaves half a file.
/// The temp name is unique per write, so concurrent writers never share one.
async fn save_list<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(path);
    let content = serde_json::to_string_pretty(items)?;
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), count = items.len(), "saved list");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

impl RecordStore for JsonStore {
    async fn list_action_records(&self) -> Result<Vec<ActionRecord>> {
        self.load_actions().await
    }

    async fn create_action_record(&self, new: NewActionRecord) -> Result<ActionRecord> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_actions().await?;
        let record = ActionRecord::from_new(Uuid::new_v4().to_string(), new);
        records.push(record.clone());
        self.save_actions(&records).await?;
        Ok(record)
    }

    async fn update_action_record(&self, id: &str, patch: &ActionPatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_actions().await?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CapaError::NotFound(id.to_string()))?;
        record.apply(patch);
        self.save_actions(&records).await
    }

    async fn delete_action_record(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_actions().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(CapaError::NotFound(id.to_string()));
        }
        self.save_actions(&records).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        load_list(&self.users_path()).await
    }
}
