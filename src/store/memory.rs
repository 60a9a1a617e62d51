use std::sync::Mutex;

use uuid::Uuid;

use super::RecordStore;
use crate::action::{ActionPatch, ActionRecord, NewActionRecord, User};
use crate::error::{CapaError, Result};

/// In-process store. Locks are never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ActionRecord>>,
    users: Vec<User>,
}

impl MemoryStore {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            users,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ActionRecord>> {
        // A poisoned lock only means a test panicked mid-write; the Vec is still usable.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryStore {
    async fn list_action_records(&self) -> Result<Vec<ActionRecord>> {
        Ok(self.lock().clone())
    }

    async fn create_action_record(&self, new: NewActionRecord) -> Result<ActionRecord> {
        let record = ActionRecord::from_new(Uuid::new_v4().to_string(), new);
        self.lock().push(record.clone());
        Ok(record)
    }

    async fn update_action_record(&self, id: &str, patch: &ActionPatch) -> Result<()> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CapaError::NotFound(id.to_string()))?;
        record.apply(patch);
        Ok(())
    }

    async fn delete_action_record(&self, id: &str) -> Result<()> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(CapaError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.clone())
    }
}
