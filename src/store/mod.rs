//! Persistence boundary for action records and the user directory.
//!
//! The lifecycle manager only talks to [`RecordStore`]; it never sees files.

mod json;
#[cfg(test)]
mod memory;

pub use json::JsonStore;
#[cfg(test)]
pub use memory::MemoryStore;

use crate::action::{ActionPatch, ActionRecord, NewActionRecord, User};
use crate::error::Result;

/// CRUD over action records plus a read-only user directory.
///
/// Implementations assign `id` on create and return
/// [`CapaError::NotFound`](crate::error::CapaError::NotFound) when an
/// update or delete names an unknown id.
pub trait RecordStore {
    /// Records in creation order.
    async fn list_action_records(&self) -> Result<Vec<ActionRecord>>;

    async fn create_action_record(&self, new: NewActionRecord) -> Result<ActionRecord>;

    async fn update_action_record(&self, id: &str, patch: &ActionPatch) -> Result<()>;

    async fn delete_action_record(&self, id: &str) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<User>>;
}
