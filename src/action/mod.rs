mod lifecycle;
mod record;

pub use lifecycle::{DEFAULT_FOLIO_PREFIX, LifecycleManager};
pub use record::{
    ActionPatch, ActionRecord, ActionStatus, ActionType, ContentUpdate, NewAction,
    NewActionRecord, User,
};
#[cfg(test)]
pub use record::StatusChange;
