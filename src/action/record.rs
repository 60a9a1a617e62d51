use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CapaError;

/// Whether an action fixes an existing nonconformity or prevents a potential one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Corrective,
    Preventive,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Corrective => write!(f, "Corrective"),
            ActionType::Preventive => write!(f, "Preventive"),
        }
    }
}

impl FromStr for ActionType {
    type Err = CapaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "corrective" => Ok(ActionType::Corrective),
            "preventive" => Ok(ActionType::Preventive),
            other => Err(CapaError::Validation(format!(
                "unknown action type '{other}': must be corrective or preventive"
            ))),
        }
    }
}

/// Lifecycle status of an action record.
///
/// ```text
/// Open ──► InProgress ──► Closed
///   │  ◄──     │
///   ├──────────┼────────► Cancelled
///   └──────────┴────────► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Open,
    InProgress,
    Closed,
    Cancelled,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 4] = [
        ActionStatus::Open,
        ActionStatus::InProgress,
        ActionStatus::Closed,
        ActionStatus::Cancelled,
    ];

    /// Closed and Cancelled have no outgoing edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Closed | ActionStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        match (self, next) {
            (Open, InProgress | Closed | Cancelled) => true,
            (InProgress, Open | Closed | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Open => write!(f, "Open"),
            ActionStatus::InProgress => write!(f, "In Progress"),
            ActionStatus::Closed => write!(f, "Closed"),
            ActionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for ActionStatus {
    type Err = CapaError;

    /// Accepts the display label as well as `in-progress` / `in_progress`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        match normalized.as_str() {
            "open" => Ok(ActionStatus::Open),
            "inprogress" => Ok(ActionStatus::InProgress),
            "closed" => Ok(ActionStatus::Closed),
            "cancelled" | "canceled" => Ok(ActionStatus::Cancelled),
            _ => Err(CapaError::Validation(format!(
                "unknown status '{s}': must be open, in-progress, closed or cancelled"
            ))),
        }
    }
}

/// A user from the read-only directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A tracked corrective or preventive action.
///
/// `close_date` and `verification_notes` are `Some` exactly when
/// `status == Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: String,
    pub folio: String,
    pub source: String,
    pub description: String,
    pub plan: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub commitment_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    pub responsible_user_id: String,
    pub creation_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_notes: Option<String>,
}

impl ActionRecord {
    /// Materializes a stored record from its creation fields and a store-assigned id.
    pub fn from_new(id: String, new: NewActionRecord) -> Self {
        Self {
            id,
            folio: new.folio,
            source: new.source,
            description: new.description,
            plan: new.plan,
            action_type: new.action_type,
            status: new.status,
            commitment_date: new.commitment_date,
            close_date: None,
            responsible_user_id: new.responsible_user_id,
            creation_date: new.creation_date,
            verification_notes: None,
        }
    }

    /// Past its commitment date and still actionable.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.commitment_date < today
    }

    /// Applies a patch in place. Identity fields are never touched.
    pub fn apply(&mut self, patch: &ActionPatch) {
        let content = &patch.content;
        if let Some(source) = &content.source {
            self.source = source.clone();
        }
        if let Some(description) = &content.description {
            self.description = description.clone();
        }
        if let Some(plan) = &content.plan {
            self.plan = plan.clone();
        }
        if let Some(action_type) = content.action_type {
            self.action_type = action_type;
        }
        if let Some(date) = content.commitment_date {
            self.commitment_date = date;
        }
        if let Some(user) = &content.responsible_user_id {
            self.responsible_user_id = user.clone();
        }
        if let Some(change) = &patch.status {
            self.status = change.status;
            self.close_date = change.close_date;
            self.verification_notes = change.verification_notes.clone();
        }
    }
}

/// User-supplied fields for a new action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub source: String,
    pub description: String,
    pub plan: String,
    pub action_type: ActionType,
    pub commitment_date: NaiveDate,
    pub responsible_user_id: String,
}

/// Everything the store needs to persist a new record, minus the id it assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActionRecord {
    pub folio: String,
    pub source: String,
    pub description: String,
    pub plan: String,
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub commitment_date: NaiveDate,
    pub responsible_user_id: String,
    pub creation_date: NaiveDate,
}

/// Edit of the mutable content fields; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentUpdate {
    pub source: Option<String>,
    pub description: Option<String>,
    pub plan: Option<String>,
    pub action_type: Option<ActionType>,
    pub commitment_date: Option<NaiveDate>,
    pub responsible_user_id: Option<String>,
}

impl ContentUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ContentUpdate::default()
    }
}

/// The three status-bound fields, always written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ActionStatus,
    pub close_date: Option<NaiveDate>,
    pub verification_notes: Option<String>,
}

/// Partial update handed to the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPatch {
    pub content: ContentUpdate,
    pub status: Option<StatusChange>,
}
