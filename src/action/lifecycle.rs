use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::record::{
    ActionPatch, ActionRecord, ActionStatus, ContentUpdate, NewAction, NewActionRecord,
    StatusChange, User,
};
use crate::error::{CapaError, Result};
use crate::store::RecordStore;

pub const DEFAULT_FOLIO_PREFIX: &str = "CAPA";

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Validates creation, edits and status transitions of action records before
/// forwarding them to a [`RecordStore`]. Holds no record state of its own.
///
/// Authorization is the caller's job.
pub struct LifecycleManager<S> {
    store: S,
    folio_prefix: String,
    clock: fn() -> NaiveDate,
    // Held from reading existing folios until the new record is stored.
    create_lock: Mutex<()>,
}

impl<S: RecordStore> LifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            folio_prefix: DEFAULT_FOLIO_PREFIX.to_string(),
            clock: local_today,
            create_lock: Mutex::new(()),
        }
    }

    pub fn with_folio_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.folio_prefix = prefix.into();
        self
    }

    /// Replace the source of "today" (creation and close dates).
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Creates an Open record with a fresh folio and today's creation date.
    pub async fn create(&self, fields: NewAction) -> Result<ActionRecord> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("source", &fields.source),
            ("description", &fields.description),
            ("plan", &fields.plan),
            ("responsible_user_id", &fields.responsible_user_id),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(CapaError::Validation(format!(
                "required fields missing or empty: {}",
                missing.join(", ")
            )));
        }

        let users = self.store.list_users().await?;
        ensure_user_exists(&users, &fields.responsible_user_id)?;

        let _guard = self.create_lock.lock().await;
        let existing = self.store.list_action_records().await?;
        let folio = next_folio(&self.folio_prefix, &existing)?;

        let new = NewActionRecord {
            folio,
            source: fields.source.trim().to_string(),
            description: fields.description.trim().to_string(),
            plan: fields.plan.trim().to_string(),
            action_type: fields.action_type,
            status: ActionStatus::Open,
            commitment_date: fields.commitment_date,
            responsible_user_id: fields.responsible_user_id.trim().to_string(),
            creation_date: self.today(),
        };
        let record = self.store.create_action_record(new).await?;
        info!(id = %record.id, folio = %record.folio, "action created");
        Ok(record)
    }

    /// Edits content fields. Status, folio and creation date are untouched.
    pub async fn update_content(&self, id: &str, update: ContentUpdate) -> Result<ActionRecord> {
        let mut record = self.find(id).await?;
        let id = record.id.clone();

        for (name, value) in [
            ("source", &update.source),
            ("description", &update.description),
            ("plan", &update.plan),
            ("responsible_user_id", &update.responsible_user_id),
        ] {
            if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CapaError::Validation(format!("{name} must not be empty")));
            }
        }
        if let Some(user_id) = &update.responsible_user_id {
            let users = self.store.list_users().await?;
            ensure_user_exists(&users, user_id)?;
        }

        let update = ContentUpdate {
            source: update.source.map(|s| s.trim().to_string()),
            description: update.description.map(|s| s.trim().to_string()),
            plan: update.plan.map(|s| s.trim().to_string()),
            responsible_user_id: update.responsible_user_id.map(|s| s.trim().to_string()),
            ..update
        };
        if update.is_empty() {
            debug!(%id, "empty content update, nothing to do");
            return Ok(record);
        }

        let patch = ActionPatch {
            content: update,
            status: None,
        };
        self.store.update_action_record(&id, &patch).await?;
        record.apply(&patch);
        info!(%id, folio = %record.folio, "action content updated");
        Ok(record)
    }

    /// Moves a record along a lifecycle edge.
    ///
    /// Closing requires non-blank `verification_notes` and stamps today's
    /// close date; every other target clears both fields.
    pub async fn transition_status(
        &self,
        id: &str,
        new_status: ActionStatus,
        verification_notes: Option<&str>,
    ) -> Result<ActionRecord> {
        let mut record = self.find(id).await?;
        let id = record.id.clone();
        let from = record.status;

        if !from.can_transition_to(new_status) {
            return Err(CapaError::Validation(format!(
                "cannot move action {} from {from} to {new_status}",
                record.folio
            )));
        }
        if from == ActionStatus::Open && record.plan.trim().is_empty() {
            return Err(CapaError::Validation(format!(
                "action {} needs a plan before leaving {from}",
                record.folio
            )));
        }

        let change = if new_status == ActionStatus::Closed {
            let notes = verification_notes
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    CapaError::Validation(
                        "verification notes are required to close an action".into(),
                    )
                })?;
            StatusChange {
                status: new_status,
                close_date: Some(self.today()),
                verification_notes: Some(notes.to_string()),
            }
        } else {
            if verification_notes.is_some() {
                debug!(%id, %new_status, "verification notes ignored for non-closing transition");
            }
            StatusChange {
                status: new_status,
                close_date: None,
                verification_notes: None,
            }
        };

        let patch = ActionPatch {
            content: ContentUpdate::default(),
            status: Some(change),
        };
        self.store.update_action_record(&id, &patch).await?;
        record.apply(&patch);
        info!(%id, folio = %record.folio, %from, to = %new_status, "action status changed");
        Ok(record)
    }

    /// Irrecoverably removes a record.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let record = self.find(id).await?;
        self.store.delete_action_record(&record.id).await?;
        info!(id = %record.id, folio = %record.folio, "action deleted");
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<ActionRecord>> {
        self.store.list_action_records().await
    }

    /// Looks a record up by id, or by folio as typed by a person.
    pub async fn find(&self, id: &str) -> Result<ActionRecord> {
        self.store
            .list_action_records()
            .await?
            .into_iter()
            .find(|r| r.id == id || r.folio == id)
            .ok_or_else(|| CapaError::NotFound(id.to_string()))
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }
}

fn ensure_user_exists(users: &[User], user_id: &str) -> Result<()> {
    let user_id = user_id.trim();
    if users.iter().any(|u| u.id == user_id) {
        Ok(())
    } else {
        Err(CapaError::Validation(format!(
            "responsible user '{user_id}' does not exist"
        )))
    }
}

/// `{prefix}-{n:04}` with `n` one past the highest sequence already issued
/// under `prefix`. Folios with other prefixes or unparseable suffixes are ignored.
fn next_folio(prefix: &str, existing: &[ActionRecord]) -> Result<String> {
    let highest = existing
        .iter()
        .filter_map(|r| r.folio.strip_prefix(prefix)?.strip_prefix('-'))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let next = highest.checked_add(1).ok_or_else(|| {
        CapaError::Validation(format!("folio sequence for prefix '{prefix}' is exhausted"))
    })?;
    Ok(format!("{prefix}-{next:04}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::store::{JsonStore, MemoryStore};
    use tempfile::TempDir;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn manager() -> LifecycleManager<MemoryStore> {
        let users = vec![
            User {
                id: "U1".into(),
                name: "Ana Ruiz".into(),
                email: None,
            },
            User {
                id: "U2".into(),
                name: "Luis Vega".into(),
                email: None,
            },
        ];
        LifecycleManager::new(MemoryStore::with_users(users)).with_clock(fixed_today)
    }

    fn guard_action() -> NewAction {
        NewAction {
            source: "Internal Audit".into(),
            description: "Missing guard on press".into(),
            plan: "Install guard".into(),
            action_type: ActionType::Corrective,
            commitment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            responsible_user_id: "U1".into(),
        }
    }

    fn assert_close_invariant(r: &ActionRecord) {
        let closed = r.status == ActionStatus::Closed;
        assert_eq!(closed, r.close_date.is_some(), "close_date for {:?}", r.status);
        assert_eq!(
            closed,
            r.verification_notes.is_some(),
            "verification_notes for {:?}",
            r.status
        );
    }

    #[tokio::test]
    async fn create_opens_record_with_folio() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        assert_eq!(rec.status, ActionStatus::Open);
        assert_eq!(rec.folio, "CAPA-0001");
        assert_eq!(rec.creation_date, fixed_today());
        assert_eq!(rec.close_date, None);
        assert_eq!(rec.verification_notes, None);
        assert!(!rec.id.is_empty());
    }

    #[tokio::test]
    async fn folios_are_unique_and_sequential() {
        let mgr = manager();
        let a = mgr.create(guard_action()).await.unwrap();
        let b = mgr.create(guard_action()).await.unwrap();
        let c = mgr.create(guard_action()).await.unwrap();
        assert_eq!(
            [a.folio.as_str(), b.folio.as_str(), c.folio.as_str()],
            ["CAPA-0001", "CAPA-0002", "CAPA-0003"]
        );
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn folio_follows_highest_live_sequence() {
        let mgr = manager();
        let _a = mgr.create(guard_action()).await.unwrap();
        let b = mgr.create(guard_action()).await.unwrap();
        mgr.delete(&b.id).await.unwrap();
        let c = mgr.create(guard_action()).await.unwrap();
        assert_eq!(c.folio, "CAPA-0002");

        let _d = mgr.create(guard_action()).await.unwrap();
        let first = mgr.find("CAPA-0001").await.unwrap();
        mgr.delete(&first.id).await.unwrap();
        let e = mgr.create(guard_action()).await.unwrap();
        assert_eq!(e.folio, "CAPA-0004");
    }

    #[tokio::test]
    async fn custom_folio_prefix() {
        let mgr = manager().with_folio_prefix("AC");
        let rec = mgr.create(guard_action()).await.unwrap();
        assert_eq!(rec.folio, "AC-0001");
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let mgr = manager();
        let mut fields = guard_action();
        fields.source = "   ".into();
        fields.plan = String::new();
        let err = mgr.create(fields).await.unwrap_err();
        match err {
            CapaError::Validation(msg) => {
                assert!(msg.contains("source"));
                assert!(msg.contains("plan"));
                assert!(!msg.contains("description"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(mgr.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_user() {
        let mgr = manager();
        let mut fields = guard_action();
        fields.responsible_user_id = "U9".into();
        let err = mgr.create(fields).await.unwrap_err();
        assert!(matches!(err, CapaError::Validation(_)));
        assert!(mgr.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_content_preserves_identity_and_status() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let rec = mgr
            .transition_status(&rec.id, ActionStatus::InProgress, None)
            .await
            .unwrap();

        let updated = mgr
            .update_content(
                &rec.id,
                ContentUpdate {
                    description: Some("Guard missing on press #4".into()),
                    responsible_user_id: Some("U2".into()),
                    commitment_date: NaiveDate::from_ymd_opt(2024, 7, 1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, rec.id);
        assert_eq!(updated.folio, rec.folio);
        assert_eq!(updated.creation_date, rec.creation_date);
        assert_eq!(updated.status, ActionStatus::InProgress);
        assert_eq!(updated.description, "Guard missing on press #4");
        assert_eq!(updated.responsible_user_id, "U2");

        let stored = mgr.find(&rec.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_content_unknown_id_is_not_found() {
        let mgr = manager();
        let err = mgr
            .update_content("missing", ContentUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapaError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_content_rejects_blank_and_unknown_user() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();

        let err = mgr
            .update_content(
                &rec.id,
                ContentUpdate {
                    plan: Some(" ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CapaError::Validation(_)));

        let err = mgr
            .update_content(
                &rec.id,
                ContentUpdate {
                    source: Some("Supplier audit".into()),
                    responsible_user_id: Some("ghost".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CapaError::Validation(_)));

        assert_eq!(mgr.find(&rec.id).await.unwrap(), rec);
    }

    #[tokio::test]
    async fn close_in_progress_record_with_notes() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        mgr.transition_status(&rec.id, ActionStatus::InProgress, None)
            .await
            .unwrap();

        let closed = mgr
            .transition_status(
                &rec.id,
                ActionStatus::Closed,
                Some("Guard verified by safety officer"),
            )
            .await
            .unwrap();
        assert_eq!(closed.status, ActionStatus::Closed);
        assert_eq!(closed.close_date, Some(fixed_today()));
        assert_eq!(
            closed.verification_notes.as_deref(),
            Some("Guard verified by safety officer")
        );
        assert_eq!(mgr.find(&rec.id).await.unwrap(), closed);
    }

    #[tokio::test]
    async fn close_without_notes_fails_and_leaves_record_unchanged() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let rec = mgr
            .transition_status(&rec.id, ActionStatus::InProgress, None)
            .await
            .unwrap();

        for notes in [None, Some(""), Some("   ")] {
            let err = mgr
                .transition_status(&rec.id, ActionStatus::Closed, notes)
                .await
                .unwrap_err();
            assert!(matches!(err, CapaError::Validation(_)));
            assert_eq!(mgr.find(&rec.id).await.unwrap(), rec);
        }
    }

    #[tokio::test]
    async fn terminal_states_reject_every_transition() {
        let mgr = manager();
        let closed = mgr.create(guard_action()).await.unwrap();
        mgr.transition_status(&closed.id, ActionStatus::Closed, Some("ok"))
            .await
            .unwrap();
        let cancelled = mgr.create(guard_action()).await.unwrap();
        mgr.transition_status(&cancelled.id, ActionStatus::Cancelled, None)
            .await
            .unwrap();

        for id in [&closed.id, &cancelled.id] {
            let before = mgr.find(id).await.unwrap();
            for next in ActionStatus::ALL {
                let err = mgr
                    .transition_status(id, next, Some("reopen"))
                    .await
                    .unwrap_err();
                assert!(matches!(err, CapaError::Validation(_)));
            }
            assert_eq!(mgr.find(id).await.unwrap(), before);
        }
    }

    #[tokio::test]
    async fn close_invariant_holds_across_transitions() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let steps = [
            (ActionStatus::InProgress, None),
            (ActionStatus::Open, Some("ignored")),
            (ActionStatus::InProgress, None),
            (ActionStatus::Closed, Some("verified")),
        ];
        for (next, notes) in steps {
            let r = mgr.transition_status(&rec.id, next, notes).await.unwrap();
            assert_close_invariant(&r);
            assert_close_invariant(&mgr.find(&rec.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn notes_not_stored_on_non_closing_transition() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let r = mgr
            .transition_status(&rec.id, ActionStatus::Cancelled, Some("duplicate finding"))
            .await
            .unwrap();
        assert_eq!(r.verification_notes, None);
        assert_eq!(r.close_date, None);
    }

    #[tokio::test]
    async fn self_transition_is_rejected() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let err = mgr
            .transition_status(&rec.id, ActionStatus::Open, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CapaError::Validation(_)));
    }

    #[tokio::test]
    async fn operations_accept_folio_in_place_of_id() {
        let mgr = manager();
        let rec = mgr.create(guard_action()).await.unwrap();
        let moved = mgr
            .transition_status("CAPA-0001", ActionStatus::InProgress, None)
            .await
            .unwrap();
        assert_eq!(moved.id, rec.id);
        assert_eq!(mgr.find(&rec.id).await.unwrap().status, ActionStatus::InProgress);
        mgr.delete("CAPA-0001").await.unwrap();
        assert!(mgr.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transition_unknown_id_is_not_found() {
        let mgr = manager();
        let err = mgr
            .transition_status("missing", ActionStatus::Closed, Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapaError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_and_missing_is_not_found() {
        let mgr = manager();
        let a = mgr.create(guard_action()).await.unwrap();
        let b = mgr.create(guard_action()).await.unwrap();

        mgr.delete(&a.id).await.unwrap();
        let ids: Vec<_> = mgr.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id]);

        let err = mgr.delete(&a.id).await.unwrap_err();
        assert!(matches!(err, CapaError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_all_is_stable_in_creation_order() {
        let mgr = manager();
        for _ in 0..3 {
            mgr.create(guard_action()).await.unwrap();
        }
        let first = mgr.list_all().await.unwrap();
        let second = mgr.list_all().await.unwrap();
        assert_eq!(first, second);
        let folios: Vec<_> = first.iter().map(|r| r.folio.as_str()).collect();
        assert_eq!(folios, ["CAPA-0001", "CAPA-0002", "CAPA-0003"]);
    }

    #[test]
    fn next_folio_ignores_foreign_prefixes() {
        let mut rec = ActionRecord::from_new(
            "x".into(),
            NewActionRecord {
                folio: "OTHER-0042".into(),
                source: "s".into(),
                description: "d".into(),
                plan: "p".into(),
                action_type: ActionType::Preventive,
                status: ActionStatus::Open,
                commitment_date: fixed_today(),
                responsible_user_id: "U1".into(),
                creation_date: fixed_today(),
            },
        );
        assert_eq!(
            next_folio("CAPA", std::slice::from_ref(&rec)).unwrap(),
            "CAPA-0001"
        );
        rec.folio = "CAPA-0009".into();
        assert_eq!(next_folio("CAPA", &[rec]).unwrap(), "CAPA-0010");
    }

    #[tokio::test]
    async fn exhausted_folio_sequence_is_rejected() {
        let mgr = manager();
        mgr.store
            .create_action_record(NewActionRecord {
                folio: format!("CAPA-{}", u32::MAX),
                source: "Hand-edited".into(),
                description: "d".into(),
                plan: "p".into(),
                action_type: ActionType::Corrective,
                status: ActionStatus::Open,
                commitment_date: fixed_today(),
                responsible_user_id: "U1".into(),
                creation_date: fixed_today(),
            })
            .await
            .unwrap();

        let err = mgr.create(guard_action()).await.unwrap_err();
        assert!(matches!(err, CapaError::Validation(_)));
        assert_eq!(mgr.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_folios() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("users.json"),
            r#"[{"id":"U1","name":"Ana Ruiz"}]"#,
        )
        .unwrap();
        let mgr = LifecycleManager::new(JsonStore::open(tmp.path())).with_clock(fixed_today);

        let (a, b, c) = tokio::join!(
            mgr.create(guard_action()),
            mgr.create(guard_action()),
            mgr.create(guard_action())
        );
        let mut folios = vec![a.unwrap().folio, b.unwrap().folio, c.unwrap().folio];
        folios.sort();
        assert_eq!(folios, ["CAPA-0001", "CAPA-0002", "CAPA-0003"]);

        let mut stored: Vec<String> = mgr
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.folio)
            .collect();
        stored.sort();
        assert_eq!(stored, folios);
    }
}
