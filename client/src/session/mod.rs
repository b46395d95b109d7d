//! Row editing session.
//!
//! A [`Session`] owns one result set from the draft service and the editing
//! state of each of its rows. Only one row can be edited at a time; that is
//! enforced structurally by keeping the open row index on the session rather
//! than an `editing` flag per row.
//!
//! ```text
//!            open_editor(i)                       request_rewrite(i, ..)
//!  closed ───────────────────▶ open ◀──────────┐  update_field(i, ..)
//!    ▲                          │   └──────────┘
//!    │  cancel_editor(i)        │
//!    │  send_email(i) == 200    │
//!    └──────────────────────────┘
//! ```
//!
//! Opening another row implicitly closes the current one. Loading a new
//! result set discards every row state, unsent edits included.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::email::normalize_email;
use crate::error::{SessionError, SessionResult};
use crate::models::{DraftItem, EmailDraft, EmailField, LeadDraft};
use crate::service::{EmailService, SpreadsheetUpload};

/// Key of the result array in the draft service response.
const RESPONSE_KEY: &str = "Response";

/// Per-row editing state, created the first time a row is touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowState {
    /// Rewrite instruction typed by the user.
    pub pending_instruction: String,
    /// Latest successful rewrite, kept across cancels.
    pub rewritten_draft: Option<EmailDraft>,
    /// Working copy shown in the editor, seeded lazily.
    pub final_edit: Option<EmailDraft>,
}

/// Result of loading a draft service response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// `rows` leads are now displayed; `skipped` entries were not objects.
    Loaded { rows: usize, skipped: usize },
    /// The response had no usable `Response` array. The session is empty.
    NoResults,
}

/// Editing state for one result set.
#[derive(Debug, Clone, Default)]
pub struct Session {
    rows: Vec<LeadDraft>,
    states: BTreeMap<usize, RowState>,
    open_row: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Result set
    // =========================================================================

    /// Replace the result set with a draft service response.
    ///
    /// All row state is discarded. A response without a `Response` array is
    /// not an error: the session becomes empty and [`LoadOutcome::NoResults`]
    /// is returned so the caller can warn.
    pub fn load_results(&mut self, response: &Value) -> LoadOutcome {
        self.rows.clear();
        self.states.clear();
        self.open_row = None;

        let Some(items) = response.get(RESPONSE_KEY).and_then(Value::as_array) else {
            log::warn!("Draft response has no '{}' array", RESPONSE_KEY);
            return LoadOutcome::NoResults;
        };

        let mut skipped = 0;
        for (i, item) in items.iter().enumerate() {
            match serde_json::from_value::<DraftItem>(item.clone()) {
                Ok(item) => self.rows.push(LeadDraft {
                    lead: item.lead_data,
                    draft: normalize_email(&item.drafted_email),
                }),
                Err(e) => {
                    log::warn!("Skipping draft entry {}: {}", i, e);
                    skipped += 1;
                }
            }
        }

        LoadOutcome::Loaded {
            rows: self.rows.len(),
            skipped,
        }
    }

    /// Upload a spreadsheet and load the drafts it produced.
    ///
    /// On failure the current result set is left untouched.
    pub async fn process_file<S: EmailService>(
        &mut self,
        service: &S,
        upload: &SpreadsheetUpload,
    ) -> SessionResult<LoadOutcome> {
        let response = service.draft(upload).await?;
        Ok(self.load_results(&response))
    }

    pub fn rows(&self) -> &[LeadDraft] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> SessionResult<&LeadDraft> {
        self.rows.get(index).ok_or(SessionError::RowOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    // =========================================================================
    // Row state
    // =========================================================================

    /// Index of the row whose editor is open, if any.
    pub fn open_row(&self) -> Option<usize> {
        self.open_row
    }

    pub fn is_editing(&self, index: usize) -> bool {
        self.open_row == Some(index)
    }

    /// State of a row, `None` until the row is first touched.
    pub fn row_state(&self, index: usize) -> Option<&RowState> {
        self.states.get(&index)
    }

    /// Latest rewrite if there is one, else the original draft.
    pub fn current_draft(&self, index: usize) -> SessionResult<&EmailDraft> {
        let row = self.row(index)?;
        Ok(self
            .states
            .get(&index)
            .and_then(|s| s.rewritten_draft.as_ref())
            .unwrap_or(&row.draft))
    }

    /// Open a row's editor, closing any other.
    pub fn open_editor(&mut self, index: usize) -> SessionResult<()> {
        self.row(index)?;
        self.open_row = Some(index);
        self.state_mut(index);
        Ok(())
    }

    /// Close a row's editor and drop its instruction and working copy.
    ///
    /// The last rewrite survives. Cancelling a closed row is a no-op apart
    /// from clearing those two fields.
    pub fn cancel_editor(&mut self, index: usize) -> SessionResult<()> {
        self.row(index)?;
        if self.open_row == Some(index) {
            self.open_row = None;
        }
        if let Some(state) = self.states.get_mut(&index) {
            state.pending_instruction.clear();
            state.final_edit = None;
        }
        Ok(())
    }

    /// Working copy for the open editor, seeded from [`Session::current_draft`]
    /// the first time it is asked for.
    pub fn editable_copy(&mut self, index: usize) -> SessionResult<&EmailDraft> {
        self.require_open(index)?;
        self.seed_final_edit(index)?;
        Ok(&*self.state_mut(index).final_edit.get_or_insert_with(EmailDraft::default))
    }

    /// Store the rewrite instruction without sending it.
    pub fn set_instruction(&mut self, index: usize, instruction: &str) -> SessionResult<()> {
        self.require_open(index)?;
        self.state_mut(index).pending_instruction = instruction.to_string();
        Ok(())
    }

    /// Overwrite one field of the working copy. No validation.
    pub fn update_field(
        &mut self,
        index: usize,
        field: EmailField,
        value: impl Into<String>,
    ) -> SessionResult<()> {
        self.require_open(index)?;
        self.seed_final_edit(index)?;
        if let Some(copy) = self.state_mut(index).final_edit.as_mut() {
            copy.set(field, value);
        }
        Ok(())
    }

    // =========================================================================
    // Collaborator calls
    // =========================================================================

    /// Ask the refactor service to rewrite the row's current draft.
    ///
    /// The editor stays open. On success the rewrite becomes the current
    /// draft and the working copy is re-seeded from it, so manual edits made
    /// before the rewrite are replaced. On failure nothing but the pending
    /// instruction changes.
    pub async fn request_rewrite<S: EmailService>(
        &mut self,
        service: &S,
        index: usize,
        instruction: &str,
    ) -> SessionResult<&EmailDraft> {
        self.set_instruction(index, instruction)?;
        let original = self.current_draft(index)?.clone();

        let rewritten = service.refactor(&original, instruction).await?;

        let state = self.state_mut(index);
        state.final_edit = Some(rewritten.clone());
        Ok(&*state.rewritten_draft.insert(rewritten))
    }

    /// Send the row's working copy.
    ///
    /// On 200 the editor closes and the working copy is kept, so reopening
    /// shows what was sent. On failure the editor stays open.
    pub async fn send_email<S: EmailService>(
        &mut self,
        service: &S,
        index: usize,
    ) -> SessionResult<Value> {
        let email = self.editable_copy(index)?.clone();

        let receipt = service.send(&email).await?;

        if self.open_row == Some(index) {
            self.open_row = None;
        }
        Ok(receipt)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn state_mut(&mut self, index: usize) -> &mut RowState {
        self.states.entry(index).or_default()
    }

    fn require_open(&self, index: usize) -> SessionResult<()> {
        self.row(index)?;
        if self.open_row != Some(index) {
            return Err(SessionError::EditorClosed(index));
        }
        Ok(())
    }

    fn seed_final_edit(&mut self, index: usize) -> SessionResult<()> {
        if self.states.get(&index).is_some_and(|s| s.final_edit.is_some()) {
            return Ok(());
        }
        let seed = self.current_draft(index)?.clone();
        self.state_mut(index).final_edit = Some(seed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted collaborator: pops one canned result per call and records requests.
    #[derive(Default)]
    struct FakeService {
        refactors: Mutex<Vec<Result<EmailDraft, ServiceError>>>,
        sends: Mutex<Vec<Result<Value, ServiceError>>>,
        drafts: Mutex<Vec<Result<Value, ServiceError>>>,
        refactor_calls: Mutex<Vec<(EmailDraft, String)>>,
        send_calls: Mutex<Vec<EmailDraft>>,
    }

    impl FakeService {
        fn with_refactor(self, result: Result<EmailDraft, ServiceError>) -> Self {
            self.refactors.lock().unwrap().push(result);
            self
        }

        fn with_send(self, result: Result<Value, ServiceError>) -> Self {
            self.sends.lock().unwrap().push(result);
            self
        }

        fn with_draft(self, result: Result<Value, ServiceError>) -> Self {
            self.drafts.lock().unwrap().push(result);
            self
        }
    }

    impl EmailService for FakeService {
        async fn draft(&self, _upload: &SpreadsheetUpload) -> Result<Value, ServiceError> {
            self.drafts.lock().unwrap().remove(0)
        }

        async fn refactor(&self, original: &EmailDraft, instruction: &str) -> Result<EmailDraft, ServiceError> {
            self.refactor_calls
                .lock()
                .unwrap()
                .push((original.clone(), instruction.to_string()));
            self.refactors.lock().unwrap().remove(0)
        }

        async fn send(&self, email: &EmailDraft) -> Result<Value, ServiceError> {
            self.send_calls.lock().unwrap().push(email.clone());
            self.sends.lock().unwrap().remove(0)
        }
    }

    fn two_leads() -> Value {
        json!({
            "Response": [
                {
                    "lead_data": {
                        "first_name": "Ada", "last_name": "Lovelace",
                        "company_name": "Analytical Engines", "job_title": "CTO",
                        "industry": "Computing", "lead_type": "Warm",
                        "notes_event": "Met at RustConf"
                    },
                    "drafted_email": {"To": "ada@engines.io", "subject": "Hello Ada", "body": "Long body"}
                },
                {
                    "lead_data": {"first_name": "Grace", "last_name": "Hopper", "company_name": "Navy"},
                    "drafted_email": "Subject: Compilers\nHi Grace"
                }
            ]
        })
    }

    fn loaded() -> Session {
        let mut session = Session::new();
        session.load_results(&two_leads());
        session
    }

    fn status_error(status: u16) -> ServiceError {
        ServiceError::Status { status, body: "nope".into() }
    }

    #[test]
    fn test_load_normalizes_both_encodings() {
        let session = loaded();
        assert_eq!(session.len(), 2);
        assert_eq!(session.rows()[0].draft, EmailDraft::new("ada@engines.io", "Hello Ada", "Long body"));
        assert_eq!(session.rows()[1].draft, EmailDraft::new("", "Compilers", "Hi Grace"));
        assert_eq!(session.rows()[1].lead.full_name(), "Grace Hopper");
    }

    #[test]
    fn test_load_without_response_key_is_empty() {
        let mut session = loaded();
        session.open_editor(0).unwrap();

        let outcome = session.load_results(&json!({"detail": "no leads"}));

        assert_eq!(outcome, LoadOutcome::NoResults);
        assert!(session.is_empty());
        assert_eq!(session.open_row(), None);
    }

    #[test]
    fn test_load_skips_non_object_entries() {
        let mut session = Session::new();
        let outcome = session.load_results(&json!({
            "Response": [
                "garbage",
                {"lead_data": {"first_name": "Ada"}, "drafted_email": "Subject: Hi\nThere"}
            ]
        }));
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 1, skipped: 1 });
    }

    #[test]
    fn test_reload_discards_row_state() {
        let mut session = loaded();
        session.open_editor(1).unwrap();
        session.update_field(1, EmailField::Body, "edited").unwrap();

        session.load_results(&two_leads());

        assert_eq!(session.open_row(), None);
        assert!(session.row_state(1).is_none());
    }

    #[test]
    fn test_row_state_is_created_lazily() {
        let mut session = loaded();
        assert!(session.row_state(0).is_none());
        session.open_editor(0).unwrap();
        assert!(session.row_state(0).is_some());
        assert!(session.row_state(1).is_none());
    }

    #[test]
    fn test_at_most_one_row_editing() {
        let mut session = loaded();
        for index in [0, 1, 1, 0, 1] {
            session.open_editor(index).unwrap();
            let editing: Vec<usize> = (0..session.len()).filter(|&i| session.is_editing(i)).collect();
            assert_eq!(editing, vec![index]);
        }
    }

    #[test]
    fn test_open_invalid_row() {
        let mut session = loaded();
        let err = session.open_editor(7).unwrap_err();
        assert!(matches!(err, SessionError::RowOutOfRange { index: 7, len: 2 }));
        assert_eq!(session.open_row(), None);
    }

    #[test]
    fn test_cancel_clears_instruction_and_copy_but_keeps_rewrite() {
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.set_instruction(0, "make it formal").unwrap();
        session.update_field(0, EmailField::Subject, "Changed").unwrap();
        session.state_mut(0).rewritten_draft = Some(EmailDraft::new("ada@engines.io", "Rewritten", "Short"));

        session.cancel_editor(0).unwrap();

        let state = session.row_state(0).unwrap();
        assert!(!session.is_editing(0));
        assert_eq!(state.pending_instruction, "");
        assert_eq!(state.final_edit, None);
        assert_eq!(state.rewritten_draft.as_ref().unwrap().subject, "Rewritten");
    }

    #[test]
    fn test_cancel_closed_row_is_harmless() {
        let mut session = loaded();
        session.open_editor(1).unwrap();

        session.cancel_editor(0).unwrap();

        assert!(!session.is_editing(0));
        assert!(session.is_editing(1));
    }

    #[test]
    fn test_cancel_row_closed_by_another_open() {
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.set_instruction(0, "more formal").unwrap();
        session.update_field(0, EmailField::Subject, "Edited").unwrap();

        // Opening row 2 closes row 1 but leaves its state behind
        session.open_editor(1).unwrap();
        assert_eq!(session.row_state(0).unwrap().pending_instruction, "more formal");

        session.cancel_editor(0).unwrap();

        let state = session.row_state(0).unwrap();
        assert_eq!(state.pending_instruction, "");
        assert_eq!(state.final_edit, None);
        assert!(session.is_editing(1));
        assert_eq!(session.open_row(), Some(1));
    }

    #[test]
    fn test_reopen_after_cancel_reseeds_from_rewrite() {
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.update_field(0, EmailField::Body, "draft edits").unwrap();
        session.state_mut(0).rewritten_draft = Some(EmailDraft::new("ada@engines.io", "R", "Rewritten body"));
        session.cancel_editor(0).unwrap();

        session.open_editor(0).unwrap();

        assert_eq!(session.editable_copy(0).unwrap().body, "Rewritten body");
    }

    #[test]
    fn test_edits_require_open_editor() {
        let mut session = loaded();
        let err = session.update_field(0, EmailField::Body, "x").unwrap_err();
        assert!(matches!(err, SessionError::EditorClosed(0)));
        assert!(session.editable_copy(1).is_err());
    }

    #[test]
    fn test_update_field_accepts_empty_and_malformed() {
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.update_field(0, EmailField::To, "not-an-address").unwrap();
        session.update_field(0, EmailField::Subject, "").unwrap();

        let copy = session.editable_copy(0).unwrap();
        assert_eq!(copy.to, "not-an-address");
        assert_eq!(copy.subject, "");
        assert_eq!(copy.body, "Long body");
    }

    #[tokio::test]
    async fn test_rewrite_chains_from_previous_rewrite() {
        let first = EmailDraft::new("ada@engines.io", "Hi", "Shorter");
        let second = EmailDraft::new("ada@engines.io", "Hi", "Shortest");
        let service = FakeService::default()
            .with_refactor(Ok(first.clone()))
            .with_refactor(Ok(second.clone()));
        let mut session = loaded();
        session.open_editor(0).unwrap();

        session.request_rewrite(&service, 0, "shorter").await.unwrap();
        session.request_rewrite(&service, 0, "even shorter").await.unwrap();

        let calls = service.refactor_calls.lock().unwrap();
        assert_eq!(calls[0].0, session.rows()[0].draft);
        assert_eq!(calls[1], (first, "even shorter".to_string()));
        assert_eq!(session.current_draft(0).unwrap(), &second);
        assert!(session.is_editing(0));
    }

    #[tokio::test]
    async fn test_rewrite_reseeds_working_copy() {
        let rewritten = EmailDraft::new("ada@engines.io", "New", "Rewritten");
        let service = FakeService::default().with_refactor(Ok(rewritten.clone()));
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.update_field(0, EmailField::Body, "manual").unwrap();

        session.request_rewrite(&service, 0, "rewrite").await.unwrap();

        assert_eq!(session.editable_copy(0).unwrap(), &rewritten);
    }

    #[tokio::test]
    async fn test_failed_rewrite_leaves_state() {
        let service = FakeService::default().with_refactor(Err(status_error(500)));
        let mut session = loaded();
        session.open_editor(0).unwrap();
        session.update_field(0, EmailField::Body, "manual").unwrap();

        let err = session.request_rewrite(&service, 0, "shorter").await.unwrap_err();

        assert!(matches!(err, SessionError::Service(ServiceError::Status { status: 500, .. })));
        let state = session.row_state(0).unwrap();
        assert_eq!(state.rewritten_draft, None);
        assert_eq!(state.final_edit.as_ref().unwrap().body, "manual");
        assert!(session.is_editing(0));
    }

    #[tokio::test]
    async fn test_rewrite_requires_open_editor() {
        let service = FakeService::default();
        let mut session = loaded();

        let err = session.request_rewrite(&service, 1, "shorter").await.unwrap_err();

        assert!(matches!(err, SessionError::EditorClosed(1)));
        assert!(service.refactor_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_keeps_editor_open() {
        let service = FakeService::default().with_send(Err(status_error(503)));
        let mut session = loaded();
        session.open_editor(1).unwrap();

        assert!(session.send_email(&service, 1).await.is_err());
        assert!(session.is_editing(1));
    }

    #[tokio::test]
    async fn test_successful_send_closes_and_keeps_copy() {
        let service = FakeService::default().with_send(Ok(json!({"status": "sent"})));
        let mut session = loaded();
        session.open_editor(1).unwrap();
        session.update_field(1, EmailField::To, "grace@navy.mil").unwrap();

        session.send_email(&service, 1).await.unwrap();

        assert!(!session.is_editing(1));
        let calls = service.send_calls.lock().unwrap();
        let sent = &calls[0];
        assert_eq!(sent, &EmailDraft::new("grace@navy.mil", "Compilers", "Hi Grace"));
        assert_eq!(session.row_state(1).unwrap().final_edit.as_ref(), Some(sent));
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_results() {
        let service = FakeService::default().with_draft(Err(status_error(400)));
        let mut session = loaded();
        session.open_editor(0).unwrap();

        let upload = SpreadsheetUpload::new("leads.xlsx", vec![1, 2, 3]);
        assert!(session.process_file(&service, &upload).await.is_err());

        assert_eq!(session.len(), 2);
        assert!(session.is_editing(0));
    }

    #[tokio::test]
    async fn test_end_to_end_row_workflow() {
        let service = FakeService::default()
            .with_draft(Ok(two_leads()))
            .with_refactor(Ok(EmailDraft::new("ada@engines.io", "Hello Ada", "Short body")))
            .with_send(Ok(json!({"status": "sent"})));
        let mut session = Session::new();

        let upload = SpreadsheetUpload::new("leads.xlsx", b"PK".to_vec());
        let outcome = session.process_file(&service, &upload).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 2, skipped: 0 });

        session.open_editor(0).unwrap();
        session.request_rewrite(&service, 0, "make it shorter").await.unwrap();
        session.update_field(0, EmailField::Body, "Shorter text").unwrap();
        session.send_email(&service, 0).await.unwrap();

        assert!(!session.is_editing(0));
        assert!(!session.is_editing(1));
        assert!(session.row_state(1).is_none());
        assert_eq!(service.send_calls.lock().unwrap()[0].body, "Shorter text");
    }
}
