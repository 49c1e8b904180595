//! Durable session store and the save → verify → export gates.
//!
//! Thread-safe [`DesignStore`] shared across HTTP handlers. Sessions live in
//! an `RwLock`ed map; with a data directory configured, each session is
//! persisted as one JSON file. Save and verification creates are atomic:
//! the durable write happens first (temp file + rename), and only on success
//! is the in-memory state committed, so a failed write leaves the store in
//! its prior consistent state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::design::CanvasDesign;
use crate::element::{Element, ElementId};
use crate::error::{CoreError, CoreResult, ExportGate};
use crate::records::{SaveId, SaveRecord, VerificationRecord, VerificationSummary, VerificationToken};
use crate::schema::DesignDocument;
use crate::session::{PublishState, SessionStatus};

/// Maximum length of a save title, in characters.
pub const MAX_TITLE_LEN: usize = 120;

/// Maximum length of a verification author name, in characters.
pub const MAX_AUTHOR_LEN: usize = 100;

/// Accepted format for authorization dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default canvas width for new sessions, in pixels.
const DEFAULT_WIDTH: f32 = 800.0;

/// Default canvas height for new sessions, in pixels.
const DEFAULT_HEIGHT: f32 = 600.0;

/// Everything the store tracks for one design session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEntry {
    session_id: String,
    owner: String,
    design: CanvasDesign,
    /// Append-only save history; the last entry is the current save.
    saves: Vec<SaveRecord>,
    /// Append-only verification records, at most one per save.
    verifications: Vec<VerificationRecord>,
    publish: PublishState,
}

impl SessionEntry {
    fn new(session_id: String, owner: String, width: f32, height: f32) -> Self {
        Self {
            session_id,
            owner,
            design: CanvasDesign::new(width, height),
            saves: Vec::new(),
            verifications: Vec::new(),
            publish: PublishState::Editing,
        }
    }

    fn current_save(&self) -> Option<&SaveRecord> {
        self.saves.last()
    }

    fn verification_for(&self, save_id: SaveId) -> Option<&VerificationRecord> {
        self.verifications.iter().find(|v| v.save_id == save_id)
    }

    fn check_owner(&self, actor: &str) -> CoreResult<()> {
        if self.owner == actor {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                actor: actor.to_string(),
                session: self.session_id.clone(),
            })
        }
    }

    fn status(&self) -> SessionStatus {
        let dirty = self.design.dirty();
        let verification_path = match &self.publish {
            PublishState::Verified { token, .. } => Some(format!("/verify/{token}")),
            _ => None,
        };
        SessionStatus {
            session_id: self.session_id.clone(),
            stage: self.publish.label(),
            dirty,
            is_saved: self.publish.is_saved() && !dirty,
            can_export: self.publish.can_export() && !dirty,
            verification_path,
            current_save_title: self.current_save().map(|s| s.title.clone()),
            element_count: self.design.element_count(),
        }
    }
}

/// Thread-safe store for design sessions, save history, and verification
/// records.
#[derive(Debug, Clone, Default)]
pub struct DesignStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl DesignStore {
    /// Create an in-memory store with no persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            data_dir: None,
        }
    }

    /// Create a store with filesystem persistence.
    ///
    /// Sessions are saved as JSON files in `data_dir`. The directory is
    /// created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persistence`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| CoreError::Persistence(format!("create {}: {e}", data_dir.display())))?;
        Ok(Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            data_dir: Some(data_dir),
        })
    }

    /// Load all persisted sessions from the data directory into memory.
    /// Returns the loaded session ids.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persistence`] if the data directory can't be read
    /// or a session file can't be parsed.
    pub fn load_persisted(&self) -> CoreResult<Vec<String>> {
        let Some(ref data_dir) = self.data_dir else {
            return Ok(Vec::new());
        };
        let mut loaded = Vec::new();
        let entries = std::fs::read_dir(data_dir)
            .map_err(|e| CoreError::Persistence(format!("read {}: {e}", data_dir.display())))?;
        for dir_entry in entries {
            let dir_entry =
                dir_entry.map_err(|e| CoreError::Persistence(format!("read dir entry: {e}")))?;
            let path = dir_entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| CoreError::Persistence(format!("read {}: {e}", path.display())))?;
            let entry: SessionEntry = serde_json::from_str(&contents).map_err(|e| {
                CoreError::Persistence(format!("parse {}: {e}", path.display()))
            })?;
            let session_id = entry.session_id.clone();
            let mut sessions = self.write_sessions();
            sessions.insert(session_id.clone(), entry);
            loaded.push(session_id);
        }
        Ok(loaded)
    }

    // -----------------------------------------------------------------------
    // Sessions and elements
    // -----------------------------------------------------------------------

    /// Create a new design session owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionExists`] if the id is already taken.
    pub fn create_session(
        &self,
        session_id: &str,
        owner: &str,
        width: Option<f32>,
        height: Option<f32>,
    ) -> CoreResult<SessionStatus> {
        let entry = SessionEntry::new(
            session_id.to_string(),
            owner.to_string(),
            width.unwrap_or(DEFAULT_WIDTH),
            height.unwrap_or(DEFAULT_HEIGHT),
        );
        let status = entry.status();
        {
            let mut sessions = self.write_sessions();
            if sessions.contains_key(session_id) {
                return Err(CoreError::SessionExists(session_id.to_string()));
            }
            sessions.insert(session_id.to_string(), entry.clone());
        }
        self.persist_best_effort(&entry);
        Ok(status)
    }

    /// Snapshot of the live design for display.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`] if the session does not exist.
    pub fn document(&self, session_id: &str) -> CoreResult<DesignDocument> {
        let sessions = self.read_sessions();
        let entry = Self::entry(&sessions, session_id)?;
        Ok(DesignDocument::from_design(session_id, &entry.design))
    }

    /// Derived state for the UI gate.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`] if the session does not exist.
    pub fn status(&self, session_id: &str) -> CoreResult<SessionStatus> {
        let sessions = self.read_sessions();
        Ok(Self::entry(&sessions, session_id)?.status())
    }

    /// The most recent save record for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`] if the session does not exist.
    pub fn current_save(&self, session_id: &str) -> CoreResult<Option<SaveRecord>> {
        let sessions = self.read_sessions();
        Ok(Self::entry(&sessions, session_id)?.current_save().cloned())
    }

    /// Add an element to a session's design. Moves the session back to the
    /// editing stage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`], [`CoreError::Forbidden`], or a
    /// [`CoreError::Validation`] from element validation.
    pub fn add_element(
        &self,
        session_id: &str,
        actor: &str,
        element: Element,
    ) -> CoreResult<ElementId> {
        let (id, entry) = {
            let mut sessions = self.write_sessions();
            let entry = Self::entry_mut(&mut sessions, session_id)?;
            entry.check_owner(actor)?;
            let id = entry.design.add_element(element)?;
            entry.publish = PublishState::Editing;
            (id, entry.clone())
        };
        self.persist_best_effort(&entry);
        Ok(id)
    }

    /// Update an element via a closure. Moves the session back to the editing
    /// stage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`], [`CoreError::Forbidden`],
    /// [`CoreError::ElementNotFound`], or a validation error for malformed
    /// geometry.
    pub fn update_element<F>(
        &self,
        session_id: &str,
        actor: &str,
        id: ElementId,
        f: F,
    ) -> CoreResult<()>
    where
        F: FnOnce(&mut Element),
    {
        let entry = {
            let mut sessions = self.write_sessions();
            let entry = Self::entry_mut(&mut sessions, session_id)?;
            entry.check_owner(actor)?;
            entry.design.update_element(id, f)?;
            entry.publish = PublishState::Editing;
            entry.clone()
        };
        self.persist_best_effort(&entry);
        Ok(())
    }

    /// Remove an element. Moves the session back to the editing stage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionNotFound`], [`CoreError::Forbidden`], or
    /// [`CoreError::ElementNotFound`].
    pub fn remove_element(
        &self,
        session_id: &str,
        actor: &str,
        id: ElementId,
    ) -> CoreResult<()> {
        let entry = {
            let mut sessions = self.write_sessions();
            let entry = Self::entry_mut(&mut sessions, session_id)?;
            entry.check_owner(actor)?;
            entry.design.remove_element(&id)?;
            entry.publish = PublishState::Editing;
            entry.clone()
        };
        self.persist_best_effort(&entry);
        Ok(())
    }

    /// All known session ids.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        self.read_sessions().keys().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // Save gate
    // -----------------------------------------------------------------------

    /// Persist a new save record for the current design content.
    ///
    /// The durable write happens before the in-memory commit; on persistence
    /// failure the store is unchanged and the design stays dirty.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] for an empty or over-long title or an empty
    /// design; [`CoreError::Forbidden`] for a non-owner actor;
    /// [`CoreError::Persistence`] if the durable write fails.
    pub fn save(&self, session_id: &str, actor: &str, title: &str) -> CoreResult<SaveRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CoreError::Validation(format!(
                "title too long (max {MAX_TITLE_LEN} chars)"
            )));
        }

        let mut sessions = self.write_sessions();
        let entry = Self::entry_mut(&mut sessions, session_id)?;
        entry.check_owner(actor)?;
        if entry.design.is_empty() {
            return Err(CoreError::Validation(
                "an empty design cannot be saved".into(),
            ));
        }

        let document = DesignDocument::from_design(session_id, &entry.design);
        let digest = document.digest()?;
        let record = SaveRecord {
            id: SaveId::new(),
            session_id: session_id.to_string(),
            title: title.to_string(),
            revision: document.revision,
            document,
            digest,
            created_at: Utc::now(),
        };

        let mut staged = entry.clone();
        staged.design.mark_saved();
        staged.saves.push(record.clone());
        staged.publish = PublishState::Saved { save_id: record.id };
        self.persist_atomic(&staged)?;

        *entry = staged;
        tracing::info!(session_id, save_id = %record.id, title, "design saved");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Verification binder
    // -----------------------------------------------------------------------

    /// Bind the current save to a public verification token.
    ///
    /// `save_id` must reference the session's current save and the design
    /// must be unmutated since that save, otherwise the call fails with
    /// [`CoreError::StaleSave`]. Re-verifying the same unchanged save is
    /// idempotent and returns the existing record.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] for a malformed author or date,
    /// [`CoreError::StaleSave`] for a superseded save,
    /// [`CoreError::Forbidden`] for a non-owner actor,
    /// [`CoreError::Persistence`] if the durable write fails.
    pub fn verify(
        &self,
        session_id: &str,
        actor: &str,
        save_id: SaveId,
        author: &str,
        authorized_on: &str,
    ) -> CoreResult<VerificationRecord> {
        let author = author.trim();
        if author.is_empty() {
            return Err(CoreError::Validation("author name must not be empty".into()));
        }
        if author.chars().count() > MAX_AUTHOR_LEN {
            return Err(CoreError::Validation(format!(
                "author name too long (max {MAX_AUTHOR_LEN} chars)"
            )));
        }
        let authorized_on = NaiveDate::parse_from_str(authorized_on, DATE_FORMAT).map_err(|e| {
            CoreError::Validation(format!(
                "invalid authorized date {authorized_on:?}, expected YYYY-MM-DD: {e}"
            ))
        })?;

        let mut sessions = self.write_sessions();
        let entry = Self::entry_mut(&mut sessions, session_id)?;
        entry.check_owner(actor)?;

        if entry.design.dirty() {
            return Err(CoreError::StaleSave);
        }
        let current = entry.current_save().ok_or(CoreError::StaleSave)?;
        if current.id != save_id {
            return Err(CoreError::StaleSave);
        }

        // Idempotent re-verify: the record is immutable and content-bound,
        // so hand back the existing one.
        if let Some(existing) = entry.verification_for(save_id) {
            return Ok(existing.clone());
        }

        let record = VerificationRecord {
            token: VerificationToken::generate(),
            save_id,
            session_id: session_id.to_string(),
            author: author.to_string(),
            authorized_on,
            digest: current.digest.clone(),
            created_at: Utc::now(),
        };

        let mut staged = entry.clone();
        staged.verifications.push(record.clone());
        staged.publish = PublishState::Verified {
            save_id,
            token: record.token.clone(),
        };
        self.persist_atomic(&staged)?;

        *entry = staged;
        tracing::info!(session_id, token = %record.token, "save verified");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Export gate
    // -----------------------------------------------------------------------

    /// Hand out the (save, verification) snapshot pair for export.
    ///
    /// Encoders must render from the returned snapshot, never from the live
    /// design.
    ///
    /// # Errors
    ///
    /// [`CoreError::ExportNotAllowed`] carrying the unmet gate
    /// ([`ExportGate::NotSaved`] or [`ExportGate::NotVerified`]),
    /// [`CoreError::Forbidden`] for a non-owner actor.
    pub fn export_snapshot(
        &self,
        session_id: &str,
        actor: &str,
    ) -> CoreResult<(SaveRecord, VerificationRecord)> {
        let sessions = self.read_sessions();
        let entry = Self::entry(&sessions, session_id)?;
        entry.check_owner(actor)?;

        if entry.design.dirty() {
            return Err(CoreError::ExportNotAllowed(ExportGate::NotSaved));
        }
        match &entry.publish {
            PublishState::Editing => Err(CoreError::ExportNotAllowed(ExportGate::NotSaved)),
            PublishState::Saved { .. } => {
                Err(CoreError::ExportNotAllowed(ExportGate::NotVerified))
            }
            PublishState::Verified { save_id, .. } => {
                let save = entry
                    .saves
                    .iter()
                    .find(|s| s.id == *save_id)
                    .cloned()
                    .ok_or_else(|| {
                        CoreError::Persistence("save history missing the verified save".into())
                    })?;
                let verification = entry.verification_for(*save_id).cloned().ok_or_else(|| {
                    CoreError::Persistence("verification record missing for verified state".into())
                })?;
                Ok((save, verification))
            }
        }
    }

    /// Resolve a public verification token to the bound save's public
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VerificationNotFound`] for an unknown token.
    pub fn lookup_verification(&self, token: &str) -> CoreResult<VerificationSummary> {
        let sessions = self.read_sessions();
        for entry in sessions.values() {
            let Some(record) = entry.verifications.iter().find(|v| v.token.as_str() == token)
            else {
                continue;
            };
            let save = entry.saves.iter().find(|s| s.id == record.save_id);
            return Ok(VerificationSummary {
                token: record.token.as_str().to_string(),
                title: save.map(|s| s.title.clone()).unwrap_or_default(),
                author: record.author.clone(),
                authorized_on: record.authorized_on,
                digest: record.digest.clone(),
                saved_at: save.map_or(record.created_at, |s| s.created_at),
                verified_at: record.created_at,
            });
        }
        Err(CoreError::VerificationNotFound(token.to_string()))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn session_path(&self, session_id: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_filename(session_id))))
    }

    /// Write a session's state durably: serialize to a temp file, then rename
    /// over the final path so readers never observe a partial record.
    fn persist_atomic(&self, entry: &SessionEntry) -> CoreResult<()> {
        let Some(path) = self.session_path(&entry.session_id) else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(entry)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| CoreError::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| CoreError::Persistence(format!("rename to {}: {e}", path.display())))?;
        Ok(())
    }

    /// Persist an edit-path mutation. Edits are replayable from the UI, so a
    /// failed write is logged rather than surfaced.
    fn persist_best_effort(&self, entry: &SessionEntry) {
        if let Err(e) = self.persist_atomic(entry) {
            tracing::warn!(session_id = %entry.session_id, "failed to persist session: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Lock helpers
    // -----------------------------------------------------------------------

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn entry<'a>(
        sessions: &'a HashMap<String, SessionEntry>,
        session_id: &str,
    ) -> CoreResult<&'a SessionEntry> {
        sessions
            .get(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))
    }

    fn entry_mut<'a>(
        sessions: &'a mut HashMap<String, SessionEntry>,
        session_id: &str,
    ) -> CoreResult<&'a mut SessionEntry> {
        sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))
    }
}

/// Sanitize a session ID for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
