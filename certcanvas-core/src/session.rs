//! Per-session publish lifecycle.
//!
//! The save → verify → export sequence is a small state machine. Modelling it
//! as one tagged value (instead of independent booleans) makes impossible
//! combinations like "verified but never saved" unrepresentable.

use serde::{Deserialize, Serialize};

use crate::records::{SaveId, VerificationToken};

/// Publish lifecycle of a design session.
///
/// Transitions: any element mutation returns the session to
/// [`PublishState::Editing`]; a successful save moves it to
/// [`PublishState::Saved`]; a successful verification moves it to
/// [`PublishState::Verified`]. Export is permitted exactly in `Verified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum PublishState {
    /// Unsaved mutations exist (or nothing was ever saved).
    Editing,
    /// The current design content is covered by a save.
    Saved {
        /// The covering save.
        save_id: SaveId,
    },
    /// The current save is bound to a verification record.
    Verified {
        /// The covering save.
        save_id: SaveId,
        /// The bound verification token.
        token: VerificationToken,
    },
}

impl PublishState {
    /// Whether the current design content is covered by a save.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        !matches!(self, Self::Editing)
    }

    /// Whether export is permitted.
    #[must_use]
    pub fn can_export(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// The save covering the current content, if any.
    #[must_use]
    pub fn save_id(&self) -> Option<SaveId> {
        match self {
            Self::Editing => None,
            Self::Saved { save_id } | Self::Verified { save_id, .. } => Some(*save_id),
        }
    }

    /// Short stage label for status payloads and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Saved { .. } => "saved",
            Self::Verified { .. } => "verified",
        }
    }
}

/// Derived session state exposed to the UI collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub session_id: String,
    /// Publish stage label: `editing`, `saved`, or `verified`.
    pub stage: &'static str,
    /// Whether unsaved mutations exist.
    pub dirty: bool,
    /// Whether the current content is covered by a save.
    pub is_saved: bool,
    /// Whether export is permitted.
    pub can_export: bool,
    /// Opaque verification URL path, present once verified.
    pub verification_path: Option<String>,
    /// Title of the current save, if any.
    pub current_save_title: Option<String>,
    /// Number of elements in the design.
    pub element_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_is_neither_saved_nor_exportable() {
        let state = PublishState::Editing;
        assert!(!state.is_saved());
        assert!(!state.can_export());
        assert!(state.save_id().is_none());
    }

    #[test]
    fn saved_is_not_yet_exportable() {
        let state = PublishState::Saved {
            save_id: SaveId::new(),
        };
        assert!(state.is_saved());
        assert!(!state.can_export());
    }

    #[test]
    fn verified_is_exportable() {
        let save_id = SaveId::new();
        let state = PublishState::Verified {
            save_id,
            token: VerificationToken::generate(),
        };
        assert!(state.is_saved());
        assert!(state.can_export());
        assert_eq!(state.save_id(), Some(save_id));
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(PublishState::Editing.label(), "editing");
        assert_eq!(
            PublishState::Saved {
                save_id: SaveId::new()
            }
            .label(),
            "saved"
        );
    }
}
