//! # Certcanvas Core
//!
//! Core logic for the certificate design studio: the in-memory canvas model,
//! the save → verify → export pipeline, and the durable session store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              certcanvas-core                │
//! ├─────────────────────────────────────────────┤
//! │  Canvas Model    │  Save Gate               │
//! │  - Elements      │  - Title validation      │
//! │  - Transforms    │  - Append-only history   │
//! │  - Dirty flag    │  - Atomic persistence    │
//! ├─────────────────────────────────────────────┤
//! │  Verify Binder   │  Export Gate             │
//! │  - Random token  │  - Publish state machine │
//! │  - Content digest│  - Snapshot handoff      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering lives in `certcanvas-renderer`; the HTTP surface in
//! `certcanvas-server`. This crate has no transport dependencies.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod design;
pub mod element;
pub mod error;
pub mod records;
pub mod schema;
pub mod session;
pub mod store;

pub use design::CanvasDesign;
pub use element::{Element, ElementId, ElementKind, ImageFormat, ShapeKind, Transform};
pub use error::{CoreError, CoreResult, ExportGate};
pub use records::{SaveId, SaveRecord, VerificationRecord, VerificationSummary, VerificationToken};
pub use schema::{DesignDocument, ElementDocument};
pub use session::{PublishState, SessionStatus};
pub use store::DesignStore;

/// Certcanvas core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
