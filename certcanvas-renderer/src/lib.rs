//! # Certcanvas Renderer
//!
//! Export encoders for certificate designs. Renders a saved
//! [`DesignDocument`](certcanvas_core::DesignDocument) snapshot to PNG, JPEG,
//! or PDF through an SVG intermediate representation and the
//! resvg/tiny-skia rasterization pipeline, stamping the verification
//! reference into every encoding.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;

pub use error::{RenderError, RenderResult};
pub use export::{
    CertificateExporter, ExportArtifact, ExportConfig, ExportFormat, VerificationStamp,
};
