//! Prometheus metrics for certcanvas-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics`
//! endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const SESSIONS_CREATED_TOTAL: &str = "certcanvas_sessions_created_total";
const SESSIONS_ACTIVE: &str = "certcanvas_sessions_active";
const SAVES_TOTAL: &str = "certcanvas_saves_total";
const VERIFICATIONS_TOTAL: &str = "certcanvas_verifications_total";
const EXPORTS_TOTAL: &str = "certcanvas_exports_total";
const VERIFICATION_LOOKUPS_TOTAL: &str = "certcanvas_verification_lookups_total";
const VALIDATION_FAILURES_TOTAL: &str = "certcanvas_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a created design session.
pub fn record_session_created() {
    counter!(SESSIONS_CREATED_TOTAL).increment(1);
}

/// Update the active session count.
pub fn set_sessions_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!(SESSIONS_ACTIVE).set(count as f64);
}

/// Record a save-gate outcome.
///
/// # Arguments
///
/// * `success` - Whether the save was accepted
pub fn record_save(success: bool) {
    counter!(SAVES_TOTAL, "success" => success.to_string()).increment(1);
}

/// Record a verification-binder outcome.
///
/// # Arguments
///
/// * `success` - Whether the verification record was created (or returned
///   idempotently)
pub fn record_verification(success: bool) {
    counter!(VERIFICATIONS_TOTAL, "success" => success.to_string()).increment(1);
}

/// Record an export attempt.
///
/// # Arguments
///
/// * `format` - Target format (png, jpg, pdf)
/// * `success` - Whether the export passed the gate and encoded
pub fn record_export(format: &str, success: bool) {
    counter!(
        EXPORTS_TOTAL,
        "format" => format.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record a public verification lookup.
///
/// # Arguments
///
/// * `found` - Whether the token resolved to a record
pub fn record_verification_lookup(found: bool) {
    counter!(VERIFICATION_LOOKUPS_TOTAL, "found" => found.to_string()).increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (session_id, actor)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The metrics macros are no-ops without an installed recorder, so these
    // exercise the call paths for panics only.

    #[test]
    fn recording_without_a_recorder_does_not_panic() {
        record_session_created();
        set_sessions_active(3);
        record_save(true);
        record_verification(false);
        record_export("png", true);
        record_verification_lookup(false);
        record_validation_failure("session_id");
    }
}
