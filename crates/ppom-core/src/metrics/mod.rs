//! Counters recorded through the `metrics` facade.
//!
//! The library only records; installing an exporter is up to the host.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `ppom_manifest_sync_total` | `outcome`: `unchanged`, `updated`, `failed` |
//! | `ppom_file_fetch_total` | `mode`: `eager`, `background`; `outcome`: `ok`, `failed`, `skipped` |
//! | `ppom_relay_requests_total` | `outcome`: `forwarded`, `limit_exceeded`, `method_not_allowed`, `provider_error` |
//! | `ppom_engine_sessions_total` | `outcome`: `ok`, `failed` |
//! | `ppom_orphaned_files_deleted_total` | none |

use metrics::counter;

/// Stable label value for an outcome or error kind.
pub trait MetricsLabel {
    fn as_metric_str(&self) -> &'static str;
}

/// How a data file fetch was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Current chain, inside the engine lock.
    Eager,
    /// Paced fetch for any tracked chain.
    Background,
}

impl MetricsLabel for FetchMode {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Background => "background",
        }
    }
}

#[inline]
pub fn record_manifest_sync(outcome: &'static str) {
    counter!("ppom_manifest_sync_total", "outcome" => outcome).increment(1);
}

#[inline]
pub fn record_file_fetch(mode: FetchMode, outcome: &'static str) {
    counter!("ppom_file_fetch_total", "mode" => mode.as_metric_str(), "outcome" => outcome)
        .increment(1);
}

#[inline]
pub fn record_relay_request(outcome: &'static str) {
    counter!("ppom_relay_requests_total", "outcome" => outcome).increment(1);
}

#[inline]
pub fn record_engine_session(success: bool) {
    let outcome = if success { "ok" } else { "failed" };
    counter!("ppom_engine_sessions_total", "outcome" => outcome).increment(1);
}

#[inline]
pub fn record_orphans_deleted(count: usize) {
    counter!("ppom_orphaned_files_deleted_total").increment(count as u64);
}
