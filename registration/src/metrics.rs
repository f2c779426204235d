//! Prometheus metrics for the registrar.
//!
//! [`RegistrationMetrics`] owns a dedicated [`Registry`] that the RPC
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry,
};

pub struct RegistrationMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Pre-check requests that passed validation.
    pub pre_checks: IntCounter,
    /// Credentials signed, across all paths.
    pub credentials_issued: IntCounter,
    /// Approved wallet switches.
    pub wallet_switches: IntCounter,
    /// Failed issue-credential calls, labelled by reason code.
    pub rejections: IntCounterVec,
    /// Wall time of issue-credential calls, in milliseconds.
    pub issue_duration_ms: Histogram,
}

impl RegistrationMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pre_checks = register_int_counter_with_registry!(
            Opts::new("civitas_pre_checks_total", "Total pre-check requests"),
            registry
        )
        .expect("failed to register pre_checks counter");

        let credentials_issued = register_int_counter_with_registry!(
            Opts::new("civitas_credentials_issued_total", "Total credentials signed"),
            registry
        )
        .expect("failed to register credentials_issued counter");

        let wallet_switches = register_int_counter_with_registry!(
            Opts::new("civitas_wallet_switches_total", "Total approved wallet switches"),
            registry
        )
        .expect("failed to register wallet_switches counter");

        let rejections = register_int_counter_vec_with_registry!(
            Opts::new(
                "civitas_registration_rejections_total",
                "Issue-credential calls that ended without a credential"
            ),
            &["reason"],
            registry
        )
        .expect("failed to register rejections counter");

        // 1 ms -> ~16 s, covering three sequential upstream calls.
        let issue_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "civitas_issue_duration_ms",
                "Issue-credential wall time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).expect("valid bucket layout")),
            registry
        )
        .expect("failed to register issue_duration_ms histogram");

        Self {
            registry,
            pre_checks,
            credentials_issued,
            wallet_switches,
            rejections,
            issue_duration_ms,
        }
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }
}

impl Default for RegistrationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
