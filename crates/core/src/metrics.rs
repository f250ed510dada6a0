//! Metric name constants and description registration.
//!
//! All Prometheus metric names are defined centrally here. Components
//! reference these constants when calling `metrics::counter!()` and
//! `metrics::gauge!()`.
//!
//! # Naming convention
//!
//! - prefix: `updock_`
//! - component: `updater_`, `notifier_`, `daemon_`
//! - suffix: `_total` (counter), none (gauge)

// --- label key constants ---

/// Notification kind label key (dry_run_banner, update, up_to_date,
/// error, cleanup, info).
pub const LABEL_KIND: &str = "kind";

// --- updater metrics ---

/// Updater: completed reconciliation passes (counter).
pub const UPDATER_PASSES_TOTAL: &str = "updock_updater_passes_total";

/// Updater: containers that went through a freshness check (counter).
pub const UPDATER_CONTAINERS_CHECKED_TOTAL: &str = "updock_updater_containers_checked_total";

/// Updater: updates applied (counter).
pub const UPDATER_UPDATES_APPLIED_TOTAL: &str = "updock_updater_updates_applied_total";

/// Updater: per-container update failures (counter).
pub const UPDATER_UPDATE_FAILURES_TOTAL: &str = "updock_updater_update_failures_total";

/// Updater: containers skipped (counter).
pub const UPDATER_CONTAINERS_SKIPPED_TOTAL: &str = "updock_updater_containers_skipped_total";

/// Updater: bytes reclaimed by image prunes (counter).
pub const UPDATER_PRUNED_BYTES_TOTAL: &str = "updock_updater_pruned_bytes_total";

/// Updater: running containers seen in the last pass (gauge).
pub const UPDATER_MONITORED_CONTAINERS: &str = "updock_updater_monitored_containers";

// --- notifier metrics ---

/// Notifier: events emitted (counter, label: kind).
pub const NOTIFIER_EVENTS_TOTAL: &str = "updock_notifier_events_total";

/// Notifier: webhook delivery failures (counter).
pub const NOTIFIER_DELIVERY_FAILURES_TOTAL: &str = "updock_notifier_delivery_failures_total";

// --- daemon metrics ---

/// Daemon: uptime in seconds (gauge).
pub const DAEMON_UPTIME_SECONDS: &str = "updock_daemon_uptime_seconds";

/// Daemon: build info (gauge, always 1, labels: version).
pub const DAEMON_BUILD_INFO: &str = "updock_daemon_build_info";

/// Registers descriptions for all metrics.
///
/// Calls `metrics::describe_counter!()` / `describe_gauge!()` so
/// Prometheus HELP text is populated. Call once after the global recorder
/// is installed, typically at daemon startup.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        UPDATER_PASSES_TOTAL,
        "Total number of reconciliation passes completed"
    );
    describe_counter!(
        UPDATER_CONTAINERS_CHECKED_TOTAL,
        "Total number of containers checked for a newer image"
    );
    describe_counter!(
        UPDATER_UPDATES_APPLIED_TOTAL,
        "Total number of container updates applied"
    );
    describe_counter!(
        UPDATER_UPDATE_FAILURES_TOTAL,
        "Total number of per-container update failures"
    );
    describe_counter!(
        UPDATER_CONTAINERS_SKIPPED_TOTAL,
        "Total number of containers skipped (skip list, cooldown, untagged, dry-run)"
    );
    describe_counter!(
        UPDATER_PRUNED_BYTES_TOTAL,
        "Total bytes reclaimed by post-pass image prunes"
    );
    describe_gauge!(
        UPDATER_MONITORED_CONTAINERS,
        "Number of running containers seen in the most recent pass"
    );

    describe_counter!(
        NOTIFIER_EVENTS_TOTAL,
        "Total number of notification events emitted, by kind"
    );
    describe_counter!(
        NOTIFIER_DELIVERY_FAILURES_TOTAL,
        "Total number of failed webhook deliveries"
    );

    describe_gauge!(DAEMON_UPTIME_SECONDS, "Updock daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
