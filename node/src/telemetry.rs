// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::NodeError;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const EVENTS_APPENDED: &str = "mds_journal_events_appended_total";
pub const EVENTS_EXPIRED: &str = "mds_journal_events_expired_total";
pub const REPLAY_DURATION: &str = "mds_journal_replay_duration_seconds";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() -> Result<(), NodeError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mds_node=debug,mds_journal=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| NodeError::Telemetry(e.to_string()))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| NodeError::Telemetry(e.to_string()))?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!(EVENTS_APPENDED, "Events appended to the journal file");
    metrics::describe_counter!(EVENTS_EXPIRED, "Events expired from the journal");
    metrics::describe_histogram!(REPLAY_DURATION, "Time taken to replay the journal");

    metrics::gauge!("mds_node_up", 1.0);
    Ok(())
}

/// Prometheus exposition of everything recorded so far.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
