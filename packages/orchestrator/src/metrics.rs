//! Orchestrator metrics.

#![allow(missing_docs)]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};
use std::sync::LazyLock;

pub static CONFIRMS_PUBLISHED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "blobstream_orchestrator_confirms_published_total",
        "Confirms signed and published to the store",
        &["attestation_type"]
    )
    .unwrap()
});

pub static NONCES_SKIPPED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "blobstream_orchestrator_nonces_skipped_total",
        "Nonces that did not need a signature",
        &["reason"]
    )
    .unwrap()
});

pub static NONCES_REQUEUED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "blobstream_orchestrator_nonces_requeued_total",
        "Nonces put back on the requeue queue after exhausting retries"
    )
    .unwrap()
});

pub static NONCES_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "blobstream_orchestrator_nonces_dropped_total",
        "Nonces given up on"
    )
    .unwrap()
});

pub static LAST_PROCESSED_NONCE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "blobstream_orchestrator_last_processed_nonce",
        "Nonce most recently processed successfully"
    )
    .unwrap()
});
