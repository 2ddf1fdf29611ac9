//! Relayer metrics.

#![allow(missing_docs)]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::LazyLock;

pub static RELAYED_ATTESTATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "blobstream_relayer_relayed_total",
        "Attestations committed to the bridge contract",
        &["attestation_type"]
    )
    .unwrap()
});

pub static RELAY_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "blobstream_relayer_failures_total",
        "Relay iterations that ended in an error"
    )
    .unwrap()
});

pub static LAST_RELAYED_NONCE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "blobstream_relayer_last_relayed_nonce",
        "Last nonce the bridge contract accepted"
    )
    .unwrap()
});

pub static QUORUM_WAIT: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "blobstream_relayer_quorum_wait_seconds",
        "Time spent waiting for a quorum of confirms",
        vec![0.1, 1.0, 5.0, 30.0, 60.0, 300.0, 900.0, 1800.0]
    )
    .unwrap()
});
