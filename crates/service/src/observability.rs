use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};

// Prometheus metrics (default registry)
pub static STORAGE_OPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "auto_stash_storage_ops_total",
        "Storage operations issued through the gateway",
        &["op"]
    )
    .expect("register storage_ops_total")
});

pub static STORAGE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "auto_stash_storage_failures_total",
        "Storage operations that failed after all retries",
        &["op"]
    )
    .expect("register storage_failures_total")
});

pub static MERGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "auto_stash_merges_total",
        "Captures persisted by the merge policy, by shape",
        &["kind"]
    )
    .expect("register merges_total")
});

pub static ENGINE_RESTARTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auto_stash_engine_restarts_total",
        "Capture engine runs started"
    )
    .expect("register engine_restarts_total")
});

pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# metrics encode error: {e}");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
