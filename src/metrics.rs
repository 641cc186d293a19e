//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth metrics
    pub static ref SESSION_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pocketledger_session_lookups_total", "Total number of session lookups against the auth service"),
        &["result"]
    ).expect("metric can be created");
    pub static ref GUARD_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pocketledger_guard_decisions_total", "Total number of route guard decisions"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref CODE_EXCHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pocketledger_code_exchanges_total", "Total number of authorization code exchanges"),
        &["status"]
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pocketledger_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize metrics registry.
///
/// Idempotent: registration happens once per process, so test harnesses
/// that build multiple servers can call this freely.
pub fn init_metrics() {
    INIT.call_once(register_all);
}

fn register_all() {
    REGISTRY
        .register(Box::new(SESSION_LOOKUPS_TOTAL.clone()))
        .expect("SESSION_LOOKUPS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GUARD_DECISIONS_TOTAL.clone()))
        .expect("GUARD_DECISIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CODE_EXCHANGES_TOTAL.clone()))
        .expect("CODE_EXCHANGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
