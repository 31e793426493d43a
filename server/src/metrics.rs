//! Prometheus metrics & middleware helper.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Registry shared by the HTTP middleware and the scraper counters.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    registry
        .register(Box::new(DEPARTURES.clone()))
        .expect("register departures");
    registry
        .register(Box::new(NOTIFICATIONS_SENT.clone()))
        .expect("register notifications");
    registry
        .register(Box::new(SCAN_PASSES.clone()))
        .expect("register scan passes");
    registry
        .register(Box::new(CHUNK_FAILURES.clone()))
        .expect("register chunk failures");
    registry
});

pub static DEPARTURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("wows_departures_total", "Players detected leaving a clan")
        .expect("departures counter")
});

pub static NOTIFICATIONS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wows_notifications_sent_total",
        "Departure messages delivered to chat channels",
    )
    .expect("notifications counter")
});

pub static SCAN_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wows_scan_passes_total", "Synchronization passes started"),
        &["kind"],
    )
    .expect("scan passes counter")
});

pub static CHUNK_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wows_chunk_failures_total",
        "Clan chunks skipped after a remote service error",
    )
    .expect("chunk failures counter")
});

/// Request metrics middleware, also serving `/metrics`.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    PrometheusMetricsBuilder::new("api")
        .registry(REGISTRY.clone())
        .endpoint("/metrics") // exposed URL
        .build()
        .expect("metrics builder")
});
