use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref EVENTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_events_total",
        "Total telemetry events received from the hub"
    ))
    .unwrap();
    pub static ref BATCHES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_batches_total",
        "Total event batches handed to the relay"
    ))
    .unwrap();
    pub static ref BROADCASTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_broadcasts_total",
        "Total messages broadcast to viewers"
    ))
    .unwrap();
    pub static ref HUB_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_errors_total",
        "Total hub consumption errors"
    ))
    .unwrap();
    pub static ref VIEWERS_CONNECTED: Gauge = Gauge::with_opts(Opts::new(
        "relay_viewers_connected",
        "Currently connected viewers"
    ))
    .unwrap();
    pub static ref VIEWER_DROPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_viewer_dropped_total",
        "Messages dropped for viewers that fell behind"
    ))
    .unwrap();
    pub static ref SEVERITY_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "relay_severity_total",
            "Readings observed per metric and severity"
        ),
        &["metric", "severity"]
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(BATCHES_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(BROADCASTS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(HUB_ERRORS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VIEWERS_CONNECTED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VIEWER_DROPPED_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(SEVERITY_TOTAL.clone())).unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
