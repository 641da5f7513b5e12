use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref LOGIN_CHECKS_TOTAL: Counter =
        register_counter!("portal_login_checks_total", "Total login rate limit checks").unwrap();
    pub static ref LOGIN_DENIED_TOTAL: Counter =
        register_counter!("portal_login_denied_total", "Login attempts denied").unwrap();
    pub static ref STORE_ERRORS_TOTAL: Counter = register_counter!(
        "portal_rate_limit_store_errors_total",
        "Rate limit store failures (timeouts included)"
    )
    .unwrap();
    pub static ref CHECK_LATENCY: Histogram = register_histogram!(
        "portal_login_check_latency_seconds",
        "Login rate limit check latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_KEYS: Gauge = register_gauge!(
        "portal_rate_limit_tracked_keys",
        "Current number of keys held by the in-memory store"
    )
    .unwrap();
    pub static ref PORTAL_RESOLUTIONS_TOTAL: Counter = register_counter!(
        "portal_access_resolutions_total",
        "Total portal access resolutions"
    )
    .unwrap();
}

// Renders every registered metric in the prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
