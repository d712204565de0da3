use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUESTS_ADMITTED: Counter =
        register_counter!("gate_requests_admitted_total", "Writes that passed admission").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("gate_rate_limited_total", "Rate-limited requests").unwrap();
    pub static ref PAYLOAD_TOO_LARGE_TOTAL: Counter =
        register_counter!("gate_payload_too_large_total", "Oversized bodies").unwrap();
    pub static ref MALFORMED_BODY_TOTAL: Counter =
        register_counter!("gate_malformed_body_total", "Unparseable bodies").unwrap();
    pub static ref HANDLER_LATENCY: Histogram = register_histogram!(
        "gate_handler_latency_seconds",
        "Write handler latency in seconds"
    )
    .unwrap();
    pub static ref LIMITER_KEYS: Gauge =
        register_gauge!("gate_limiter_keys", "Live keys in the rate limiter table").unwrap();
}
