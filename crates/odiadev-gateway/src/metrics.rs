use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Request counters
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("odiadev_requests_total", "Total number of handled requests"),
        &["endpoint", "status"],
    )
    .unwrap()
});

pub static PAYMENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("odiadev_payments_total", "Payment initiations by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static TTS_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("odiadev_tts_requests_total", "TTS requests by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static WEBHOOK_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "odiadev_webhook_events_total",
            "Accepted payment webhooks by event type",
        ),
        &["event"],
    )
    .unwrap()
});

// auth_failed, rate_limited, invalid_webhook_signature
pub static SECURITY_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("odiadev_security_events_total", "Rejected requests by reason"),
        &["kind"],
    )
    .unwrap()
});

pub static UPSTREAM_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "odiadev_upstream_latency_seconds",
            "Upstream call latency including retries",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["upstream"],
    )
    .unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY.register(Box::new(REQUESTS_TOTAL.clone())).unwrap();
        REGISTRY.register(Box::new(PAYMENTS_TOTAL.clone())).unwrap();
        REGISTRY
            .register(Box::new(TTS_REQUESTS_TOTAL.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(WEBHOOK_EVENTS_TOTAL.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(SECURITY_EVENTS_TOTAL.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(UPSTREAM_LATENCY.clone()))
            .unwrap();
    });
}

pub fn record_request(endpoint: &str, status: u16) {
    let status = status.to_string();
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

/// Count every response by matched route pattern and status.
pub async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let res = next.call(req).await?;
    let endpoint = res
        .request()
        .match_pattern()
        .unwrap_or_else(|| "unmatched".to_string());
    record_request(&endpoint, res.status().as_u16());
    Ok(res)
}

pub fn record_security_event(kind: &str) {
    SECURITY_EVENTS_TOTAL.with_label_values(&[kind]).inc();
}
