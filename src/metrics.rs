use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Counter for messages accepted into the store.
static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("messages_sent_total", "Total number of messages stored")
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .unwrap_or_else(|e| {
            tracing::error!("failed to create messages_sent counter: {}", e);
            IntCounter::new("dummy_messages_sent", "dummy").expect("dummy counter")
        })
});

/// Counter for delivery-state transitions, labelled by the state reached.
static DELIVERY_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "delivery_transitions_total",
            "Total delivery-state transitions by state reached",
        ),
        &["state"],
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create delivery_transitions counter: {}", e);
        IntCounterVec::new(Opts::new("dummy_transitions", "dummy"), &["state"])
            .expect("dummy counter")
    })
});

/// Counter for friend requests, labelled by outcome classification.
static FRIEND_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "friend_requests_total",
            "Total friend-request attempts by outcome",
        ),
        &["outcome"],
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create friend_requests counter: {}", e);
        IntCounterVec::new(Opts::new("dummy_requests", "dummy"), &["outcome"])
            .expect("dummy counter")
    })
});

#[inline]
pub fn message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

#[inline]
pub fn delivery_transitions(state: &str, count: u64) {
    DELIVERY_TRANSITIONS_TOTAL
        .with_label_values(&[state])
        .inc_by(count);
}

#[inline]
pub fn friend_request_outcome(outcome: &str) {
    FRIEND_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}
