//! Metrics middleware - tracks HTTP request metrics

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    // ids collapsed to keep label cardinality bounded
    let sanitized_path = crate::metrics::sanitize_path(&path);

    crate::metrics::HTTP_REQUESTS_IN_FLIGHT
        .with_label_values(&[&method, &sanitized_path])
        .inc();

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &sanitized_path, &status])
        .inc();
    crate::metrics::HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &sanitized_path])
        .observe(duration);

    if let (Some(entity), Some(operation)) = (
        crate::metrics::extract_entity(&path),
        crate::metrics::extract_operation(&method, &path),
    ) {
        let outcome = if response.status().is_success() {
            "success"
        } else if response.status().is_client_error() {
            "client_error"
        } else {
            "server_error"
        };
        crate::metrics::ENTITY_OPERATIONS_TOTAL
            .with_label_values(&[&entity, &operation, outcome])
            .inc();
    }

    crate::metrics::HTTP_REQUESTS_IN_FLIGHT
        .with_label_values(&[&method, &sanitized_path])
        .dec();

    response
}
