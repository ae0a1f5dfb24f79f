//! Prometheus metrics for the molstore server

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "molstore_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "molstore_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "molstore_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    /// Store operations by entity, operation and outcome
    pub static ref ENTITY_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "molstore_entity_operations_total",
        "Total number of entity store operations served over HTTP",
        &["entity", "operation", "status"]
    )
    .expect("Failed to register ENTITY_OPERATIONS_TOTAL");

    /// Rows returned per search page
    pub static ref SEARCH_RESULTS: HistogramVec = register_histogram_vec!(
        "molstore_search_results",
        "Number of records returned by a search page",
        &["table"],
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register SEARCH_RESULTS");

    // Database Metrics

    /// Statement duration by table and store operation
    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "molstore_db_query_duration_seconds",
        "Database query duration in seconds",
        &["table", "operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to register DB_QUERY_DURATION_SECONDS");

    pub static ref DB_QUERY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "molstore_db_query_errors_total",
        "Total number of database query errors",
        &["table", "operation"]
    )
    .expect("Failed to register DB_QUERY_ERRORS_TOTAL");

    /// Relationship lookups that failed and were degraded to an empty value
    pub static ref RELATIONSHIP_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "molstore_relationship_failures_total",
        "Total number of relationship lookups degraded after an error",
        &["target", "relationship"]
    )
    .expect("Failed to register RELATIONSHIP_FAILURES_TOTAL");

    pub static ref DB_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "molstore_db_connections_active",
        "Number of active database connections"
    )
    .expect("Failed to register DB_CONNECTIONS_ACTIVE");

    pub static ref DB_CONNECTIONS_IDLE: IntGauge = register_int_gauge!(
        "molstore_db_connections_idle",
        "Number of idle database connections"
    )
    .expect("Failed to register DB_CONNECTIONS_IDLE");
}

/// Sub-paths under `/api/<entity>` that are routes rather than ids.
const FIXED_SEGMENTS: &[&str] = &["search", "entry", "stats", "filter"];

/// Collapse ids in a request path to keep label cardinality bounded.
///
/// `/api/chains/17` becomes `/api/chains/{id}`, `/api/chains/entry/1ABC`
/// becomes `/api/chains/entry/{id}`; fixed routes are kept as-is.
pub fn sanitize_path(path: &str) -> String {
    let Some(rest) = path.strip_prefix("/api/") else {
        return path.to_string();
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => "/api".to_string(),
        [entity] => format!("/api/{entity}"),
        [entity, id] if !FIXED_SEGMENTS.contains(id) => format!("/api/{entity}/{{id}}"),
        [entity, route, ..] if *route == "entry" => {
            format!("/api/{entity}/{route}/{{id}}")
        }
        [entity, route, tail @ ..] if FIXED_SEGMENTS.contains(route) => {
            let mut sanitized = format!("/api/{entity}/{route}");
            for segment in tail {
                sanitized.push('/');
                sanitized.push_str(segment);
            }
            sanitized
        }
        [entity, ..] => format!("/api/{entity}/{{id}}"),
    }
}

/// Entity path segment of an API request (`/api/proteins/...` gives `proteins`).
pub fn extract_entity(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/api/")?;
    rest.split('/')
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Store operation an API request maps to.
pub fn extract_operation(method: &str, path: &str) -> Option<String> {
    let rest = path.strip_prefix("/api/")?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let operation = match (method, segments.as_slice()) {
        (_, []) => return None,
        ("GET", [_]) => "search",
        ("POST", [_]) => "create",
        ("POST", [_, "search"]) => "search",
        (_, [_, "stats", ..]) => "stats",
        (_, [_, "filter", ..]) => "filter",
        ("GET", [_, "entry", ..]) => "by_entry",
        ("GET", [_, _]) => "read",
        ("PUT", [_, _]) => "update",
        ("DELETE", [_, _]) => "delete",
        _ => return None,
    };
    Some(operation.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/proteins"), "/api/proteins");
        assert_eq!(sanitize_path("/api/chains/17"), "/api/chains/{id}");
        assert_eq!(sanitize_path("/api/chains/entry/1ABC"), "/api/chains/entry/{id}");
        assert_eq!(sanitize_path("/api/ligands/search"), "/api/ligands/search");
        assert_eq!(
            sanitize_path("/api/proteins/stats/classifications"),
            "/api/proteins/stats/classifications"
        );
        assert_eq!(sanitize_path("/health"), "/health");
        assert_eq!(sanitize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_extract_entity() {
        assert_eq!(extract_entity("/api/proteins"), Some("proteins".to_string()));
        assert_eq!(extract_entity("/api/chains/3"), Some("chains".to_string()));
        assert_eq!(extract_entity("/health"), None);
    }

    #[test]
    fn test_extract_operation() {
        assert_eq!(
            extract_operation("GET", "/api/proteins"),
            Some("search".to_string())
        );
        assert_eq!(
            extract_operation("POST", "/api/proteins/search"),
            Some("search".to_string())
        );
        assert_eq!(
            extract_operation("GET", "/api/proteins/1ABC"),
            Some("read".to_string())
        );
        assert_eq!(
            extract_operation("POST", "/api/chains"),
            Some("create".to_string())
        );
        assert_eq!(
            extract_operation("PUT", "/api/chains/4"),
            Some("update".to_string())
        );
        assert_eq!(
            extract_operation("DELETE", "/api/chains/4"),
            Some("delete".to_string())
        );
        assert_eq!(
            extract_operation("GET", "/api/chains/entry/1ABC"),
            Some("by_entry".to_string())
        );
        assert_eq!(
            extract_operation("GET", "/api/ligands/stats/most-common"),
            Some("stats".to_string())
        );
        assert_eq!(
            extract_operation("GET", "/api/proteins/filter/resolution"),
            Some("filter".to_string())
        );
        assert_eq!(extract_operation("GET", "/metrics"), None);
    }
}
