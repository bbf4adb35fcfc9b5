//! Span builder helpers for dataset-router instrumentation.

/// Create a tracing span for one inbound routing request.
///
/// Usage: `let span = route_request_span!(correlation_id, target_count);`
///
/// Recorded once selection finishes:
/// - `selected_target`: name of the winning target, if any
/// - `score`: the winning score
/// - `total_duration_ms`: wall time from receipt to response
#[macro_export]
macro_rules! route_request_span {
    ($correlation_id:expr, $target_count:expr) => {
        tracing::info_span!(
            "route_request",
            correlation_id = %$correlation_id,
            target_count = $target_count,
            selected_target = tracing::field::Empty,
            score = tracing::field::Empty,
            total_duration_ms = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for forwarding one request to one target.
#[macro_export]
macro_rules! target_forward_span {
    ($target:expr) => {
        tracing::info_span!(
            "target_forward",
            target = %$target,
            attempts = tracing::field::Empty,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for a credential exchange against a target.
#[macro_export]
macro_rules! token_refresh_span {
    ($target:expr) => {
        tracing::info_span!(
            "token_refresh",
            target = %$target,
            status = tracing::field::Empty,
        )
    };
}
