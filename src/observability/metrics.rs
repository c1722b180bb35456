//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Rate limiting for HTTP requests
//! - Authentication for metrics endpoints
//! - Prometheus metrics server with health endpoints
//! - Metrics recording functions for the purchase flow

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use super::health_checks::{perform_readiness_checks, ReadinessInputs};
use crate::observability_config::ObservabilityConfig;

/// Simple rate limiter for HTTP requests
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_secs,
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.window_secs);

        let mut requests = self.requests.lock();

        // Forget requests outside the window, and clients with none left
        requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < window);
            !times.is_empty()
        });

        let client_requests = requests.entry(ip.to_string()).or_default();
        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        client_requests.push(now);
        true
    }

    /// Number of clients with requests inside the current window
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().len()
    }
}

/// Health endpoints are never rate limited
pub fn is_rate_limited_path(path: &str) -> bool {
    !path.starts_with("/health/")
}

/// Check the bearer token when `METRICS_AUTH_TOKEN` is set
pub fn check_auth<B>(req: &hyper::Request<B>) -> bool {
    let expected_token = match std::env::var("METRICS_AUTH_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => return true,
    };

    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected_token)
}

/// Check request size limit
pub fn check_request_size<B>(req: &hyper::Request<B>) -> bool {
    const MAX_REQUEST_SIZE: u64 = 1024 * 1024;

    match req.headers().get(hyper::header::CONTENT_LENGTH) {
        Some(content_length) => content_length
            .to_str()
            .ok()
            .and_then(|size| size.parse::<u64>().ok())
            .is_some_and(|size| size <= MAX_REQUEST_SIZE),
        // GET requests carry no body
        None => true,
    }
}

/// Initialize metrics collection with Prometheus exporter and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    tracing::info!(
        metrics_port = %config.metrics_port,
        "Metrics collection initialized"
    );
    Ok(handle)
}

fn text_response(status: hyper::StatusCode, body: impl Into<String>) -> hyper::Response<String> {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() = status;
    response
}

/// Route one request to the metrics or health endpoints
pub async fn route_request(
    method: &hyper::Method,
    path: &str,
    metrics_handle: Option<&PrometheusHandle>,
    readiness: &ReadinessInputs,
) -> hyper::Response<String> {
    match (method, path) {
        (&hyper::Method::GET, "/metrics") => match metrics_handle {
            Some(handle) => {
                let mut response = hyper::Response::new(handle.render());
                response.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static(
                        "text/plain; version=0.0.4; charset=utf-8",
                    ),
                );
                response
            }
            None => text_response(hyper::StatusCode::NOT_FOUND, "Metrics export disabled"),
        },
        // Liveness: the process is serving requests
        (&hyper::Method::GET, "/health/live") => text_response(hyper::StatusCode::OK, "OK"),
        (&hyper::Method::GET, "/health/ready") => match perform_readiness_checks(readiness).await {
            Ok(()) => text_response(hyper::StatusCode::OK, "OK"),
            Err(e) => text_response(
                hyper::StatusCode::SERVICE_UNAVAILABLE,
                format!("NOT READY: {}", e),
            ),
        },
        _ => text_response(hyper::StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Start the metrics server with health checks.
///
/// Returns the address the server is bound to.
pub async fn start_metrics_server_with_health_checks(
    metrics_handle: Option<PrometheusHandle>,
    port: u16,
    readiness: ReadinessInputs,
) -> Result<SocketAddr> {
    // Localhost only unless explicitly configured
    let bind_all = std::env::var("METRICS_BIND_ALL_INTERFACES")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    let addr = if bind_all {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    };

    // 60 requests per minute per IP on /metrics and unknown paths
    let rate_limiter = Arc::new(RateLimiter::new(60, 60));
    let readiness = Arc::new(readiness);

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        bind_all = %bind_all,
        "Metrics server listening"
    );

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();
                    let readiness = Arc::clone(&readiness);
                    let rate_limiter = Arc::clone(&rate_limiter);

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let readiness = Arc::clone(&readiness);
                                let rate_limiter = Arc::clone(&rate_limiter);
                                let peer_ip = peer_addr.ip().to_string();
                                async move {
                                    if is_rate_limited_path(req.uri().path())
                                        && !rate_limiter.is_allowed(&peer_ip)
                                    {
                                        return Ok::<_, Infallible>(text_response(
                                            hyper::StatusCode::TOO_MANY_REQUESTS,
                                            "Rate limit exceeded",
                                        ));
                                    }

                                    if !check_request_size(&req) {
                                        return Ok(text_response(
                                            hyper::StatusCode::PAYLOAD_TOO_LARGE,
                                            "Request too large",
                                        ));
                                    }

                                    if !check_auth(&req) {
                                        let mut response = text_response(
                                            hyper::StatusCode::UNAUTHORIZED,
                                            "Unauthorized",
                                        );
                                        response.headers_mut().insert(
                                            hyper::header::WWW_AUTHENTICATE,
                                            hyper::header::HeaderValue::from_static("Bearer"),
                                        );
                                        return Ok(response);
                                    }

                                    Ok(route_request(
                                        req.method(),
                                        req.uri().path(),
                                        metrics_handle.as_ref(),
                                        &readiness,
                                    )
                                    .await)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::warn!(
                                error = %err,
                                peer = %peer_addr,
                                "Error serving metrics connection"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, address = %local_addr, "Error accepting connection");
                }
            }
        }
    });

    Ok(local_addr)
}

/// Record one handled interaction
pub fn record_interaction(action: &str, outcome: &str) {
    let action = action.to_string();
    let outcome = outcome.to_string();
    metrics::counter!("discord_interactions_total", "action" => action, "outcome" => outcome)
        .increment(1);
}

/// Record one catalog API request
pub fn record_catalog_request(operation: &str, success: bool, duration: Duration) {
    let operation = operation.to_string();
    let result = if success { "success" } else { "failure" };
    metrics::counter!("catalog_requests_total", "operation" => operation.clone(), "result" => result)
        .increment(1);
    metrics::histogram!("catalog_request_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record a completed purchase flow
pub fn record_checkout(payment_method: &str) {
    let payment_method = payment_method.to_string();
    metrics::counter!("checkouts_total", "payment_method" => payment_method).increment(1);
}

/// Current number of live selections
pub fn record_selection_store_size(entries: usize) {
    metrics::gauge!("selection_store_entries").set(entries as f64);
}

/// Selections dropped by the idle sweeper
pub fn record_selection_evictions(evicted: usize) {
    metrics::counter!("selection_evictions_total").increment(evicted as u64);
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    metrics::gauge!("health_check_status", "check" => check_type.clone())
        .set(if success { 1.0 } else { 0.0 });
    metrics::histogram!("health_check_duration_seconds", "check" => check_type)
        .record(duration.as_secs_f64());
}

/// Record startup time
pub fn record_startup_metrics(duration: Duration) {
    metrics::histogram!("startup_duration_seconds").record(duration.as_secs_f64());
}
