//! Shared HTTP plumbing for webhook-style transports.

use crate::delivery::DeliveryError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Send a request and map the outcome onto a delivery result.
pub(crate) async fn execute(request: RequestBuilder) -> Result<(), DeliveryError> {
    let response = request.send().await.map_err(from_reqwest)?;
    check_response(response).await
}

/// Turn a non-2xx response into a classified error.
pub(crate) async fn check_response(response: Response) -> Result<(), DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let header_wait = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    let body_wait = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| retry_after_from_body(&v));

    Err(DeliveryError::from_status(status.as_u16(), &body)
        .with_retry_after(header_wait.or(body_wait)))
}

/// Map a client-side failure.
pub(crate) fn from_reqwest(error: reqwest::Error) -> DeliveryError {
    if error.is_timeout() {
        DeliveryError::new(
            crate::delivery::ErrorCode::Timeout,
            error.to_string(),
            true,
        )
    } else if error.is_builder() {
        DeliveryError::invalid_payload(error.to_string())
    } else {
        DeliveryError::network(error.to_string())
    }
}

/// `Retry-After` in seconds (integer or fractional).
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

/// Discord (`retry_after`) and Telegram (`parameters.retry_after`) report
/// the wait in the response body.
fn retry_after_from_body(body: &Value) -> Option<Duration> {
    let secs = body
        .get("parameters")
        .and_then(|p| p.get("retry_after"))
        .or_else(|| body.get("retry_after"))
        .and_then(Value::as_f64)?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}
