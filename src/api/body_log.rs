//! Logging of submitted form bodies.
//!
//! Events go to the `bodies` target, which `main` routes to a daily file
//! when `logging.body_log_dir` is configured.

use axum::{
    body::{self, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, Method},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

/// Largest form body accepted
pub const MAX_FORM_BYTES: usize = 64 * 1024;

fn is_form_post(request: &Request) -> bool {
    request.method() == Method::POST
        && request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.starts_with("application/x-www-form-urlencoded"))
}

pub async fn log_form_bodies(request: Request, next: Next) -> Result<Response, AppError> {
    if !is_form_post(&request) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Unreadable form body: {}", e)))?;
    if !bytes.is_empty() {
        tracing::info!(
            target: "bodies",
            path = %parts.uri.path(),
            body = %String::from_utf8_lossy(&bytes),
            "Form submitted"
        );
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
