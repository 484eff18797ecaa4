use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde_json::{json, Value};
use tracing::warn;

/// Body types the site accepts: HTML forms and the admin JSON API
const ACCEPTED_CONTENT_TYPES: [&str; 3] = [
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "application/json",
];

/// Limits enforced before a request reaches a handler
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_request_size: u64,
}

type Rejection = (StatusCode, Json<Value>);

fn rejection(status: StatusCode, error: &str, message: String) -> Rejection {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Reject oversized or oddly typed bodies up front
pub async fn request_validation_middleware(
    State(limits): State<RequestLimits>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Rejection> {
    validate_content_type(&request)?;
    validate_request_size(&request, limits.max_request_size)?;

    Ok(next.run(request).await)
}

/// Requests that carry a body must declare a form or JSON content type
fn validate_content_type(request: &Request<Body>) -> Result<(), Rejection> {
    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(());
    }

    let Some(content_type) = request.headers().get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = content_type.to_str().unwrap_or("");
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if ACCEPTED_CONTENT_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        warn!("Invalid content type: {}", content_type);
        Err(rejection(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type",
            format!("Content-Type must be one of {}", ACCEPTED_CONTENT_TYPES.join(", ")),
        ))
    }
}

fn validate_request_size(request: &Request<Body>, max_size: u64) -> Result<(), Rejection> {
    let length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    match length {
        Some(length) if length > max_size => {
            warn!("Request too large: {} bytes", length);
            Err(rejection(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request too large",
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_size
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}
