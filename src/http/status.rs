//! Maps transport failures onto [`RecipeError::Network`] with a readable cause.

use reqwest::StatusCode;

use crate::error::RecipeError;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("verapp-recipe/", env!("CARGO_PKG_VERSION"));

fn describe_status(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown");
    match status {
        StatusCode::NOT_FOUND => {
            format!(
                "HTTP {} {}. Check that the version tag exists upstream.",
                status.as_u16(),
                reason
            )
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            format!(
                "HTTP {} {}. The server refused or rate limited the request.",
                status.as_u16(),
                reason
            )
        }
        s => format!("HTTP {} {}", s.as_u16(), reason),
    }
}

/// Classifies a reqwest error raised while downloading `url`.
///
/// Every failure is reported once: there is no retry.
pub fn classify_error(url: &str, error: &reqwest::Error) -> RecipeError {
    let message = if let Some(status) = error.status() {
        describe_status(status)
    } else if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    RecipeError::network(url, message)
}
