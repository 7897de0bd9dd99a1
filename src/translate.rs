//! Translation of internal failures into user-facing errors.
//!
//! A pure mapping from the crate [`Error`] (plus its attempt diagnostics)
//! to a stable `{category, message, retry_suggested}` structure suitable for
//! direct display. Internal detail — provider bodies, attempt logs, stack
//! traces — never crosses this boundary.

use crate::error::Error;
use crate::failure::FailureKind;
use serde::Serialize;
use std::fmt;

/// Stable, display-oriented error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The provider chain is saturated or briefly failing.
    ServiceUnavailable,
    /// Credentials are missing, expired, or wrong.
    Auth,
    /// The submitted request is malformed and will fail on every model.
    InvalidRequest,
    /// Anything that should not have reached the user.
    Internal,
}

/// Error structure intended for direct display. Every category carries an
/// actionable hint.
#[derive(Debug, Clone, Serialize)]
pub struct UserFacingError {
    pub category: ErrorCategory,
    pub message: String,
    pub retry_suggested: bool,
}

impl fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Maps an internal error to its user-facing form.
pub fn translate(error: &Error) -> UserFacingError {
    match error {
        Error::Call(call) => match call.kind {
            FailureKind::AuthFailed => UserFacingError {
                category: ErrorCategory::Auth,
                message: "The AI service rejected our credentials. Please check that your \
                          API key is valid and has not expired."
                    .into(),
                retry_suggested: false,
            },
            FailureKind::InvalidRequest => UserFacingError {
                category: ErrorCategory::InvalidRequest,
                message: "The request could not be processed. Please try again with a \
                          shorter or simpler input."
                    .into(),
                retry_suggested: false,
            },
            // Transient kinds are consumed by the retry loop; reaching here
            // means something upstream misbehaved.
            _ => internal(),
        },
        Error::Exhausted { terminal, .. } => {
            let message = match terminal {
                FailureKind::RateLimited => {
                    "Our AI service is experiencing high demand. Please retry shortly."
                }
                FailureKind::Timeout => {
                    "The AI service took too long to respond. Please try again, \
                     possibly with a shorter input."
                }
                _ => "The AI service is temporarily unavailable. Please try again later.",
            };
            UserFacingError {
                category: ErrorCategory::ServiceUnavailable,
                message: message.into(),
                retry_suggested: true,
            }
        }
        Error::CacheRead(_) | Error::CacheWrite(_) | Error::Configuration(_) => internal(),
    }
}

fn internal() -> UserFacingError {
    UserFacingError {
        category: ErrorCategory::Internal,
        message: "An unexpected error occurred. Please try again.".into(),
        retry_suggested: true,
    }
}
