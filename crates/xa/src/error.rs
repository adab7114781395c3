//! XA error mapping.
//!
//! Callers always see one exception family: every failure, whether a local
//! precondition violation, a host-reported return code, or an unexpected
//! local error, surfaces as an [`XaError`] carrying an XA error code. The
//! original error is preserved as the source where one exists.

use thiserror::Error;

use crate::flags::{is_rollback_code, XAER_INVAL, XAER_PROTO, XAER_RMERR, XAER_RMFAIL};

/// Result type alias for resource adapter operations
pub type XaResult<T> = std::result::Result<T, XaError>;

/// Distributed-transaction failure with an XA error code.
#[derive(Debug, Error)]
#[error("{detail} (xa code {code})")]
pub struct XaError {
    code: i32,
    detail: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl XaError {
    /// Build an error from an explicit XA code.
    pub fn new(code: i32, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            source: None,
        }
    }

    /// `XAER_PROTO`: call issued in an improper context.
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(XAER_PROTO, detail)
    }

    /// `XAER_INVAL`: invalid arguments.
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::new(XAER_INVAL, detail)
    }

    /// `XAER_RMFAIL`: uniform wrap for unexpected local failures, keeping
    /// the original error as the cause.
    pub fn rm_failure(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            code: XAER_RMFAIL,
            detail: "resource manager failure".to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// Map a nonzero host return code to the matching error.
    ///
    /// Known XA codes (rollback reasons, `XAER_*`) pass through unchanged;
    /// anything else becomes a generic `XAER_RMERR`.
    pub fn from_return_code(return_code: i32) -> Self {
        if return_code < 0 || is_rollback_code(return_code) {
            Self::new(
                return_code,
                format!("host reported xa return code {}", return_code),
            )
        } else {
            Self::new(
                XAER_RMERR,
                format!("host reported unexpected return code {}", return_code),
            )
        }
    }

    /// Map a reply's error-class/return-code pair, if it signals failure.
    ///
    /// Error class 9 carries an XA code directly in the return code; any
    /// other nonzero class is a generic resource-manager failure. Class 0
    /// is success (`None`), with `XA_RDONLY` treated as a success-shaped
    /// return code the caller inspects itself.
    pub fn from_reply(error_class: u16, return_code: i32) -> Option<Self> {
        match error_class {
            0 => None,
            9 => Some(Self::from_return_code(return_code)),
            class => Some(Self::new(
                XAER_RMFAIL,
                format!(
                    "host error class {} with return code {}",
                    class, return_code
                ),
            )),
        }
    }

    /// The XA error code.
    pub fn code(&self) -> i32 {
        self.code
    }
}
