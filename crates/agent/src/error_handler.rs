use domainctx_core::Error;
use std::fmt;
use tracing::error;

const CDP_ERROR_PATTERNS: &[&str] = &[
    "frame with the given frameid is not found",
    "cdp",
    "frameid",
    "cdp requests failed",
    "ax_tree",
];

const BROWSER_ERROR_PATTERNS: &[&str] = &[
    "no valid agent focus available",
    "failed to open new tab - no browser is open",
    "browser is in an unstable state",
];

/// Where a context update failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperation {
    Exit,
    Refresh,
    TrackStep,
    FinalizeJudge,
}

impl fmt::Display for UpdateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateOperation::Exit => "exit",
            UpdateOperation::Refresh => "refresh",
            UpdateOperation::TrackStep => "track_step",
            UpdateOperation::FinalizeJudge => "finalize_judge",
        };
        write!(f, "{}", s)
    }
}

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    let lower = message.to_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

pub fn is_cdp_error(message: &str) -> bool {
    matches_any(message, CDP_ERROR_PATTERNS)
}

pub fn is_browser_error(message: &str) -> bool {
    matches_any(message, BROWSER_ERROR_PATTERNS)
}

/// Known, recoverable browser-side failures.
pub fn is_expected_error(message: &str) -> bool {
    is_cdp_error(message) || is_browser_error(message)
}

/// Receives failures the tracker swallows. `domain` is empty when no domain
/// was involved.
pub trait UpdateErrorHandler: Send + Sync {
    fn report(&self, error: &Error, domain: &str, operation: UpdateOperation);
}

/// Logs every failure at error level. With `suppress_expected`, expected
/// browser errors are logged without their debug detail.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler {
    suppress_expected: bool,
}

impl LoggingErrorHandler {
    pub fn new(suppress_expected: bool) -> Self {
        Self { suppress_expected }
    }
}

impl UpdateErrorHandler for LoggingErrorHandler {
    fn report(&self, err: &Error, domain: &str, operation: UpdateOperation) {
        let message = err.to_string();
        if self.suppress_expected && is_expected_error(&message) {
            error!(operation = %operation, domain = %domain, error = %message, "Context update failed");
        } else {
            error!(
                operation = %operation,
                domain = %domain,
                error = %message,
                detail = ?err,
                "Context update failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(is_cdp_error("Frame with the given frameId is not found."));
        assert!(is_cdp_error("AX_TREE unavailable"));
        assert!(is_browser_error("No valid agent focus available"));
        assert!(is_expected_error("Browser is in an unstable state, retry"));
        assert!(!is_expected_error("API error 429: rate limited"));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(UpdateOperation::Exit.to_string(), "exit");
        assert_eq!(UpdateOperation::Refresh.to_string(), "refresh");
        assert_eq!(UpdateOperation::TrackStep.to_string(), "track_step");
        assert_eq!(UpdateOperation::FinalizeJudge.to_string(), "finalize_judge");
    }
}
