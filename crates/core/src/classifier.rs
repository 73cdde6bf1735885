//! Failure signal classification (PRD-3).
//!
//! Every failed generation attempt produces a raw signal string (API error
//! body, transport error text, or producer-reported failure reason). This
//! module maps that signal onto a closed [`ErrorCategory`] that drives the
//! retry engine: retry, fail over, or abandon the scene outright.

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Closed classification of a failure signal.
///
/// Derived deterministically from the signal text alone; never inferred
/// from scene content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The producer reported an exhausted generation quota.
    QuotaExceeded,
    /// Credential rejection or an explicit content-policy/safety block.
    PermissionDenied,
    /// Transport-level failure: network, connection, or timeout.
    NetworkError,
    /// Producer-side surface noise: missing element, intercepted click,
    /// failed upload. Always worth retrying.
    TransientUi,
    /// Unrecognized signal. Treated as retryable (most real causes are
    /// transient).
    Unknown,
}

impl ErrorCategory {
    /// Stable snake_case identifier for logs and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TransientUi => "transient_ui",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// A fatal category abandons the scene immediately: no retry, no
    /// failover. Only [`ErrorCategory::PermissionDenied`] is fatal; policy
    /// and safety blocks classify into it.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCategory::PermissionDenied)
    }

    /// Inverse of [`ErrorCategory::is_fatal`].
    pub fn is_retryable(self) -> bool {
        !self.is_fatal()
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Classify a raw failure signal into an [`ErrorCategory`].
///
/// Matching is substring-based against the lower-cased signal, in priority
/// order. Unambiguous policy phrases ("content policy", "safety filter",
/// "inappropriate") rank with "permission denied"; the short markers
/// ("blocked", "not allowed") are checked after the UI and network
/// patterns, so producer noise like "click blocked by overlay" stays
/// retryable.
pub fn classify(signal: &str) -> ErrorCategory {
    let s = signal.to_lowercase();

    if s.contains("quota") {
        ErrorCategory::QuotaExceeded
    } else if s.contains("permission denied")
        || s.contains("content policy")
        || s.contains("safety filter")
        || s.contains("inappropriate")
    {
        ErrorCategory::PermissionDenied
    } else if s.contains("click intercepted") || s.contains("overlay") {
        ErrorCategory::TransientUi
    } else if s.contains("network") || s.contains("timeout") || s.contains("connection") {
        ErrorCategory::NetworkError
    } else if s.contains("no such element") || s.contains("not found") {
        ErrorCategory::TransientUi
    } else if s.contains("upload") && (s.contains("fail") || s.contains("error")) {
        ErrorCategory::TransientUi
    } else if s.contains("not allowed") || s.contains("blocked") {
        ErrorCategory::PermissionDenied
    } else {
        ErrorCategory::Unknown
    }
}
