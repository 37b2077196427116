//! User notifications
//!
//! Every failure is surfaced exactly once, at the operation that issued the
//! request, through a [`Notifier`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Operation failed
    Error,
    /// Operation failed and cleanup failed too
    Warning,
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub severity: Severity,
    /// Message text
    pub message: String,
    /// Extra guidance supplied by the server
    pub helper: Option<String>,
}

impl Notice {
    /// Create error notice
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            helper: None,
        }
    }

    /// Create warning notice
    #[inline]
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            helper: None,
        }
    }

    /// With helper text
    #[inline]
    #[must_use]
    pub fn with_helper(mut self, helper: Option<String>) -> Self {
        self.helper = helper;
        self
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(helper) = &self.helper {
            write!(f, "\n\n{helper}")?;
        }
        Ok(())
    }
}

/// Sink for user-facing notices
pub trait Notifier: Send + Sync {
    /// Show a notice
    fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Error => tracing::error!(helper = ?notice.helper, "{}", notice.message),
            Severity::Warning => tracing::warn!(helper = ?notice.helper, "{}", notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_follows_message() {
        let notice = Notice::error("Report failed").with_helper(Some("Pick a region".into()));
        assert_eq!(notice.to_string(), "Report failed\n\nPick a region");
        assert_eq!(Notice::warning("x").to_string(), "x");
    }
}
