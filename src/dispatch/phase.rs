//! Connection lifecycle phases.

use std::fmt;

/// Lifecycle phase of a hosted connection.
///
/// ```text
/// Negotiating ──start──► Live ──stop/close/shutdown/timeout/error──► Closing ──► Terminated
///                         ▲ │
///                         └─┘ data, control, out-of-band
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Upgrade in progress, `init` not yet called.
    Negotiating,
    /// Dispatching events.
    Live,
    /// Termination reason decided, `terminate` running.
    Closing,
    /// `terminate` has returned. Final.
    Terminated,
}

impl Phase {
    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Negotiating => "negotiating",
            Self::Live => "live",
            Self::Closing => "closing",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
