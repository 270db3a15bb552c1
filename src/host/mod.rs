//! Host backends and upgrade configuration.
//!
//! The dispatcher is backend-neutral; a [`HostAdapter`] supplies the upgrade
//! for one concrete server and a [`HostProfile`] records, as data, which
//! [`UpgradeOptions`] it honors natively, which the session driver emulates,
//! and which are ignored.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UpgradeOptions`] | Per-connection options |
//! | [`HostAdapter`] | Upgrade strategy trait |
//! | [`HostProfile`] | Option support table and protocol automation flags |
//! | [`TungsteniteHost`] | Bundled `tokio-tungstenite` backend |

// ============================================================================
// Submodules
// ============================================================================

/// Adapter trait and host profiles.
pub mod adapter;

/// Upgrade options.
pub mod options;

/// `tokio-tungstenite` backend.
pub mod tungstenite;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{HostAdapter, HostProfile, Support};
pub use options::{DEFAULT_TIMEOUT_MS, OptionKey, UpgradeOptions};
pub use tungstenite::{TUNGSTENITE_PROFILE, TungsteniteHost};
