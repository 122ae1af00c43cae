//! swapsite core library: domain types and layered settings.
//!
//! Public API surface:
//! - [`types`]: slots, fingerprints, source kinds
//! - [`settings`]: load / merge / validate YAML settings
//! - [`error`]: [`ConfigError`]

pub mod error;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use settings::Settings;
pub use types::{Fingerprint, Fingerprints, Slot, SourceKind};
