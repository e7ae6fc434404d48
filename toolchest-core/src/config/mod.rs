//! Provisioning configuration.
//!
//! Settings are plain values with defaults, optionally loaded from a JSON file.

mod settings;

pub use settings::{ProvisionConfig, DEFAULT_MAX_CONCURRENCY};
