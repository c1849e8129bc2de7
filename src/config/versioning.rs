//! Lifecycle engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_CASCADE_DEPTH: usize = 10;
const MAX_UID_PADDING: usize = 12;

/// Versioning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VersioningConfig {
    /// How many dependency levels a template approval cascades through
    #[serde(default = "default_cascade_max_depth")]
    pub cascade_max_depth: usize,

    /// Digits in the numeric part of generated uids
    #[serde(default = "default_uid_padding")]
    pub uid_padding: usize,

    /// How long to wait for a scope lock before failing with a conflict
    #[serde(default = "default_scope_lock_timeout")]
    pub scope_lock_timeout_ms: u64,
}

impl VersioningConfig {
    pub fn scope_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.scope_lock_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cascade_max_depth == 0 || self.cascade_max_depth > MAX_CASCADE_DEPTH {
            return Err(ValidationError::InvalidCascadeDepth {
                max: MAX_CASCADE_DEPTH,
            });
        }
        if self.uid_padding == 0 || self.uid_padding > MAX_UID_PADDING {
            return Err(ValidationError::InvalidUidPadding {
                max: MAX_UID_PADDING,
            });
        }
        if self.scope_lock_timeout_ms == 0 {
            return Err(ValidationError::InvalidLockTimeout);
        }
        Ok(())
    }
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            cascade_max_depth: default_cascade_max_depth(),
            uid_padding: default_uid_padding(),
            scope_lock_timeout_ms: default_scope_lock_timeout(),
        }
    }
}

fn default_cascade_max_depth() -> usize {
    2
}

fn default_uid_padding() -> usize {
    6
}

fn default_scope_lock_timeout() -> u64 {
    5_000
}
