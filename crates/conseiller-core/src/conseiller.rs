//! Counselor profile settings that drive notifications.

use serde::{Deserialize, Serialize};

/// Per-counselor preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConseillerPreferences {
    /// Play a sound when a beneficiary sends a new message.
    pub notifications_sonores: bool,
}

impl Default for ConseillerPreferences {
    fn default() -> Self {
        Self {
            notifications_sonores: true,
        }
    }
}
