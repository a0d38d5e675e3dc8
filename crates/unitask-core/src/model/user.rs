use serde::{Deserialize, Serialize};

/// Ceiling for lifetime XP. SQLite integers are signed 64-bit, so totals
/// saturate here on every backend.
pub const MAX_TOTAL_XP: u64 = i64::MAX as u64;

/// A student profile shown on the leaderboard.
///
/// `total_xp` is lifetime XP and never drops when the incremental reward state
/// levels up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub total_xp: u64,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            total_xp: 0,
        }
    }
}
