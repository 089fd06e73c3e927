//! Achievement definitions

use serde::{Deserialize, Serialize};

/// What an achievement measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementMetric {
    /// Total enemies defeated
    Kills,
    /// Highest player level reached
    Level,
    /// Total gold earned (not current balance)
    GoldEarned,
    /// Total XP earned
    XpEarned,
    /// Total seconds played
    TimePlayed,
}

/// Reward paid out when an achievement unlocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementReward {
    Gold { amount: u64 },
    Xp { amount: u64 },
    /// Unlocks a shop item without payment
    Equipment { item_id: String },
}

/// Static achievement definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric: AchievementMetric,
    pub target: u64,
    #[serde(default)]
    pub reward: Option<AchievementReward>,
}
