//! Mission definitions

use crate::types::{StatKey, UnlockRequirement};
use serde::{Deserialize, Serialize};

/// A mission-scoped adjustment active while the mission runs.
///
/// For stat modifiers, `|value| <= 1` is treated as a percentage of the
/// current stat and larger magnitudes as a flat delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AreaModifier {
    PlayerStat { stat: StatKey, value: f64 },
    EnemyStat { stat: StatKey, value: f64 },
    XpMultiplier { value: f64 },
    GoldMultiplier { value: f64 },
}

/// Payout on mission completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionReward {
    /// Flat gold granted on completion
    #[serde(default)]
    pub gold: u64,
    /// Bonus XP as a fraction of the XP banked during the run
    #[serde(default)]
    pub xp_bonus_percent: f64,
}

/// A multi-wave scripted encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub waves: u32,
    /// Enemy ids the waves draw from
    pub enemy_pool: Vec<String>,
    #[serde(default)]
    pub area_modifiers: Vec<AreaModifier>,
    #[serde(default)]
    pub reward: MissionReward,
    #[serde(default)]
    pub unlock: Option<UnlockRequirement>,
}

impl MissionDefinition {
    /// Wave count, floored at 1
    pub fn total_waves(&self) -> u32 {
        self.waves.max(1)
    }
}
