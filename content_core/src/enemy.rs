//! Enemy template definitions

use crate::types::{OnHitEffect, UnlockRequirement};
use serde::{Deserialize, Serialize};

/// Static enemy template. Runtime instances live in the engine's game state;
/// templates are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub hp: f64,
    pub min_hit: f64,
    pub max_hit: f64,
    pub attack_interval_ms: f64,
    pub accuracy: f64,
    pub evasion: f64,
    #[serde(default)]
    pub damage_reduction: f64,
    #[serde(default)]
    pub on_hit_effects: Vec<OnHitEffect>,
    #[serde(default)]
    pub unlock: Option<UnlockRequirement>,
}

impl EnemyTemplate {
    /// XP granted when this enemy is defeated (before mission multipliers)
    pub fn defeat_xp(&self) -> u64 {
        u64::from(self.level.max(1)) * 10
    }

    /// Gold granted when this enemy is defeated (before mission multipliers)
    pub fn defeat_gold(&self, gold_per_level: u64) -> u64 {
        u64::from(self.level.max(1)) * gold_per_level
    }
}
