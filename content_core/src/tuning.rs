//! Tunable game constants

use serde::{Deserialize, Serialize};

/// Per-level stat growth applied to the player's base template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelGrowth {
    #[serde(default = "default_growth_hp")]
    pub max_hp: f64,
    #[serde(default = "default_growth_damage")]
    pub damage: f64,
    #[serde(default = "default_growth_ratio")]
    pub accuracy: f64,
    #[serde(default = "default_growth_ratio")]
    pub evasion: f64,
}

impl Default for LevelGrowth {
    fn default() -> Self {
        LevelGrowth {
            max_hp: 5.0,
            damage: 1.0,
            accuracy: 0.005,
            evasion: 0.005,
        }
    }
}

fn default_growth_hp() -> f64 {
    5.0
}
fn default_growth_damage() -> f64 {
    1.0
}
fn default_growth_ratio() -> f64 {
    0.005
}

/// Player base stats before level growth and equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBase {
    #[serde(default = "default_player_hp")]
    pub hp: f64,
    #[serde(default = "default_player_min_hit")]
    pub min_hit: f64,
    #[serde(default = "default_player_max_hit")]
    pub max_hit: f64,
    #[serde(default = "default_player_interval")]
    pub attack_interval_ms: f64,
    #[serde(default = "default_player_accuracy")]
    pub accuracy: f64,
    #[serde(default = "default_player_evasion")]
    pub evasion: f64,
    #[serde(default)]
    pub damage_reduction: f64,
}

impl Default for PlayerBase {
    fn default() -> Self {
        PlayerBase {
            hp: 100.0,
            min_hit: 5.0,
            max_hit: 10.0,
            attack_interval_ms: 2000.0,
            accuracy: 50.0,
            evasion: 10.0,
            damage_reduction: 0.0,
        }
    }
}

fn default_player_hp() -> f64 {
    100.0
}
fn default_player_min_hit() -> f64 {
    5.0
}
fn default_player_max_hit() -> f64 {
    10.0
}
fn default_player_interval() -> f64 {
    2000.0
}
fn default_player_accuracy() -> f64 {
    50.0
}
fn default_player_evasion() -> f64 {
    10.0
}

/// Tunable game constants, TOML-overridable field by field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Simulated milliseconds per combat tick
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    /// Visual respawn delay after a death
    #[serde(default = "default_respawn_time")]
    pub respawn_time_ms: u64,
    /// Offline catch-up window cap
    #[serde(default = "default_max_offline_hours")]
    pub max_offline_hours: f64,
    /// Haste effects cannot shorten an attack interval below this
    #[serde(default = "default_min_interval")]
    pub min_attack_interval_ms: f64,
    #[serde(default = "default_xp_base")]
    pub xp_base: f64,
    #[serde(default = "default_xp_growth")]
    pub xp_growth: f64,
    #[serde(default = "default_gold_per_level")]
    pub gold_per_enemy_level: u64,
    /// Enemy scaling: factor gained per player level above the enemy's base
    #[serde(default = "default_scaling_per_level")]
    pub enemy_scaling_per_level: f64,
    /// Enemy scaling cap
    #[serde(default = "default_scaling_cap")]
    pub enemy_scaling_cap: f64,
    /// HP ratio at or below which the emergency heal auto-fires
    #[serde(default = "default_emergency_heal_ratio")]
    pub emergency_heal_hp_ratio: f64,
    #[serde(default)]
    pub level_growth: LevelGrowth,
    #[serde(default)]
    pub player_base: PlayerBase,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            tick_rate_ms: 100,
            respawn_time_ms: 1200,
            max_offline_hours: 8.0,
            min_attack_interval_ms: 250.0,
            xp_base: 100.0,
            xp_growth: 1.15,
            gold_per_enemy_level: 5,
            enemy_scaling_per_level: 0.03,
            enemy_scaling_cap: 0.45,
            emergency_heal_hp_ratio: 0.35,
            level_growth: LevelGrowth::default(),
            player_base: PlayerBase::default(),
        }
    }
}

impl Tuning {
    /// Ticks the respawn lockout lasts
    pub fn respawn_ticks(&self) -> u32 {
        (self.respawn_time_ms / self.tick_rate_ms.max(1)) as u32
    }

    /// Tick length in seconds
    pub fn tick_seconds(&self) -> f64 {
        self.tick_rate_ms as f64 / 1000.0
    }
}

fn default_tick_rate() -> u64 {
    100
}
fn default_respawn_time() -> u64 {
    1200
}
fn default_max_offline_hours() -> f64 {
    8.0
}
fn default_min_interval() -> f64 {
    250.0
}
fn default_xp_base() -> f64 {
    100.0
}
fn default_xp_growth() -> f64 {
    1.15
}
fn default_gold_per_level() -> u64 {
    5
}
fn default_scaling_per_level() -> f64 {
    0.03
}
fn default_scaling_cap() -> f64 {
    0.45
}
fn default_emergency_heal_ratio() -> f64 {
    0.35
}
