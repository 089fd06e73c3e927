//! Core types shared across content tables

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A combat-relevant stat addressed by name.
///
/// Used wherever content needs to point at a stat declaratively: item base
/// stats, status-effect modifiers, passive skills, mission area modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    Hp,
    MinHit,
    MaxHit,
    Accuracy,
    Evasion,
    DamageReduction,
    AttackInterval,
}

/// Equipment slot for gear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Charm,
}

impl EquipmentSlot {
    /// Get all equipment slots
    pub fn all() -> &'static [EquipmentSlot] {
        &[
            EquipmentSlot::Weapon,
            EquipmentSlot::Armor,
            EquipmentSlot::Charm,
        ]
    }
}

/// Item rarity. Scales an item's base stat deltas by a fixed multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Stat multiplier applied to an item's base stats
    pub fn multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.1,
            Rarity::Rare => 1.25,
            Rarity::Epic => 1.5,
            Rarity::Legendary => 2.0,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }
}

/// Weighted rarity roll table (common-heavy)
const RARITY_ROLL_TABLE: &[(Rarity, u32)] = &[
    (Rarity::Common, 50),
    (Rarity::Uncommon, 25),
    (Rarity::Rare, 15),
    (Rarity::Epic, 8),
    (Rarity::Legendary, 2),
];

/// Roll a random rarity from the weighted table
pub fn roll_rarity<R: Rng>(rng: &mut R) -> Rarity {
    let total: u32 = RARITY_ROLL_TABLE.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (rarity, weight) in RARITY_ROLL_TABLE {
        if roll < *weight {
            return *rarity;
        }
        roll -= weight;
    }
    Rarity::Common
}

/// Requirement gating an enemy, item, skill, or mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockRequirement {
    /// Reach a player level
    Level { value: u32 },
    /// Defeat a number of a specific enemy
    Kills { enemy_id: String, count: u32 },
    /// Unlock a specific achievement
    Achievement { id: String },
    /// Purchase for gold
    Shop { gold_cost: u64 },
}

impl UnlockRequirement {
    /// Human-readable requirement text for locked entries
    pub fn description(&self) -> String {
        match self {
            UnlockRequirement::Level { value } => format!("Reach Level {value}"),
            UnlockRequirement::Kills { enemy_id, count } => {
                format!("Defeat {count} {enemy_id} to unlock")
            }
            UnlockRequirement::Achievement { id } => format!("Earn achievement '{id}'"),
            UnlockRequirement::Shop { gold_cost } => format!("Purchase for {gold_cost} gold"),
        }
    }
}

/// A chance to apply a status effect when a hit lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnHitEffect {
    pub effect_id: String,
    /// Application probability in [0, 1]
    pub chance: f64,
    /// Overrides the effect definition's duration when set
    #[serde(default)]
    pub duration: Option<f64>,
    /// Overrides the default intensity of 1.0 when set
    #[serde(default)]
    pub intensity: Option<f64>,
}
