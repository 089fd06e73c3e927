//! Skill definitions
//!
//! Active skills are auto-used by the combat loop and run on cooldowns;
//! passive skills are always-on hooks the exchange pipeline consults.
//! Behaviors are declarative so the engine owns all the combat math.

use crate::types::{StatKey, UnlockRequirement};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Active,
    Passive,
}

/// What a skill does when used (active) or consulted (passive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillBehavior {
    // === Active behaviors ===
    /// Emergency heal: restore a fraction of max HP (minimum 1)
    Heal { percent_max_hp: f64 },
    /// Self-buff: apply a status effect to the player
    ApplyEffect { effect_id: String },
    /// Queue a one-shot next-hit buff: `floor(damage * multiplier + flat_bonus)`
    PendingStrike { multiplier: f64, flat_bonus: f64 },

    // === Passive behaviors ===
    /// Chance to multiply outgoing damage
    CritChance { chance: f64, multiplier: f64 },
    /// Bonus damage when the defender is below an HP-ratio threshold
    ExecuteBonus { threshold_ratio: f64, multiplier: f64 },
    /// Chance to heal a fraction of damage dealt, after the hit lands
    LifeSteal { chance: f64, percent: f64 },
    /// Chance to return a fraction of incoming damage to the attacker
    Counter { chance: f64, percent: f64 },
    /// Always-on flat stat bonus on the player's side of the exchange
    FlatStat { stat: StatKey, amount: f64 },
}

/// Static definition of a learnable skill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    /// Cooldown in seconds; meaningful for active skills only
    #[serde(default)]
    pub cooldown: f64,
    pub behavior: SkillBehavior,
    /// Skills without a requirement are learned from the start
    #[serde(default)]
    pub unlock: Option<UnlockRequirement>,
    #[serde(default)]
    pub description: String,
}

impl SkillDefinition {
    pub fn is_active(&self) -> bool {
        self.kind == SkillKind::Active
    }

    pub fn is_passive(&self) -> bool {
        self.kind == SkillKind::Passive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_active_skill() {
        let skill: SkillDefinition = toml::from_str(
            r#"
id = "power_strike"
name = "Power Strike"
kind = "active"
cooldown = 8.0
behavior = { type = "pending_strike", multiplier = 1.75, flat_bonus = 5.0 }
"#,
        )
        .unwrap();
        assert!(skill.is_active());
        assert_eq!(
            skill.behavior,
            SkillBehavior::PendingStrike {
                multiplier: 1.75,
                flat_bonus: 5.0
            }
        );
    }

    #[test]
    fn test_parse_passive_with_unlock() {
        let skill: SkillDefinition = toml::from_str(
            r#"
id = "counter_strike"
name = "Counter Strike"
kind = "passive"
behavior = { type = "counter", chance = 0.18, percent = 0.45 }
unlock = { type = "level", value = 7 }
"#,
        )
        .unwrap();
        assert!(skill.is_passive());
        assert_eq!(skill.unlock, Some(UnlockRequirement::Level { value: 7 }));
    }
}
