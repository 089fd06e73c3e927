//! Status effect definitions
//!
//! Effects are fully declarative: a list of stat modifiers applied while the
//! effect is active, plus an optional periodic action (damage or heal) fired
//! every `tick_interval` seconds. Periodic and durational concerns are kept
//! separate so a 1-second poison tick and a 6-second buff can share a
//! timeline without coupling cadence to duration.

use crate::types::StatKey;
use serde::{Deserialize, Serialize};

/// Whether an effect helps or harms its bearer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Buff,
    Debuff,
}

/// A declarative stat modification: `value = max(0, value * scale + add)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKey,
    #[serde(default)]
    pub add: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Action fired once per full tick interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodicAction {
    /// Deal `amount * intensity` damage (floored, minimum 1)
    Damage { amount: f64 },
    /// Restore `amount * intensity` HP (floored, minimum 1), capped at max HP
    Heal { amount: f64 },
}

/// Static definition of a timed buff or debuff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: String,
    pub name: String,
    pub kind: EffectKind,
    /// Default duration in seconds
    pub duration: f64,
    /// Seconds between periodic actions; 0 = no periodic tick
    #[serde(default)]
    pub tick_interval: f64,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    #[serde(default)]
    pub periodic: Option<PeriodicAction>,
    #[serde(default)]
    pub description: String,
}

impl EffectDefinition {
    /// Whether this effect does anything on a periodic tick
    pub fn has_periodic_tick(&self) -> bool {
        self.tick_interval > 0.0 && self.periodic.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_effect_toml() {
        let effect: EffectDefinition = toml::from_str(
            r#"
id = "poison"
name = "Poison"
kind = "debuff"
duration = 6.0
tick_interval = 1.0
periodic = { kind = "damage", amount = 2.0 }
"#,
        )
        .unwrap();
        assert!(effect.has_periodic_tick());
        assert_eq!(effect.periodic, Some(PeriodicAction::Damage { amount: 2.0 }));
        assert!(effect.modifiers.is_empty());
    }

    #[test]
    fn test_parse_stat_modifier_defaults() {
        let modifier: StatModifier = toml::from_str(
            r#"
stat = "accuracy"
add = 20.0
"#,
        )
        .unwrap();
        assert!((modifier.scale - 1.0).abs() < f64::EPSILON);
        assert!((modifier.add - 20.0).abs() < f64::EPSILON);
    }
}
