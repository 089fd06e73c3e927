//! Equipment item definitions

use crate::types::{EquipmentSlot, OnHitEffect, Rarity, StatKey, UnlockRequirement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A purchasable, equippable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: String,
    pub name: String,
    pub slot: EquipmentSlot,
    /// Raw stat deltas before the rarity multiplier
    #[serde(default)]
    pub base_stats: BTreeMap<StatKey, f64>,
    #[serde(default)]
    pub rarity: Rarity,
    /// Gold cost in the shop (0 = free starter item)
    #[serde(default)]
    pub cost: u64,
    /// Status effects this item can apply on a landed hit
    #[serde(default)]
    pub on_hit_effects: Vec<OnHitEffect>,
    /// Extra gate on top of the gold cost, if any
    #[serde(default)]
    pub unlock: Option<UnlockRequirement>,
}

impl EquipmentItem {
    /// Stat deltas after the rarity multiplier.
    ///
    /// Integer base stats stay integers after scaling; fractional bases are
    /// rounded to 3 decimals. Results are never negative.
    pub fn scaled_stats(&self) -> BTreeMap<StatKey, f64> {
        let multiplier = self.rarity.multiplier();
        self.base_stats
            .iter()
            .map(|(stat, base)| {
                let base = if base.is_finite() { *base } else { 0.0 };
                let scaled = (base * multiplier).max(0.0);
                let rounded = if base.fract() == 0.0 {
                    scaled.round()
                } else {
                    (scaled * 1000.0).round() / 1000.0
                };
                (*stat, rounded)
            })
            .collect()
    }

    /// Delta for a single stat after rarity scaling (0 if absent)
    pub fn stat_delta(&self, stat: StatKey) -> f64 {
        self.scaled_stats().get(&stat).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon(rarity: Rarity, min_hit: f64) -> EquipmentItem {
        EquipmentItem {
            id: "w_test".to_string(),
            name: "Test Blade".to_string(),
            slot: EquipmentSlot::Weapon,
            base_stats: BTreeMap::from([(StatKey::MinHit, min_hit)]),
            rarity,
            cost: 0,
            on_hit_effects: Vec::new(),
            unlock: None,
        }
    }

    #[test]
    fn test_legendary_doubles_integer_stats() {
        let item = weapon(Rarity::Legendary, 10.0);
        assert!((item.stat_delta(StatKey::MinHit) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_integer_base_rounds_to_integer() {
        // 1.1x on an integer base must still produce an integer
        let item = weapon(Rarity::Uncommon, 5.0);
        let scaled = item.stat_delta(StatKey::MinHit);
        assert!((scaled - scaled.round()).abs() < f64::EPSILON);
        assert!((scaled - 6.0).abs() < f64::EPSILON); // 5.5 rounds to 6
    }

    #[test]
    fn test_fractional_base_rounds_to_three_decimals() {
        let item = weapon(Rarity::Rare, 0.005);
        assert!((item.stat_delta(StatKey::MinHit) - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_missing_stat_is_zero() {
        let item = weapon(Rarity::Common, 2.0);
        assert_eq!(item.stat_delta(StatKey::Evasion), 0.0);
    }
}
