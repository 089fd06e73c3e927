//! Core combat math
//!
//! Small pure functions the exchange pipeline composes. All damage is
//! integral: rolls are inclusive integer ranges and every multiplier is
//! floored, with a hard minimum of 1 once a hit lands.

use rand::Rng;

/// Chance for an attack to land: `accuracy / (accuracy + evasion)`.
///
/// A zero denominator (both sides at 0) yields 0 — an attacker with no
/// accuracy never hits, even an enemy with no evasion.
pub fn hit_chance(accuracy: f64, evasion: f64) -> f64 {
    let accuracy = accuracy.max(0.0);
    let evasion = evasion.max(0.0);
    let denominator = accuracy + evasion;
    if denominator <= 0.0 {
        0.0
    } else {
        accuracy / denominator
    }
}

/// Roll base damage uniformly from the inclusive `[min_hit, max_hit]` range
pub fn roll_damage<R: Rng>(rng: &mut R, min_hit: f64, max_hit: f64) -> f64 {
    let low = min_hit.floor().max(0.0) as i64;
    let high = (max_hit.floor() as i64).max(low);
    rng.gen_range(low..=high) as f64
}

/// Apply percentage damage reduction: `max(1, floor(damage * (1 - dr/100)))`
pub fn apply_damage_reduction(damage: f64, damage_reduction: f64) -> f64 {
    let reduction = damage_reduction.clamp(0.0, 100.0);
    (damage * (1.0 - reduction / 100.0)).floor().max(1.0)
}
