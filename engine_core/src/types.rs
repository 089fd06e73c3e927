//! Core runtime types shared across the engine

use content_core::{StatKey, StatModifier};
use serde::{Deserialize, Serialize};

/// Which side of the exchange a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    /// Display label for combat log lines
    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "You",
            Side::Enemy => "Enemy",
        }
    }
}

/// A resolved stat snapshot for one combatant.
///
/// Snapshots are throwaway values: the engine recomputes them from base
/// templates plus modifiers whenever it needs effective numbers, so nothing
/// here is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: f64,
    pub min_hit: f64,
    pub max_hit: f64,
    pub accuracy: f64,
    pub evasion: f64,
    pub damage_reduction: f64,
    pub attack_interval_ms: f64,
}

impl Stats {
    pub fn get(&self, stat: StatKey) -> f64 {
        match stat {
            StatKey::Hp => self.hp,
            StatKey::MinHit => self.min_hit,
            StatKey::MaxHit => self.max_hit,
            StatKey::Accuracy => self.accuracy,
            StatKey::Evasion => self.evasion,
            StatKey::DamageReduction => self.damage_reduction,
            StatKey::AttackInterval => self.attack_interval_ms,
        }
    }

    pub fn set(&mut self, stat: StatKey, value: f64) {
        match stat {
            StatKey::Hp => self.hp = value,
            StatKey::MinHit => self.min_hit = value,
            StatKey::MaxHit => self.max_hit = value,
            StatKey::Accuracy => self.accuracy = value,
            StatKey::Evasion => self.evasion = value,
            StatKey::DamageReduction => self.damage_reduction = value,
            StatKey::AttackInterval => self.attack_interval_ms = value,
        }
    }

    /// Apply a declarative modifier: `value = max(0, value * scale + add)`.
    ///
    /// Attack-interval reductions are floored at `min_interval_ms` so stacked
    /// haste cannot collapse the attack timer.
    pub fn apply_modifier(&mut self, modifier: &StatModifier, min_interval_ms: f64) {
        let current = self.get(modifier.stat);
        let scale = safe_f64(modifier.scale, 1.0);
        let add = safe_f64(modifier.add, 0.0);
        let mut next = (current * scale + add).max(0.0);
        if modifier.stat == StatKey::AttackInterval {
            next = next.max(min_interval_ms);
        }
        self.set(modifier.stat, next);
    }

    /// Clamp every field to a finite, non-negative value. Accuracy and
    /// evasion stay unbounded above (the hit formula normalizes them);
    /// damage reduction is capped at 100%.
    pub fn sanitize(&mut self) {
        self.hp = safe_f64(self.hp, 1.0).max(1.0);
        self.min_hit = safe_f64(self.min_hit, 0.0).max(0.0);
        self.max_hit = safe_f64(self.max_hit, 0.0).max(self.min_hit);
        self.accuracy = safe_f64(self.accuracy, 0.0).max(0.0);
        self.evasion = safe_f64(self.evasion, 0.0).max(0.0);
        self.damage_reduction = safe_f64(self.damage_reduction, 0.0).clamp(0.0, 100.0);
        self.attack_interval_ms = safe_f64(self.attack_interval_ms, 1000.0).max(1.0);
    }
}

/// A live status effect on one combatant.
///
/// `remaining` counts down in real seconds; `tick_accumulator` gathers
/// elapsed time between periodic actions so slow update cadences still fire
/// every owed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    pub effect_id: String,
    /// Total duration this application was granted
    pub duration: f64,
    /// Seconds left before expiry
    pub remaining: f64,
    /// Scales periodic damage and healing; floored at 0.1
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default)]
    pub tick_accumulator: f64,
    /// What applied the effect (skill id, item id, enemy id), for logs
    #[serde(default)]
    pub source: Option<String>,
}

fn default_intensity() -> f64 {
    1.0
}

impl EffectInstance {
    pub fn new(effect_id: &str, duration: f64, intensity: f64, source: Option<String>) -> Self {
        let duration = safe_f64(duration, 0.0).max(0.0);
        EffectInstance {
            effect_id: effect_id.to_string(),
            duration,
            remaining: duration,
            intensity: safe_f64(intensity, 1.0).max(MIN_EFFECT_INTENSITY),
            tick_accumulator: 0.0,
            source,
        }
    }

    /// Repair a deserialized instance in place
    pub fn sanitize(&mut self) {
        self.duration = safe_f64(self.duration, 0.0).max(0.0);
        self.remaining = safe_f64(self.remaining, 0.0).clamp(0.0, self.duration);
        self.intensity = safe_f64(self.intensity, 1.0).max(MIN_EFFECT_INTENSITY);
        self.tick_accumulator = safe_f64(self.tick_accumulator, 0.0).max(0.0);
    }
}

/// Intensity floor for live effects
pub const MIN_EFFECT_INTENSITY: f64 = 0.1;

/// Coerce a possibly hostile number to a finite value
pub fn safe_f64(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Coerce to a finite non-negative integer count
pub fn safe_count(value: i64) -> i64 {
    value.max(0)
}
