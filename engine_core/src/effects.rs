//! Status effect engine
//!
//! Effects live as [`EffectInstance`] lists on each combatant. Reapplying
//! an active effect refreshes it (remaining and intensity both take the
//! max of old and new) rather than stacking a second instance. Periodic
//! actions run off a per-instance accumulator, so one large time delta
//! pays out every owed tick.

use crate::event::{EngineEvent, EventSink, FloatingText};
use crate::state::GameState;
use crate::types::{safe_f64, EffectInstance, Side, Stats, MIN_EFFECT_INTENSITY};
use content_core::{ContentRegistry, EffectDefinition, PeriodicAction};

/// Slack absorbing float drift from summing many small tick deltas
const TIMER_EPSILON: f64 = 1e-9;

/// Per-application overrides from on-hit entries and skills
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub duration: Option<f64>,
    pub intensity: Option<f64>,
    pub source: Option<String>,
}

pub fn has_effect(effects: &[EffectInstance], effect_id: &str) -> bool {
    effects.iter().any(|instance| instance.effect_id == effect_id)
}

/// Apply or refresh an effect on one side. Returns false for unknown ids.
pub fn apply_effect(
    state: &mut GameState,
    content: &ContentRegistry,
    side: Side,
    effect_id: &str,
    options: ApplyOptions,
    sink: &mut EventSink,
) -> bool {
    let Some(definition) = content.effect(effect_id) else {
        return false;
    };

    let duration = safe_f64(options.duration.unwrap_or(definition.duration), 0.0).max(0.0);
    let intensity = safe_f64(options.intensity.unwrap_or(1.0), 1.0).max(MIN_EFFECT_INTENSITY);
    if duration <= 0.0 {
        return false;
    }

    let effects = state.effects_mut(side);
    let refreshed = if let Some(existing) = effects
        .iter_mut()
        .find(|instance| instance.effect_id == effect_id)
    {
        // Refresh, never stack: both timer and intensity take the max
        existing.remaining = existing.remaining.max(duration);
        existing.duration = existing.duration.max(duration);
        existing.intensity = existing.intensity.max(intensity);
        true
    } else {
        effects.push(EffectInstance::new(
            effect_id,
            duration,
            intensity,
            options.source,
        ));
        false
    };

    sink.push(EngineEvent::EffectApplied {
        side,
        effect_id: effect_id.to_string(),
        refreshed,
    });
    if !refreshed {
        state.add_log(format!("{} gained {}.", side.label(), definition.name));
    }
    true
}

/// Advance every live effect on both sides by `delta_seconds`.
///
/// Runs owed periodic actions, decrements timers, and drops expired
/// instances. HP can reach 0 here; the combat loop checks for deaths right
/// after calling this.
pub fn update_effects(
    state: &mut GameState,
    content: &ContentRegistry,
    delta_seconds: f64,
    sink: &mut EventSink,
) {
    for side in [Side::Player, Side::Enemy] {
        update_side(state, content, side, delta_seconds, sink);
    }
}

fn update_side(
    state: &mut GameState,
    content: &ContentRegistry,
    side: Side,
    delta_seconds: f64,
    sink: &mut EventSink,
) {
    if state.effects(side).is_empty() {
        return;
    }
    let max_hp = crate::stats::max_hp(state, content, side);

    // Take the list out so periodic actions can mutate HP on the same state
    let mut effects = std::mem::take(state.effects_mut(side));

    for instance in effects.iter_mut() {
        let Some(definition) = content.effect(&instance.effect_id) else {
            instance.remaining = 0.0;
            continue;
        };

        // Only time inside the effect's lifetime feeds the accumulator, so
        // one huge delta cannot pay out more ticks than the effect owns
        let consumed = delta_seconds.min(instance.remaining.max(0.0));
        instance.remaining -= delta_seconds;

        if definition.has_periodic_tick() {
            instance.tick_accumulator += consumed;
            while instance.tick_accumulator + TIMER_EPSILON >= definition.tick_interval {
                instance.tick_accumulator -= definition.tick_interval;
                run_periodic(state, definition, instance.intensity, side, max_hp, sink);
            }
        }
    }

    effects.retain(|instance| {
        if instance.remaining > TIMER_EPSILON {
            true
        } else {
            sink.push(EngineEvent::EffectExpired {
                side,
                effect_id: instance.effect_id.clone(),
            });
            false
        }
    });

    *state.effects_mut(side) = effects;
}

fn run_periodic(
    state: &mut GameState,
    definition: &EffectDefinition,
    intensity: f64,
    side: Side,
    max_hp: f64,
    sink: &mut EventSink,
) {
    match &definition.periodic {
        Some(PeriodicAction::Damage { amount }) => {
            let damage = (amount * intensity).floor().max(1.0);
            let hp = (state.current_hp(side) - damage).max(0.0);
            state.set_current_hp(side, hp);
            sink.push(EngineEvent::FloatingText {
                side,
                text: FloatingText::Damage {
                    amount: damage as i64,
                },
            });
        }
        Some(PeriodicAction::Heal { amount }) => {
            let heal = (amount * intensity).floor().max(1.0);
            let hp = (state.current_hp(side) + heal).min(max_hp);
            state.set_current_hp(side, hp);
            sink.push(EngineEvent::FloatingText {
                side,
                text: FloatingText::Heal { amount: heal as i64 },
            });
        }
        None => {}
    }
}

/// Fold every live effect's stat modifiers into a snapshot, insertion order
pub fn apply_stat_modifiers(
    effects: &[EffectInstance],
    content: &ContentRegistry,
    stats: &mut Stats,
) {
    let min_interval = content.tuning.min_attack_interval_ms;
    for instance in effects {
        if let Some(definition) = content.effect(&instance.effect_id) {
            for modifier in &definition.modifiers {
                stats.apply_modifier(modifier, min_interval);
            }
        }
    }
}

/// Drop every effect on one side without expiry events (death, respawn,
/// target swap)
pub fn clear_effects(state: &mut GameState, side: Side) {
    state.effects_mut(side).clear();
}
