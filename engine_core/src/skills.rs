//! Skill engine
//!
//! Active skills are fired by the combat loop just before the player's
//! attack: an emergency heal tier, then self-buffs, then queued strikes,
//! each scanning skills in declaration order. Passive skills are consulted
//! by the exchange pipeline at fixed points. Enemies have no skills.

use crate::effects::{self, ApplyOptions};
use crate::event::{EngineEvent, EventSink, FloatingText, PassiveOutcome};
use crate::progression;
use crate::state::{GameState, PendingStrike};
use crate::types::{Side, Stats};
use crate::unlocks;
use content_core::{ContentRegistry, SkillBehavior, SkillDefinition, UnlockRequirement};
use rand::Rng;

pub fn is_learned(state: &GameState, skill_id: &str) -> bool {
    state
        .player
        .learned_skills
        .get(skill_id)
        .copied()
        .unwrap_or(false)
}

/// Ready to fire: learned, active, and off cooldown
pub fn is_available(state: &GameState, skill: &SkillDefinition) -> bool {
    skill.is_active()
        && is_learned(state, &skill.id)
        && state
            .skills
            .cooldowns
            .get(&skill.id)
            .copied()
            .unwrap_or(0.0)
            <= 0.0
}

/// Tick every running cooldown down by `delta_seconds`
pub fn reduce_cooldowns(state: &mut GameState, delta_seconds: f64) {
    for remaining in state.skills.cooldowns.values_mut() {
        *remaining = (*remaining - delta_seconds).max(0.0);
    }
}

/// Fire one active skill. Returns false when the skill is unknown, passive,
/// unlearned, on cooldown, or would be wasted (a strike already queued).
pub fn use_skill(
    state: &mut GameState,
    content: &ContentRegistry,
    skill_id: &str,
    sink: &mut EventSink,
) -> bool {
    let Some(skill) = content.skill(skill_id) else {
        return false;
    };
    if !is_available(state, skill) {
        return false;
    }

    let fired = match &skill.behavior {
        SkillBehavior::Heal { percent_max_hp } => {
            let max_hp = crate::stats::player_max_hp(state, content);
            let heal = (max_hp * percent_max_hp).floor().max(1.0);
            let healed = (state.player.current_hp + heal).min(max_hp);
            if healed > state.player.current_hp {
                state.player.current_hp = healed;
                sink.push(EngineEvent::FloatingText {
                    side: Side::Player,
                    text: FloatingText::Heal { amount: heal as i64 },
                });
                true
            } else {
                false
            }
        }
        SkillBehavior::ApplyEffect { effect_id } => effects::apply_effect(
            state,
            content,
            Side::Player,
            effect_id,
            ApplyOptions {
                source: Some(skill.id.clone()),
                ..ApplyOptions::default()
            },
            sink,
        ),
        SkillBehavior::PendingStrike {
            multiplier,
            flat_bonus,
        } => {
            let already_queued = state
                .skills
                .pending_strikes
                .iter()
                .any(|strike| strike.skill_id == skill.id);
            if already_queued {
                false
            } else {
                state.skills.pending_strikes.push(PendingStrike {
                    skill_id: skill.id.clone(),
                    multiplier: *multiplier,
                    flat_bonus: *flat_bonus,
                });
                true
            }
        }
        // Passives are never fired
        _ => false,
    };

    if fired {
        state
            .skills
            .cooldowns
            .insert(skill.id.clone(), skill.cooldown.max(0.0));
        state.add_log(format!("You use {}.", skill.name));
        sink.push(EngineEvent::SkillUsed {
            skill_id: skill.id.clone(),
        });
    }
    fired
}

/// The combat loop's skill pass, run before each player attack.
///
/// Heals fire only under the emergency HP threshold; buffs only when their
/// effect is down; strikes only when none is queued for that skill. Within
/// each tier, declaration order decides priority.
pub fn auto_use_skills(state: &mut GameState, content: &ContentRegistry, sink: &mut EventSink) {
    let max_hp = crate::stats::player_max_hp(state, content);
    let hp_ratio = if max_hp > 0.0 {
        state.player.current_hp / max_hp
    } else {
        1.0
    };

    let skill_ids: Vec<String> = content
        .skills()
        .iter()
        .map(|skill| skill.id.clone())
        .collect();

    // Tier 1: emergency heal
    if hp_ratio <= content.tuning.emergency_heal_hp_ratio {
        for skill_id in &skill_ids {
            let Some(skill) = content.skill(skill_id) else { continue };
            if matches!(skill.behavior, SkillBehavior::Heal { .. }) && is_available(state, skill) {
                use_skill(state, content, skill_id, sink);
            }
        }
    }

    // Tier 2: self-buffs whose effect is not already up
    for skill_id in &skill_ids {
        let Some(skill) = content.skill(skill_id) else { continue };
        if let SkillBehavior::ApplyEffect { effect_id } = &skill.behavior {
            if is_available(state, skill)
                && !effects::has_effect(&state.player.active_effects, effect_id)
            {
                use_skill(state, content, skill_id, sink);
            }
        }
    }

    // Tier 3: queue strikes
    for skill_id in &skill_ids {
        let Some(skill) = content.skill(skill_id) else { continue };
        if matches!(skill.behavior, SkillBehavior::PendingStrike { .. })
            && is_available(state, skill)
        {
            use_skill(state, content, skill_id, sink);
        }
    }
}

/// Fold always-on flat stat passives into the player's exchange snapshot
pub fn apply_passive_flat_stats(
    state: &GameState,
    content: &ContentRegistry,
    player_stats: &mut Stats,
) {
    for skill in content.skills() {
        if !is_learned(state, &skill.id) {
            continue;
        }
        if let SkillBehavior::FlatStat { stat, amount } = &skill.behavior {
            player_stats.set(*stat, (player_stats.get(*stat) + amount).max(0.0));
        }
    }
}

/// Consume every queued strike against one landed player hit, oldest first
pub fn consume_pending_strikes(
    state: &mut GameState,
    content: &ContentRegistry,
    mut damage: f64,
) -> f64 {
    let strikes = std::mem::take(&mut state.skills.pending_strikes);
    for strike in strikes {
        damage = (damage * strike.multiplier + strike.flat_bonus).floor().max(1.0);
        let name = content
            .skill(&strike.skill_id)
            .map(|skill| skill.name.as_str())
            .unwrap_or(strike.skill_id.as_str());
        state.add_log(format!("{name} empowers your attack!"));
    }
    damage
}

/// Roll crit and execute passives against one outgoing player hit
pub fn passive_damage_bonus(
    state: &GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    defender_hp_ratio: f64,
    mut damage: f64,
    sink: &mut EventSink,
) -> f64 {
    for skill in content.skills() {
        if !is_learned(state, &skill.id) {
            continue;
        }
        match &skill.behavior {
            SkillBehavior::CritChance { chance, multiplier } => {
                if rng.gen::<f64>() < *chance {
                    damage = (damage * multiplier).floor().max(1.0);
                    sink.push(EngineEvent::PassiveTriggered {
                        skill_id: skill.id.clone(),
                        outcome: PassiveOutcome::CriticalHit {
                            damage: damage as i64,
                        },
                    });
                }
            }
            SkillBehavior::ExecuteBonus {
                threshold_ratio,
                multiplier,
            } => {
                if defender_hp_ratio <= *threshold_ratio {
                    damage = (damage * multiplier).floor().max(1.0);
                    sink.push(EngineEvent::PassiveTriggered {
                        skill_id: skill.id.clone(),
                        outcome: PassiveOutcome::ExecuteBonus {
                            damage: damage as i64,
                        },
                    });
                }
            }
            _ => {}
        }
    }
    damage
}

/// Life-steal roll after a player hit lands; heals in place
pub fn lifesteal_after_hit(
    state: &mut GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    damage_dealt: f64,
    sink: &mut EventSink,
) {
    let max_hp = crate::stats::player_max_hp(state, content);
    for skill in content.skills() {
        if !is_learned(state, &skill.id) {
            continue;
        }
        if let SkillBehavior::LifeSteal { chance, percent } = &skill.behavior {
            if rng.gen::<f64>() < *chance {
                let heal = (damage_dealt * percent).floor().max(1.0);
                let healed = (state.player.current_hp + heal).min(max_hp);
                if healed > state.player.current_hp {
                    state.player.current_hp = healed;
                    sink.push(EngineEvent::PassiveTriggered {
                        skill_id: skill.id.clone(),
                        outcome: PassiveOutcome::LifeSteal {
                            healed: heal as i64,
                        },
                    });
                }
            }
        }
    }
}

/// Counter roll after the player takes a hit. Returns damage to reflect at
/// the attacker; the exchange applies it so death ordering stays there.
pub fn counter_damage(
    state: &GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    incoming_damage: f64,
    sink: &mut EventSink,
) -> f64 {
    let mut total = 0.0;
    for skill in content.skills() {
        if !is_learned(state, &skill.id) {
            continue;
        }
        if let SkillBehavior::Counter { chance, percent } = &skill.behavior {
            if rng.gen::<f64>() < *chance {
                let reflected = (incoming_damage * percent).floor().max(1.0);
                total += reflected;
                sink.push(EngineEvent::PassiveTriggered {
                    skill_id: skill.id.clone(),
                    outcome: PassiveOutcome::CounterAttack {
                        damage: reflected as i64,
                    },
                });
            }
        }
    }
    total
}

/// Learn every gated skill whose requirement is now met. Shop-gated skills
/// only ever unlock through [`purchase_skill`]. Learned skills never
/// re-lock.
pub fn check_skill_unlocks(
    state: &mut GameState,
    content: &ContentRegistry,
    sink: &mut EventSink,
) -> Vec<String> {
    let mut newly_learned = Vec::new();
    for skill in content.skills() {
        if is_learned(state, &skill.id) {
            continue;
        }
        let met = match &skill.unlock {
            None => true,
            Some(UnlockRequirement::Shop { .. }) => false,
            Some(requirement) => unlocks::requirement_met(state, requirement),
        };
        if met {
            newly_learned.push(skill.id.clone());
        }
    }
    for skill_id in &newly_learned {
        state.player.learned_skills.insert(skill_id.clone(), true);
        if let Some(skill) = content.skill(skill_id) {
            state.add_log(format!("New skill learned: {}!", skill.name));
        }
    }
    if !newly_learned.is_empty() {
        sink.push(EngineEvent::SkillsLearned {
            skill_ids: newly_learned.clone(),
        });
    }
    newly_learned
}

/// Buy a shop-gated skill. Fails without deducting when the skill is
/// unknown, not shop-gated, already learned, or unaffordable.
pub fn purchase_skill(
    state: &mut GameState,
    content: &ContentRegistry,
    skill_id: &str,
    sink: &mut EventSink,
) -> bool {
    let Some(skill) = content.skill(skill_id) else {
        return false;
    };
    let Some(UnlockRequirement::Shop { gold_cost }) = &skill.unlock else {
        return false;
    };
    if is_learned(state, skill_id) {
        return false;
    }
    if !progression::spend_gold(state, *gold_cost as i64) {
        return false;
    }
    state.player.learned_skills.insert(skill.id.clone(), true);
    state.add_log(format!("New skill learned: {}!", skill.name));
    sink.push(EngineEvent::SkillsLearned {
        skill_ids: vec![skill.id.clone()],
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> (ContentRegistry, GameState, EventSink) {
        let content = ContentRegistry::builtin();
        let state = GameState::new(&content);
        (content, state, EventSink::new())
    }

    #[test]
    fn test_use_unlearned_skill_fails() {
        let (content, mut state, mut sink) = fixture();
        assert!(!is_learned(&state, "battle_focus"));
        assert!(!use_skill(&mut state, &content, "battle_focus", &mut sink));
    }

    #[test]
    fn test_heal_skill_respects_cooldown() {
        let (content, mut state, mut sink) = fixture();
        state.player.current_hp = 10.0;
        assert!(use_skill(&mut state, &content, "second_wind", &mut sink));
        // 25% of 100 max HP
        assert_eq!(state.player.current_hp, 35.0);
        state.player.current_hp = 10.0;
        assert!(!use_skill(&mut state, &content, "second_wind", &mut sink));
        reduce_cooldowns(&mut state, 15.0);
        assert!(use_skill(&mut state, &content, "second_wind", &mut sink));
    }

    #[test]
    fn test_pending_strike_never_double_queues() {
        let (content, mut state, mut sink) = fixture();
        assert!(use_skill(&mut state, &content, "power_strike", &mut sink));
        reduce_cooldowns(&mut state, 10.0);
        assert!(!use_skill(&mut state, &content, "power_strike", &mut sink));
        assert_eq!(state.skills.pending_strikes.len(), 1);
    }

    #[test]
    fn test_consume_pending_strike_math() {
        let (content, mut state, mut sink) = fixture();
        use_skill(&mut state, &content, "power_strike", &mut sink);
        let damage = consume_pending_strikes(&mut state, &content, 10.0);
        // floor(10 * 1.75 + 5)
        assert_eq!(damage, 22.0);
        assert!(state.skills.pending_strikes.is_empty());
        // The empowerment line lands in the capped log exactly once
        let empowered = state
            .log
            .iter()
            .filter(|line| line.contains("empowers your attack"))
            .count();
        assert_eq!(empowered, 1);
    }

    #[test]
    fn test_auto_use_heals_only_when_low() {
        let (content, mut state, mut sink) = fixture();
        auto_use_skills(&mut state, &content, &mut sink);
        assert_eq!(state.player.current_hp, 100.0);
        assert_eq!(
            state.skills.cooldowns.get("second_wind").copied().unwrap_or(0.0),
            0.0
        );

        state.player.current_hp = 30.0; // under the 35% threshold
        auto_use_skills(&mut state, &content, &mut sink);
        assert_eq!(state.player.current_hp, 55.0);
    }

    #[test]
    fn test_auto_use_queues_strike_and_skips_duplicates() {
        let (content, mut state, mut sink) = fixture();
        auto_use_skills(&mut state, &content, &mut sink);
        assert_eq!(state.skills.pending_strikes.len(), 1);
        reduce_cooldowns(&mut state, 20.0);
        auto_use_skills(&mut state, &content, &mut sink);
        assert_eq!(state.skills.pending_strikes.len(), 1);
    }

    #[test]
    fn test_flat_stat_passive_applies_when_learned() {
        let (content, mut state, _) = fixture();
        let mut stats = crate::stats::player_base_stats(&state, &content);
        let base_evasion = stats.evasion;
        apply_passive_flat_stats(&state, &content, &mut stats);
        // evasive_instinct is gate-free, so it is learned from the start
        assert_eq!(stats.evasion, base_evasion + 12.0);

        state.player.learned_skills.insert("evasive_instinct".to_string(), false);
        let mut stats = crate::stats::player_base_stats(&state, &content);
        apply_passive_flat_stats(&state, &content, &mut stats);
        assert_eq!(stats.evasion, base_evasion);
    }

    #[test]
    fn test_execute_bonus_below_threshold() {
        let (content, mut state, mut sink) = fixture();
        state.player.learned_skills.insert("executioner".to_string(), true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let boosted = passive_damage_bonus(&state, &content, &mut rng, 0.2, 100.0, &mut sink);
        assert_eq!(boosted, 130.0);
        let flat = passive_damage_bonus(&state, &content, &mut rng, 0.9, 100.0, &mut sink);
        assert_eq!(flat, 100.0);
    }

    #[test]
    fn test_lifesteal_heals_and_caps() {
        let (content, mut state, mut sink) = fixture();
        state.player.learned_skills.insert("vampiric_strikes".to_string(), true);
        state.player.current_hp = 50.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // 100% proc chance, 12% of 100 damage
        lifesteal_after_hit(&mut state, &content, &mut rng, 100.0, &mut sink);
        assert_eq!(state.player.current_hp, 62.0);
        state.player.current_hp = 99.5;
        lifesteal_after_hit(&mut state, &content, &mut rng, 100.0, &mut sink);
        assert_eq!(state.player.current_hp, 100.0);
    }

    #[test]
    fn test_level_gate_unlocks_and_never_relocks() {
        let (content, mut state, mut sink) = fixture();
        state.player.level = 5;
        let learned = check_skill_unlocks(&mut state, &content, &mut sink);
        assert!(learned.contains(&"battle_focus".to_string()));
        assert!(learned.contains(&"critical_mastery".to_string()));
        // Shop-gated skills stay locked regardless of progress
        assert!(!is_learned(&state, "retaliation_guard"));

        state.player.level = 1;
        let again = check_skill_unlocks(&mut state, &content, &mut sink);
        assert!(again.is_empty());
        assert!(is_learned(&state, "critical_mastery"));
    }

    #[test]
    fn test_purchase_skill_spends_gold_once() {
        let (content, mut state, mut sink) = fixture();
        state.player.gold = 500;
        assert!(purchase_skill(&mut state, &content, "retaliation_guard", &mut sink));
        assert_eq!(state.player.gold, 100);
        assert!(is_learned(&state, "retaliation_guard"));
        assert!(!purchase_skill(&mut state, &content, "retaliation_guard", &mut sink));
        assert_eq!(state.player.gold, 100);
    }

    #[test]
    fn test_purchase_rejects_unaffordable() {
        let (content, mut state, mut sink) = fixture();
        state.player.gold = 10;
        assert!(!purchase_skill(&mut state, &content, "retaliation_guard", &mut sink));
        assert_eq!(state.player.gold, 10);
    }
}
