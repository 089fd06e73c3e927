//! Mission engine
//!
//! A mission is a run of waves drawn from an enemy pool, fought under
//! area modifiers. Kill rewards are banked during the run and paid out,
//! plus a completion bonus, only when the final wave falls. Dying or
//! abandoning forfeits the whole bank.

use crate::event::{EngineEvent, EventSink, MissionEndReason, MissionOutcome};
use crate::state::GameState;
use crate::types::{Side, Stats};
use crate::{progression, unlocks};
use content_core::{AreaModifier, ContentRegistry, MissionDefinition};
use rand::Rng;

/// What a mission did with a defeated wave enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionAdvance {
    /// No mission running; the caller pays rewards directly
    NotActive,
    /// Next wave spawned; the dead enemy was fully replaced
    WaveAdvanced,
    /// Final wave fell; bank and bonus paid out
    Completed,
}

pub fn is_unlocked(state: &GameState, mission: &MissionDefinition) -> bool {
    match &mission.unlock {
        None => true,
        Some(requirement) => unlocks::requirement_met(state, requirement),
    }
}

/// Begin a mission run. Fails when one is already running, the id is
/// unknown, or the gate is unmet.
pub fn start_mission(
    state: &mut GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    mission_id: &str,
    sink: &mut EventSink,
) -> bool {
    if state.mission.is_active() {
        return false;
    }
    let Some(mission) = content.mission(mission_id) else {
        return false;
    };
    if !is_unlocked(state, mission) {
        return false;
    }

    state.mission.current_mission_id = Some(mission.id.clone());
    state.mission.current_wave = 1;
    state.mission.banked_xp = 0;
    state.mission.banked_gold = 0;

    // The wave target fully replaces whatever was being fought
    state.respawn_ticks_remaining = 0;
    state.pending_respawn = None;
    spawn_wave_enemy(state, content, rng, mission_id);
    state.combat_active = true;

    state.add_log(format!("Mission started: {}!", mission.name));
    sink.push(EngineEvent::MissionStarted {
        mission_id: mission.id.clone(),
        total_waves: mission.total_waves(),
    });
    tracing::debug!(mission = %mission_id, "mission started");
    true
}

/// Pick a wave enemy from the pool and install it as the combat target,
/// scaled to the player's current level
fn spawn_wave_enemy(
    state: &mut GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    mission_id: &str,
) {
    let Some(mission) = content.mission(mission_id) else {
        return;
    };
    let enemy_id = mission.enemy_pool[rng.gen_range(0..mission.enemy_pool.len())].clone();
    let Some(template) = content.enemy(&enemy_id) else {
        return;
    };

    state.enemy.enemy_id = enemy_id;
    state.enemy.scaled_to_level = state.player.level;
    state.enemy.current_hp =
        crate::stats::scaled_enemy_hp(template, state.player.level, &content.tuning);
    state.enemy.tick_timer_ms = 0.0;
    state.enemy.active_effects.clear();
}

/// Bank a kill's rewards and advance the run
pub fn on_enemy_defeated(
    state: &mut GameState,
    content: &ContentRegistry,
    rng: &mut impl Rng,
    xp_gained: i64,
    gold_gained: i64,
    sink: &mut EventSink,
) -> MissionAdvance {
    let Some(mission_id) = state.mission.current_mission_id.clone() else {
        return MissionAdvance::NotActive;
    };
    let Some(mission) = content.mission(&mission_id) else {
        state.mission.clear_run();
        return MissionAdvance::NotActive;
    };

    state.mission.banked_xp = state.mission.banked_xp.saturating_add(xp_gained.max(0));
    state.mission.banked_gold = state.mission.banked_gold.saturating_add(gold_gained.max(0));

    let total = mission.total_waves();
    if state.mission.current_wave < total {
        state.mission.current_wave += 1;
        spawn_wave_enemy(state, content, rng, &mission_id);
        sink.push(EngineEvent::MissionWave {
            mission_id: mission_id.clone(),
            wave: state.mission.current_wave,
            total_waves: total,
        });
        state.add_log(format!(
            "Wave {} of {}!",
            state.mission.current_wave, total
        ));
        return MissionAdvance::WaveAdvanced;
    }

    complete_mission(state, content, sink);
    MissionAdvance::Completed
}

fn complete_mission(state: &mut GameState, content: &ContentRegistry, sink: &mut EventSink) {
    let Some(mission_id) = state.mission.current_mission_id.clone() else {
        return;
    };
    let Some(mission) = content.mission(&mission_id) else {
        state.mission.clear_run();
        return;
    };

    let banked_xp = state.mission.banked_xp;
    let bonus_xp = (banked_xp as f64 * mission.reward.xp_bonus_percent).floor() as i64;
    let xp_paid = banked_xp.saturating_add(bonus_xp.max(0));
    let gold_paid = state
        .mission
        .banked_gold
        .saturating_add(mission.reward.gold as i64);

    let outcome = MissionOutcome {
        mission_id: mission.id.clone(),
        reason: MissionEndReason::Completed,
        wave_reached: mission.total_waves(),
        total_waves: mission.total_waves(),
        xp_paid,
        gold_paid,
    };
    state.mission.clear_run();
    state.mission.last_outcome = Some(outcome.clone());

    state.add_log(format!("Mission complete: {}!", mission.name));
    progression::add_gold(state, content, gold_paid, sink);
    progression::add_xp(state, content, xp_paid, sink);
    sink.push(EngineEvent::MissionEnded(outcome));
    tracing::debug!(mission = %mission_id, gold_paid, xp_paid, "mission completed");
}

/// End the run without payout (player death or manual abandon). The banked
/// rewards are forfeited in full.
pub fn end_mission_unpaid(
    state: &mut GameState,
    content: &ContentRegistry,
    reason: MissionEndReason,
    sink: &mut EventSink,
) -> Option<MissionOutcome> {
    let mission_id = state.mission.current_mission_id.clone()?;
    let total_waves = content
        .mission(&mission_id)
        .map(|mission| mission.total_waves())
        .unwrap_or(1);

    let outcome = MissionOutcome {
        mission_id: mission_id.clone(),
        reason,
        wave_reached: state.mission.current_wave.max(1),
        total_waves,
        xp_paid: 0,
        gold_paid: 0,
    };
    state.mission.clear_run();
    state.mission.last_outcome = Some(outcome.clone());

    if reason == MissionEndReason::Failed {
        state.add_log("Mission failed!".to_string());
    } else {
        state.add_log("Mission abandoned.".to_string());
    }
    sink.push(EngineEvent::MissionEnded(outcome.clone()));
    tracing::debug!(mission = %mission_id, ?reason, "mission ended without payout");
    Some(outcome)
}

/// Fold the active mission's stat modifiers for one side into a snapshot.
///
/// `|value| <= 1` means a percentage of the current stat; larger magnitudes
/// are flat deltas. Integer-valued stats stay integers.
pub fn apply_area_modifiers(
    state: &GameState,
    content: &ContentRegistry,
    side: Side,
    stats: &mut Stats,
) {
    let Some(mission) = active_mission(state, content) else {
        return;
    };
    for modifier in &mission.area_modifiers {
        let (stat, value) = match (modifier, side) {
            (AreaModifier::PlayerStat { stat, value }, Side::Player) => (*stat, *value),
            (AreaModifier::EnemyStat { stat, value }, Side::Enemy) => (*stat, *value),
            _ => continue,
        };
        let current = stats.get(stat);
        let modified = if value.abs() <= 1.0 {
            current * (1.0 + value)
        } else {
            current + value
        };
        let modified = if current.fract() == 0.0 {
            modified.round()
        } else {
            modified
        };
        stats.set(stat, modified.max(0.0));
    }
}

/// XP and gold multipliers from the active mission's area modifiers.
/// Multiple bonuses on one mission layer additively, floored at zero.
pub fn reward_multipliers(state: &GameState, content: &ContentRegistry) -> (f64, f64) {
    let Some(mission) = active_mission(state, content) else {
        return (1.0, 1.0);
    };
    let mut xp_multiplier = 1.0;
    let mut gold_multiplier = 1.0;
    for modifier in &mission.area_modifiers {
        match modifier {
            AreaModifier::XpMultiplier { value } => xp_multiplier += value,
            AreaModifier::GoldMultiplier { value } => gold_multiplier += value,
            _ => {}
        }
    }
    (xp_multiplier.max(0.0), gold_multiplier.max(0.0))
}

fn active_mission<'a>(
    state: &GameState,
    content: &'a ContentRegistry,
) -> Option<&'a MissionDefinition> {
    let mission_id = state.mission.current_mission_id.as_deref()?;
    content.mission(mission_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> (ContentRegistry, GameState, EventSink, ChaCha8Rng) {
        let content = ContentRegistry::builtin();
        let state = GameState::new(&content);
        (content, state, EventSink::new(), ChaCha8Rng::seed_from_u64(9))
    }

    #[test]
    fn test_start_requires_unlock() {
        let (content, mut state, mut sink, mut rng) = fixture();
        assert!(!start_mission(&mut state, &content, &mut rng, "void_breach", &mut sink));
        assert!(start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink));
        assert_eq!(state.mission.current_wave, 1);
        assert!(state.combat_active);
        // Only one run at a time
        assert!(!start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink));
    }

    #[test]
    fn test_wave_enemy_comes_from_pool() {
        let (content, mut state, mut sink, mut rng) = fixture();
        start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink);
        let pool = &content.mission("training_patrol").unwrap().enemy_pool;
        assert!(pool.contains(&state.enemy.enemy_id));
        assert!(state.enemy.current_hp > 0.0);
    }

    #[test]
    fn test_full_run_pays_bank_plus_bonus() {
        let (content, mut state, mut sink, mut rng) = fixture();
        start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink);

        // Three waves, each banking 20 XP and 10 gold
        for _ in 0..2 {
            let advance =
                on_enemy_defeated(&mut state, &content, &mut rng, 20, 10, &mut sink);
            assert_eq!(advance, MissionAdvance::WaveAdvanced);
        }
        assert_eq!(state.player.gold, 0); // nothing paid mid-run

        let advance = on_enemy_defeated(&mut state, &content, &mut rng, 20, 10, &mut sink);
        assert_eq!(advance, MissionAdvance::Completed);

        // Gold: 30 banked + 60 completion. XP: 60 banked + floor(60 * 0.05)
        assert_eq!(state.player.gold, 90);
        let outcome = state.mission.last_outcome.clone().unwrap();
        assert_eq!(outcome.gold_paid, 90);
        assert_eq!(outcome.xp_paid, 63);
        assert!(outcome.completed());
        assert!(!state.mission.is_active());
    }

    #[test]
    fn test_failed_mission_pays_nothing() {
        let (content, mut state, mut sink, mut rng) = fixture();
        start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink);
        on_enemy_defeated(&mut state, &content, &mut rng, 20, 10, &mut sink);

        let outcome =
            end_mission_unpaid(&mut state, &content, MissionEndReason::Failed, &mut sink)
                .unwrap();
        assert_eq!(outcome.gold_paid, 0);
        assert_eq!(outcome.xp_paid, 0);
        assert_eq!(state.player.gold, 0);
        assert_eq!(state.player.xp, 0);
        assert!(state.mission.current_mission_id.is_none());
    }

    #[test]
    fn test_player_area_modifier_is_percentage() {
        let (content, mut state, mut sink, mut rng) = fixture();
        start_mission(&mut state, &content, &mut rng, "training_patrol", &mut sink);
        let mut stats = crate::stats::player_base_stats(&state, &content);
        let base_evasion = stats.evasion;
        apply_area_modifiers(&state, &content, Side::Player, &mut stats);
        // -5% evasion, rounded back to an integer
        assert_eq!(stats.evasion, (base_evasion * 0.95).round());
    }

    #[test]
    fn test_reward_multiplier_layers_additively() {
        let (content, mut state, _, _) = fixture();
        state.mission.current_mission_id = Some("void_breach".to_string());
        state.mission.current_wave = 1;
        let (xp_multiplier, gold_multiplier) = reward_multipliers(&state, &content);
        assert!((xp_multiplier - 1.1).abs() < 1e-9);
        assert!((gold_multiplier - 1.0).abs() < 1e-9);
    }
}
