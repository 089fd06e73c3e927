//! XP, levels, and the gold balance
//!
//! XP grants cascade: one large grant and many small grants crossing the
//! same thresholds land on the same level and leftover XP. Every level-up
//! fully heals the player and re-checks unlock gates.

use crate::event::{EngineEvent, EventSink};
use crate::state::GameState;
use crate::{skills, unlocks};
use content_core::{ContentRegistry, Tuning};

/// XP needed to go from `level` to `level + 1`
pub fn xp_required(tuning: &Tuning, level: u32) -> i64 {
    let required = tuning.xp_base * tuning.xp_growth.powi(level as i32);
    if required.is_finite() {
        required.floor().max(1.0) as i64
    } else {
        i64::MAX
    }
}

/// Grant XP, resolving every level-up it pays for
pub fn add_xp(state: &mut GameState, content: &ContentRegistry, amount: i64, sink: &mut EventSink) {
    let amount = amount.max(0);
    if amount == 0 {
        return;
    }
    state.player.xp = state.player.xp.saturating_add(amount);
    unlocks::record_xp_earned(state, content, amount, sink);

    loop {
        let required = xp_required(&content.tuning, state.player.level);
        if state.player.xp < required {
            break;
        }
        state.player.xp -= required;
        state.player.level += 1;

        let level = state.player.level;
        state.player.current_hp = crate::stats::player_max_hp(state, content);
        state.add_log(format!("Level up! You are now level {level}."));
        sink.push(EngineEvent::LevelUp { level });
        tracing::debug!(level, "player leveled up");

        unlocks::record_level(state, content, sink);
        unlocks::check_enemy_unlocks(state, content, sink);
        skills::check_skill_unlocks(state, content, sink);
    }
}

/// Grant gold and track it against gold-earned achievements
pub fn add_gold(
    state: &mut GameState,
    content: &ContentRegistry,
    amount: i64,
    sink: &mut EventSink,
) {
    let amount = amount.max(0);
    if amount == 0 {
        return;
    }
    state.player.gold = state.player.gold.saturating_add(amount);
    unlocks::record_gold_earned(state, content, amount, sink);
}

/// Deduct gold if the balance covers it. The balance never goes negative.
pub fn spend_gold(state: &mut GameState, amount: i64) -> bool {
    let amount = amount.max(0);
    if state.player.gold < amount {
        return false;
    }
    state.player.gold -= amount;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSink;

    fn fixture() -> (ContentRegistry, GameState, EventSink) {
        let content = ContentRegistry::builtin();
        let state = GameState::new(&content);
        (content, state, EventSink::new())
    }

    #[test]
    fn test_xp_curve() {
        let tuning = Tuning::default();
        // floor(100 * 1.15^level)
        assert_eq!(xp_required(&tuning, 1), 114);
        assert_eq!(xp_required(&tuning, 2), 132);
        assert_eq!(xp_required(&tuning, 10), 404);
    }

    #[test]
    fn test_exact_threshold_levels_once() {
        let (content, mut state, mut sink) = fixture();
        let required = xp_required(&content.tuning, 1);
        add_xp(&mut state, &content, required, &mut sink);
        assert_eq!(state.player.level, 2);
        assert_eq!(state.player.xp, 0);
    }

    #[test]
    fn test_large_grant_cascades() {
        let (content, mut state, mut sink) = fixture();
        let to_two = xp_required(&content.tuning, 1);
        let to_three = xp_required(&content.tuning, 2);
        add_xp(&mut state, &content, to_two + to_three + 7, &mut sink);
        assert_eq!(state.player.level, 3);
        assert_eq!(state.player.xp, 7);
    }

    #[test]
    fn test_split_grants_match_one_big_grant() {
        let (content, mut state_a, mut sink) = fixture();
        let mut state_b = GameState::new(&content);
        add_xp(&mut state_a, &content, 1000, &mut sink);
        for _ in 0..10 {
            add_xp(&mut state_b, &content, 100, &mut sink);
        }
        assert_eq!(state_a.player.level, state_b.player.level);
        assert_eq!(state_a.player.xp, state_b.player.xp);
    }

    #[test]
    fn test_level_up_fully_heals() {
        let (content, mut state, mut sink) = fixture();
        state.player.current_hp = 1.0;
        add_xp(&mut state, &content, xp_required(&content.tuning, 1), &mut sink);
        // Level 2 max HP is 105
        assert_eq!(state.player.current_hp, 105.0);
    }

    #[test]
    fn test_spend_gold_rejects_overdraft() {
        let (content, mut state, _) = fixture();
        let _ = &content;
        state.player.gold = 50;
        assert!(!spend_gold(&mut state, 51));
        assert_eq!(state.player.gold, 50);
        assert!(spend_gold(&mut state, 50));
        assert_eq!(state.player.gold, 0);
    }
}
