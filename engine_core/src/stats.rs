//! Stat resolution
//!
//! Stats are resolved fresh every time from static content plus current
//! state. The layering order is fixed: base template, level growth and
//! equipment (player) or level scaling (enemy), then passive skills, then
//! status effects, then mission area modifiers. Callers that only need
//! timers or max HP use the cheaper base forms.

use crate::state::GameState;
use crate::types::{Side, Stats};
use content_core::{ContentRegistry, EnemyTemplate, StatKey, Tuning};

/// Player stats from base template, level growth, and equipped gear.
///
/// HP and damage grow by flat per-level amounts; accuracy and evasion grow
/// by a small per-level ratio.
pub fn player_base_stats(state: &GameState, content: &ContentRegistry) -> Stats {
    let tuning = &content.tuning;
    let base = &tuning.player_base;
    let growth = &tuning.level_growth;
    let levels = f64::from(state.player.level.saturating_sub(1));

    let mut stats = Stats {
        hp: base.hp + levels * growth.max_hp,
        min_hit: base.min_hit + levels * growth.damage,
        max_hit: base.max_hit + levels * growth.damage,
        accuracy: base.accuracy * (1.0 + levels * growth.accuracy),
        evasion: base.evasion * (1.0 + levels * growth.evasion),
        damage_reduction: base.damage_reduction,
        attack_interval_ms: base.attack_interval_ms,
    };

    for item_id in state.player.equipment.ids() {
        if let Some(item) = content.item(item_id) {
            for (stat, delta) in item.scaled_stats() {
                match stat {
                    // Interval deltas from gear subtract (faster weapons)
                    StatKey::AttackInterval => stats.attack_interval_ms -= delta,
                    _ => stats.set(stat, stats.get(stat) + delta),
                }
            }
        }
    }

    stats.sanitize();
    stats
}

/// The player's maximum HP under current level and gear
pub fn player_max_hp(state: &GameState, content: &ContentRegistry) -> f64 {
    player_base_stats(state, content).hp
}

/// Scaling factor applied to an enemy fighting a higher-level player.
///
/// Grows per player level above the enemy's own, capped so high-level
/// grinding against weak enemies stays trivial rather than impossible.
pub fn enemy_scale_factor(template_level: u32, scaled_to_level: u32, tuning: &Tuning) -> f64 {
    let delta = f64::from(scaled_to_level.saturating_sub(template_level));
    1.0 + (delta * tuning.enemy_scaling_per_level).min(tuning.enemy_scaling_cap)
}

/// An enemy's maximum HP after level scaling
pub fn scaled_enemy_hp(template: &EnemyTemplate, scaled_to_level: u32, tuning: &Tuning) -> f64 {
    (template.hp * enemy_scale_factor(template.level, scaled_to_level, tuning)).floor()
}

/// Enemy stats from the template plus level scaling on HP and damage
pub fn enemy_base_stats(state: &GameState, content: &ContentRegistry) -> Stats {
    let Some(template) = content.enemy(&state.enemy.enemy_id) else {
        // normalize() keeps the id valid; a zeroed statline is inert if not
        let mut stats = Stats {
            hp: 1.0,
            min_hit: 0.0,
            max_hit: 0.0,
            accuracy: 0.0,
            evasion: 0.0,
            damage_reduction: 0.0,
            attack_interval_ms: 1000.0,
        };
        stats.sanitize();
        return stats;
    };

    let factor = enemy_scale_factor(template.level, state.enemy.scaled_to_level, &content.tuning);
    let mut stats = Stats {
        hp: (template.hp * factor).floor(),
        min_hit: (template.min_hit * factor).floor(),
        max_hit: (template.max_hit * factor).floor(),
        accuracy: template.accuracy.clamp(0.0, 100.0),
        evasion: template.evasion.clamp(0.0, 100.0),
        damage_reduction: template.damage_reduction,
        attack_interval_ms: template.attack_interval_ms,
    };
    stats.sanitize();
    stats
}

/// Stats with status effects and mission area modifiers folded in.
///
/// This is what attack timers run against. Exchange resolution layers
/// passive skill bonuses on top separately, before effects.
pub fn effective_stats(state: &GameState, content: &ContentRegistry, side: Side) -> Stats {
    let mut stats = match side {
        Side::Player => player_base_stats(state, content),
        Side::Enemy => enemy_base_stats(state, content),
    };
    crate::effects::apply_stat_modifiers(state.effects(side), content, &mut stats);
    crate::missions::apply_area_modifiers(state, content, side, &mut stats);
    stats.sanitize();
    stats
}

/// Max HP for either side, used to cap heals
pub fn max_hp(state: &GameState, content: &ContentRegistry, side: Side) -> f64 {
    match side {
        Side::Player => player_max_hp(state, content),
        Side::Enemy => content
            .enemy(&state.enemy.enemy_id)
            .map(|template| scaled_enemy_hp(template, state.enemy.scaled_to_level, &content.tuning))
            .unwrap_or(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (ContentRegistry, GameState) {
        let content = ContentRegistry::builtin();
        let state = GameState::new(&content);
        (content, state)
    }

    #[test]
    fn test_level_one_player_stats() {
        let (content, state) = fixture();
        let stats = player_base_stats(&state, &content);
        // Base 100 HP; starter weapon adds min 2 / max 5
        assert_eq!(stats.hp, 100.0);
        assert_eq!(stats.min_hit, 7.0);
        assert_eq!(stats.max_hit, 15.0);
        assert_eq!(stats.attack_interval_ms, 2000.0);
    }

    #[test]
    fn test_level_growth() {
        let (content, mut state) = fixture();
        state.player.level = 11;
        let stats = player_base_stats(&state, &content);
        assert_eq!(stats.hp, 150.0); // +5 HP x 10 levels
        assert_eq!(stats.min_hit, 17.0); // +1 damage x 10 levels, +2 weapon
        assert!((stats.accuracy - 50.0 * 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_legendary_charm_contribution() {
        let (content, mut state) = fixture();
        state.player.equipment.charm_id = "c5".to_string();
        let stats = player_base_stats(&state, &content);
        // Legendary doubles the charm's 150 accuracy / 100 evasion bases
        assert_eq!(stats.accuracy, 50.0 + 300.0);
        assert_eq!(stats.evasion, 10.0 + 200.0);
    }

    #[test]
    fn test_enemy_scaling_capped() {
        let tuning = Tuning::default();
        assert_eq!(enemy_scale_factor(1, 1, &tuning), 1.0);
        assert!((enemy_scale_factor(1, 6, &tuning) - 1.15).abs() < 1e-9);
        // 30 levels above would be 0.90 uncapped; cap holds at 0.45
        assert!((enemy_scale_factor(1, 31, &tuning) - 1.45).abs() < 1e-9);
    }

    #[test]
    fn test_enemy_stats_scale_hp_and_damage_only() {
        let (content, mut state) = fixture();
        state.enemy.enemy_id = "shadow_vermin".to_string();
        state.enemy.scaled_to_level = 7; // 5 levels above the template
        let stats = enemy_base_stats(&state, &content);
        assert_eq!(stats.hp, (60.0f64 * 1.15).floor());
        assert_eq!(stats.min_hit, (4.0f64 * 1.15).floor());
        assert_eq!(stats.accuracy, 40.0); // unscaled
    }
}
