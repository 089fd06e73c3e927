//! Runtime game state
//!
//! One serializable aggregate holds everything a save file carries. All
//! mutation goes through the engine; hosts only read. Loaded state is
//! repaired by [`GameState::normalize`] in one place, so every subsystem
//! downstream can assume ids resolve and numbers are sane.

use crate::event::MissionOutcome;
use crate::types::{safe_count, safe_f64, EffectInstance, Side};
use crate::unlocks;
use content_core::{ContentRegistry, EquipmentSlot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Newest-first combat log entries kept in state
pub const LOG_CAPACITY: usize = 8;

/// Equipped item ids, one per slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub weapon_id: String,
    #[serde(default)]
    pub armor_id: String,
    #[serde(default)]
    pub charm_id: String,
}

impl Equipment {
    pub fn slot(&self, slot: EquipmentSlot) -> &str {
        match slot {
            EquipmentSlot::Weapon => &self.weapon_id,
            EquipmentSlot::Armor => &self.armor_id,
            EquipmentSlot::Charm => &self.charm_id,
        }
    }

    pub fn set_slot(&mut self, slot: EquipmentSlot, item_id: &str) {
        let target = match slot {
            EquipmentSlot::Weapon => &mut self.weapon_id,
            EquipmentSlot::Armor => &mut self.armor_id,
            EquipmentSlot::Charm => &mut self.charm_id,
        };
        *target = item_id.to_string();
    }

    pub fn ids(&self) -> [&str; 3] {
        [&self.weapon_id, &self.armor_id, &self.charm_id]
    }
}

/// The player's persistent combat and progression state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub current_hp: f64,
    /// Milliseconds accumulated toward the next attack
    #[serde(default)]
    pub tick_timer_ms: f64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub gold: i64,
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub deaths: i64,
    /// Defeat counts per enemy id
    #[serde(default)]
    pub kill_stats: HashMap<String, i64>,
    #[serde(default)]
    pub equipment: Equipment,
    /// Learned flags per skill id
    #[serde(default)]
    pub learned_skills: HashMap<String, bool>,
    #[serde(default)]
    pub active_effects: Vec<EffectInstance>,
}

fn default_level() -> u32 {
    1
}

impl PlayerState {
    /// Total enemies defeated across all enemy ids
    pub fn total_kills(&self) -> i64 {
        self.kill_stats.values().map(|count| safe_count(*count)).sum()
    }
}

/// The current combat target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyState {
    #[serde(default)]
    pub enemy_id: String,
    #[serde(default)]
    pub current_hp: f64,
    #[serde(default)]
    pub tick_timer_ms: f64,
    /// Player level the enemy's scaling was captured at. Scaling freezes on
    /// combat entry so an enemy does not grow mid-fight.
    #[serde(default = "default_level")]
    pub scaled_to_level: u32,
    #[serde(default)]
    pub active_effects: Vec<EffectInstance>,
}

/// A queued one-shot damage buff waiting for the next landed hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStrike {
    pub skill_id: String,
    pub multiplier: f64,
    pub flat_bonus: f64,
}

/// Mutable per-skill runtime: cooldowns and queued strikes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillRuntime {
    /// Seconds until each active skill is ready again
    #[serde(default)]
    pub cooldowns: HashMap<String, f64>,
    /// Consumed oldest-first when the player lands a hit
    #[serde(default)]
    pub pending_strikes: Vec<PendingStrike>,
}

/// Progress toward one achievement
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementProgress {
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub unlocked: bool,
}

/// A mission run in progress, plus the last finished outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionState {
    #[serde(default)]
    pub current_mission_id: Option<String>,
    /// 1-based wave counter
    #[serde(default)]
    pub current_wave: u32,
    /// Rewards banked during the run, paid only on completion
    #[serde(default)]
    pub banked_xp: i64,
    #[serde(default)]
    pub banked_gold: i64,
    #[serde(default)]
    pub last_outcome: Option<MissionOutcome>,
}

impl MissionState {
    pub fn is_active(&self) -> bool {
        self.current_mission_id.is_some()
    }

    pub fn clear_run(&mut self) {
        self.current_mission_id = None;
        self.current_wave = 0;
        self.banked_xp = 0;
        self.banked_gold = 0;
    }
}

/// Shop unlock flags per item id. Purchase state only; the equipped item
/// lives in [`Equipment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopState {
    #[serde(default)]
    pub item_unlocks: HashMap<String, bool>,
}

impl ShopState {
    pub fn is_unlocked(&self, item_id: &str) -> bool {
        self.item_unlocks.get(item_id).copied().unwrap_or(false)
    }

    pub fn unlock(&mut self, item_id: &str) {
        self.item_unlocks.insert(item_id.to_string(), true);
    }
}

/// Bookkeeping outside the game simulation proper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemState {
    /// Wall-clock ms of the last save, for offline catch-up
    #[serde(default)]
    pub last_save_unix_ms: i64,
    #[serde(default)]
    pub seconds_played: f64,
}

/// The complete game state: everything a save file carries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub player: PlayerState,
    #[serde(default)]
    pub enemy: EnemyState,
    #[serde(default)]
    pub skills: SkillRuntime,
    #[serde(default)]
    pub mission: MissionState,
    #[serde(default)]
    pub shop: ShopState,
    /// Per-achievement progress, keyed by achievement id
    #[serde(default)]
    pub achievements: HashMap<String, AchievementProgress>,
    /// Unlock flags per enemy id; never cleared once set
    #[serde(default)]
    pub enemy_unlocks: HashMap<String, bool>,
    #[serde(default)]
    pub system: SystemState,
    #[serde(default)]
    pub combat_active: bool,
    /// Ticks left before the pending respawn completes; 0 = not respawning
    #[serde(default)]
    pub respawn_ticks_remaining: u32,
    #[serde(default)]
    pub pending_respawn: Option<Side>,
    /// Newest-first, capped at [`LOG_CAPACITY`]
    #[serde(default)]
    pub log: VecDeque<String>,
}

impl GameState {
    /// A fresh game against the default enemy
    pub fn new(content: &ContentRegistry) -> Self {
        let mut state = GameState {
            player: PlayerState {
                current_hp: content.tuning.player_base.hp,
                level: 1,
                ..PlayerState::default()
            },
            ..GameState::default()
        };
        for slot in EquipmentSlot::all() {
            if let Some(item_id) = starter_item(content, *slot) {
                state.player.equipment.set_slot(*slot, item_id);
            }
        }
        if let Some(enemy_id) = content.default_enemy_id() {
            state.enemy.enemy_id = enemy_id.to_string();
        }
        state.normalize(content);
        state
    }

    pub fn is_respawning(&self) -> bool {
        self.respawn_ticks_remaining > 0
    }

    pub fn current_hp(&self, side: Side) -> f64 {
        match side {
            Side::Player => self.player.current_hp,
            Side::Enemy => self.enemy.current_hp,
        }
    }

    pub fn set_current_hp(&mut self, side: Side, hp: f64) {
        match side {
            Side::Player => self.player.current_hp = hp,
            Side::Enemy => self.enemy.current_hp = hp,
        }
    }

    pub fn effects(&self, side: Side) -> &Vec<EffectInstance> {
        match side {
            Side::Player => &self.player.active_effects,
            Side::Enemy => &self.enemy.active_effects,
        }
    }

    pub fn effects_mut(&mut self, side: Side) -> &mut Vec<EffectInstance> {
        match side {
            Side::Player => &mut self.player.active_effects,
            Side::Enemy => &mut self.enemy.active_effects,
        }
    }

    /// Append a combat log line, newest first, dropping the oldest past cap
    pub fn add_log(&mut self, line: impl Into<String>) {
        self.log.push_front(line.into());
        self.log.truncate(LOG_CAPACITY);
    }

    /// Repair every field against the given content set.
    ///
    /// This is the single choke point for malformed or hostile persisted
    /// data: unknown ids are dropped or re-pointed at defaults, numbers are
    /// coerced finite and clamped, and derived flags are reseeded. Callers
    /// run it after deserializing and after swapping content sets.
    pub fn normalize(&mut self, content: &ContentRegistry) {
        self.normalize_player(content);
        self.normalize_enemy(content);
        self.normalize_skills(content);
        self.normalize_mission(content);
        self.normalize_shop(content);
        self.normalize_achievements(content);
        self.normalize_enemy_unlocks(content);
        self.normalize_respawn();

        self.system.last_save_unix_ms = safe_count(self.system.last_save_unix_ms);
        self.system.seconds_played = safe_f64(self.system.seconds_played, 0.0).max(0.0);
        self.log.truncate(LOG_CAPACITY);
    }

    fn normalize_player(&mut self, content: &ContentRegistry) {
        let player = &mut self.player;
        player.level = player.level.max(1);
        player.xp = safe_count(player.xp);
        player.gold = safe_count(player.gold);
        player.wins = safe_count(player.wins);
        player.deaths = safe_count(player.deaths);
        player.tick_timer_ms = safe_f64(player.tick_timer_ms, 0.0).max(0.0);
        player.kill_stats.retain(|enemy_id, _| content.enemy(enemy_id).is_some());
        for count in player.kill_stats.values_mut() {
            *count = safe_count(*count);
        }

        // Re-point missing or unknown gear at the free starter for the slot
        for slot in EquipmentSlot::all() {
            let equipped = player.equipment.slot(*slot);
            let valid = content
                .item(equipped)
                .is_some_and(|item| item.slot == *slot);
            if !valid {
                if let Some(item_id) = starter_item(content, *slot) {
                    player.equipment.set_slot(*slot, item_id);
                }
            }
        }

        sanitize_effects(&mut player.active_effects, content);
    }

    fn normalize_enemy(&mut self, content: &ContentRegistry) {
        if content.enemy(&self.enemy.enemy_id).is_none() {
            if let Some(enemy_id) = content.default_enemy_id() {
                self.enemy.enemy_id = enemy_id.to_string();
                self.enemy.current_hp = 0.0; // forces the full-hp repair below
            }
        }
        self.enemy.scaled_to_level = self.enemy.scaled_to_level.max(1);
        self.enemy.tick_timer_ms = safe_f64(self.enemy.tick_timer_ms, 0.0).max(0.0);
        sanitize_effects(&mut self.enemy.active_effects, content);

        // HP repair happens against unmodified template/base numbers; live
        // effect modifiers never change max HP in practice.
        if let Some(template) = content.enemy(&self.enemy.enemy_id) {
            let max_hp = crate::stats::scaled_enemy_hp(
                template,
                self.enemy.scaled_to_level,
                &content.tuning,
            );
            let hp = safe_f64(self.enemy.current_hp, max_hp);
            self.enemy.current_hp = if hp <= 0.0 && self.pending_respawn.is_none() {
                max_hp
            } else {
                hp.clamp(0.0, max_hp)
            };
        }

        let player_max = crate::stats::player_max_hp(self, content);
        let hp = safe_f64(self.player.current_hp, player_max);
        self.player.current_hp = if hp <= 0.0 && self.pending_respawn.is_none() {
            player_max
        } else {
            hp.clamp(0.0, player_max)
        };
    }

    fn normalize_skills(&mut self, content: &ContentRegistry) {
        // Every known skill gets a learned flag; gate-free skills start known
        let mut learned = HashMap::with_capacity(content.skills().len());
        for skill in content.skills() {
            let already = self
                .player
                .learned_skills
                .get(&skill.id)
                .copied()
                .unwrap_or(false);
            learned.insert(skill.id.clone(), already || skill.unlock.is_none());
        }
        self.player.learned_skills = learned;

        self.skills.cooldowns.retain(|skill_id, _| {
            content.skill(skill_id).is_some_and(|skill| skill.is_active())
        });
        for remaining in self.skills.cooldowns.values_mut() {
            *remaining = safe_f64(*remaining, 0.0).max(0.0);
        }

        self.skills.pending_strikes.retain(|strike| {
            content.skill(&strike.skill_id).is_some()
                && strike.multiplier.is_finite()
                && strike.flat_bonus.is_finite()
        });
    }

    fn normalize_mission(&mut self, content: &ContentRegistry) {
        self.mission.banked_xp = safe_count(self.mission.banked_xp);
        self.mission.banked_gold = safe_count(self.mission.banked_gold);

        let Some(mission_id) = self.mission.current_mission_id.clone() else {
            self.mission.current_wave = 0;
            return;
        };
        let Some(mission) = content.mission(&mission_id) else {
            self.mission.clear_run();
            return;
        };

        let total = mission.total_waves();
        self.mission.current_wave = self.mission.current_wave.clamp(1, total);

        // Mid-mission saves must resume against a pool enemy
        if !mission.enemy_pool.iter().any(|id| *id == self.enemy.enemy_id) {
            if let Some(enemy_id) = mission.enemy_pool.first() {
                self.enemy.enemy_id = enemy_id.clone();
                self.enemy.scaled_to_level = self.player.level;
                self.enemy.active_effects.clear();
                self.enemy.tick_timer_ms = 0.0;
                if let Some(template) = content.enemy(enemy_id) {
                    self.enemy.current_hp = crate::stats::scaled_enemy_hp(
                        template,
                        self.enemy.scaled_to_level,
                        &content.tuning,
                    );
                }
            }
        }
    }

    fn normalize_shop(&mut self, content: &ContentRegistry) {
        self.shop
            .item_unlocks
            .retain(|item_id, _| content.item(item_id).is_some());
        // Free items and anything currently equipped are always unlocked
        for item in content.equipment() {
            if item.cost == 0 && item.unlock.is_none() {
                self.shop.unlock(&item.id);
            }
        }
        for item_id in self.player.equipment.ids() {
            if content.item(item_id).is_some() {
                self.shop.unlock(item_id);
            }
        }
    }

    fn normalize_achievements(&mut self, content: &ContentRegistry) {
        let mut progress = HashMap::with_capacity(content.achievements().len());
        for achievement in content.achievements() {
            let mut entry = self
                .achievements
                .get(&achievement.id)
                .copied()
                .unwrap_or_default();
            entry.current = safe_count(entry.current);
            progress.insert(achievement.id.clone(), entry);
        }
        self.achievements = progress;
    }

    fn normalize_enemy_unlocks(&mut self, content: &ContentRegistry) {
        self.enemy_unlocks
            .retain(|enemy_id, _| content.enemy(enemy_id).is_some());
        let mut newly_met = Vec::new();
        for enemy in content.enemies() {
            let met = match &enemy.unlock {
                None => true,
                Some(requirement) => unlocks::requirement_met(self, requirement),
            };
            if met {
                newly_met.push(enemy.id.clone());
            }
        }
        for enemy_id in newly_met {
            self.enemy_unlocks.insert(enemy_id, true);
        }
        // The current target must stay selectable even if its gate is unmet
        self.enemy_unlocks.insert(self.enemy.enemy_id.clone(), true);
    }

    fn normalize_respawn(&mut self) {
        match self.pending_respawn {
            None => self.respawn_ticks_remaining = 0,
            Some(_) => {
                self.respawn_ticks_remaining = self.respawn_ticks_remaining.max(1);
            }
        }
    }
}

/// Dedupe, validate, and clamp a loaded effect list in place
fn sanitize_effects(effects: &mut Vec<EffectInstance>, content: &ContentRegistry) {
    effects.retain(|instance| content.effect(&instance.effect_id).is_some());
    for instance in effects.iter_mut() {
        instance.sanitize();
    }
    effects.retain(|instance| instance.remaining > 0.0);
    // Keep the first instance per effect id; duplicates cannot arise through
    // the engine (reapplication refreshes) but a save file could carry them
    let mut seen: Vec<String> = Vec::new();
    effects.retain(|instance| {
        if seen.iter().any(|id| *id == instance.effect_id) {
            false
        } else {
            seen.push(instance.effect_id.clone());
            true
        }
    });
}

/// The free (cost 0, gate-free) item for a slot, falling back to the first
/// item declared for the slot
pub fn starter_item(content: &ContentRegistry, slot: EquipmentSlot) -> Option<&str> {
    content
        .equipment()
        .iter()
        .find(|item| item.slot == slot && item.cost == 0 && item.unlock.is_none())
        .or_else(|| content.equipment().iter().find(|item| item.slot == slot))
        .map(|item| item.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> ContentRegistry {
        ContentRegistry::builtin()
    }

    #[test]
    fn test_new_game_state() {
        let content = content();
        let state = GameState::new(&content);
        assert_eq!(state.player.level, 1);
        assert_eq!(state.player.equipment.weapon_id, "w1");
        assert_eq!(state.player.equipment.armor_id, "a1");
        assert_eq!(state.player.equipment.charm_id, "c1");
        assert_eq!(state.enemy.enemy_id, "training_dummy");
        assert!(state.enemy.current_hp > 0.0);
        assert!(state.player.current_hp > 0.0);
        // Gate-free skills start learned, gated ones do not
        assert_eq!(state.player.learned_skills.get("second_wind"), Some(&true));
        assert_eq!(state.player.learned_skills.get("critical_mastery"), Some(&false));
    }

    #[test]
    fn test_normalize_repairs_negative_counters() {
        let content = content();
        let mut state = GameState::new(&content);
        state.player.gold = -500;
        state.player.xp = -1;
        state.player.wins = -3;
        state.normalize(&content);
        assert_eq!(state.player.gold, 0);
        assert_eq!(state.player.xp, 0);
        assert_eq!(state.player.wins, 0);
    }

    #[test]
    fn test_normalize_repoints_unknown_equipment() {
        let content = content();
        let mut state = GameState::new(&content);
        state.player.equipment.weapon_id = "no_such_item".to_string();
        // A charm id in the weapon slot is just as invalid
        state.player.equipment.armor_id = "c2".to_string();
        state.normalize(&content);
        assert_eq!(state.player.equipment.weapon_id, "w1");
        assert_eq!(state.player.equipment.armor_id, "a1");
    }

    #[test]
    fn test_normalize_drops_unknown_effects() {
        let content = content();
        let mut state = GameState::new(&content);
        state
            .player
            .active_effects
            .push(EffectInstance::new("no_such_effect", 5.0, 1.0, None));
        state
            .player
            .active_effects
            .push(EffectInstance::new("poison", 5.0, 1.0, None));
        state.normalize(&content);
        assert_eq!(state.player.active_effects.len(), 1);
        assert_eq!(state.player.active_effects[0].effect_id, "poison");
    }

    #[test]
    fn test_normalize_resets_unknown_enemy() {
        let content = content();
        let mut state = GameState::new(&content);
        state.enemy.enemy_id = "gone".to_string();
        state.normalize(&content);
        assert_eq!(state.enemy.enemy_id, "training_dummy");
        assert!(state.enemy.current_hp > 0.0);
    }

    #[test]
    fn test_normalize_clears_unknown_mission() {
        let content = content();
        let mut state = GameState::new(&content);
        state.mission.current_mission_id = Some("no_such_mission".to_string());
        state.mission.current_wave = 3;
        state.mission.banked_gold = 50;
        state.normalize(&content);
        assert!(state.mission.current_mission_id.is_none());
        assert_eq!(state.mission.banked_gold, 0);
    }

    #[test]
    fn test_normalize_repairs_mission_enemy_outside_pool() {
        let content = content();
        let mut state = GameState::new(&content);
        state.mission.current_mission_id = Some("training_patrol".to_string());
        state.mission.current_wave = 2;
        state.enemy.enemy_id = "ancient_dragon".to_string();
        state.normalize(&content);
        assert_eq!(state.enemy.enemy_id, "training_dummy");
        assert_eq!(state.mission.current_wave, 2);
    }

    #[test]
    fn test_log_capacity() {
        let content = content();
        let mut state = GameState::new(&content);
        for i in 0..20 {
            state.add_log(format!("line {i}"));
        }
        assert_eq!(state.log.len(), LOG_CAPACITY);
        assert_eq!(state.log[0], "line 19");
    }

    #[test]
    fn test_respawn_flags_consistent_after_normalize() {
        let content = content();
        let mut state = GameState::new(&content);
        state.respawn_ticks_remaining = 5;
        state.pending_respawn = None;
        state.normalize(&content);
        assert_eq!(state.respawn_ticks_remaining, 0);

        state.pending_respawn = Some(Side::Enemy);
        state.respawn_ticks_remaining = 0;
        state.normalize(&content);
        assert_eq!(state.respawn_ticks_remaining, 1);
    }
}
