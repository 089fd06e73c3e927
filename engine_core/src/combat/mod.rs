//! The combat engine
//!
//! [`CombatEngine`] owns the content registry, the game state, a seeded
//! RNG, and the event sink, and advances everything in fixed ticks. The
//! host drives it: call [`CombatEngine::tick`] on a cadence (or
//! [`CombatEngine::offline_catchup`] for elapsed wall time) and drain
//! events afterward. One tick is one slice of simulated time; nothing in
//! here reads a clock.

mod formula;

pub use formula::{apply_damage_reduction, hit_chance, roll_damage};

use crate::event::{EngineEvent, EventSink, FloatingText, OfflineSummary};
use crate::state::GameState;
use crate::types::Side;
use crate::{effects, missions, progression, skills, stats, unlocks, SaveError};
use content_core::{ContentRegistry, OnHitEffect};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Elapsed windows shorter than this many ticks are not worth simulating
const MIN_OFFLINE_TICKS: u64 = 10;

pub struct CombatEngine {
    content: ContentRegistry,
    state: GameState,
    rng: ChaCha8Rng,
    sink: EventSink,
}

impl CombatEngine {
    /// A fresh game over the given content
    pub fn new(content: ContentRegistry) -> Self {
        Self::with_seed(content, rand::random())
    }

    /// A fresh game with a fixed RNG seed. Two engines with the same seed,
    /// content, and inputs replay identically.
    pub fn with_seed(content: ContentRegistry, seed: u64) -> Self {
        let state = GameState::new(&content);
        CombatEngine {
            content,
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sink: EventSink::new(),
        }
    }

    /// Restore a saved game. The payload must be JSON produced by
    /// [`CombatEngine::to_save_json`]; anything unparseable is an error,
    /// while parseable-but-damaged state is repaired silently.
    pub fn from_save_json(content: ContentRegistry, json: &str) -> Result<Self, SaveError> {
        Self::from_save_json_with_seed(content, json, rand::random())
    }

    pub fn from_save_json_with_seed(
        content: ContentRegistry,
        json: &str,
        seed: u64,
    ) -> Result<Self, SaveError> {
        let mut state: GameState = serde_json::from_str(json)?;
        state.normalize(&content);
        tracing::debug!(level = state.player.level, "save restored");
        Ok(CombatEngine {
            content,
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sink: EventSink::new(),
        })
    }

    /// Serialize the current state. `now_unix_ms` is recorded so the next
    /// load can compute the offline window.
    pub fn to_save_json(&mut self, now_unix_ms: i64) -> Result<String, SaveError> {
        self.state.system.last_save_unix_ms = now_unix_ms.max(0);
        Ok(serde_json::to_string(&self.state)?)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.sink.drain()
    }

    /// Throw the game away and start over against the same content
    pub fn reset(&mut self) {
        self.state = GameState::new(&self.content);
        self.sink.drain();
        tracing::debug!("game reset");
    }

    // === Host commands ===

    pub fn start_combat(&mut self) {
        if !self.state.combat_active {
            self.state.combat_active = true;
            tracing::debug!("combat started");
        }
    }

    pub fn stop_combat(&mut self) {
        if self.state.combat_active {
            self.state.combat_active = false;
            tracing::debug!("combat stopped");
        }
    }

    /// Switch the free-fight target. Refused during a mission or for a
    /// locked enemy. The new enemy arrives at full scaled HP and a pending
    /// enemy respawn is cancelled; a pending player respawn keeps counting.
    pub fn select_enemy(&mut self, enemy_id: &str) -> bool {
        if self.state.mission.is_active() {
            return false;
        }
        unlocks::check_enemy_unlocks(&mut self.state, &self.content, &mut self.sink);
        if !unlocks::is_enemy_unlocked(&self.state, enemy_id) {
            return false;
        }
        let Some(template) = self.content.enemy(enemy_id) else {
            return false;
        };

        self.state.enemy.enemy_id = template.id.clone();
        self.state.enemy.scaled_to_level = self.state.player.level;
        self.state.enemy.current_hp = stats::scaled_enemy_hp(
            template,
            self.state.player.level,
            &self.content.tuning,
        );
        self.state.enemy.tick_timer_ms = 0.0;
        self.state.enemy.active_effects.clear();
        if self.state.pending_respawn == Some(Side::Enemy) {
            self.state.respawn_ticks_remaining = 0;
            self.state.pending_respawn = None;
        }

        self.state.add_log(format!("Now fighting: {}.", template.name));
        self.sink.push(EngineEvent::Refresh);
        tracing::debug!(enemy = %enemy_id, "target selected");
        true
    }

    /// Fire an active skill by explicit player command
    pub fn use_skill(&mut self, skill_id: &str) -> bool {
        skills::use_skill(&mut self.state, &self.content, skill_id, &mut self.sink)
    }

    /// Buy a shop-gated skill
    pub fn purchase_skill(&mut self, skill_id: &str) -> bool {
        skills::purchase_skill(&mut self.state, &self.content, skill_id, &mut self.sink)
    }

    /// Buy a shop item, unlocking it permanently. Gated items additionally
    /// need their requirement met.
    pub fn purchase_item(&mut self, item_id: &str) -> bool {
        let Some(item) = self.content.item(item_id) else {
            return false;
        };
        if self.state.shop.is_unlocked(item_id) {
            return false;
        }
        if let Some(requirement) = &item.unlock {
            if !unlocks::requirement_met(&self.state, requirement) {
                return false;
            }
        }
        if !progression::spend_gold(&mut self.state, item.cost as i64) {
            return false;
        }
        self.state.shop.unlock(item_id);
        self.state.add_log(format!("Purchased {}.", item.name));
        self.sink.push(EngineEvent::Refresh);
        true
    }

    /// Equip an unlocked item into its slot. Current HP is re-clamped in
    /// case the swap lowered max HP.
    pub fn equip_item(&mut self, item_id: &str) -> bool {
        let Some(item) = self.content.item(item_id) else {
            return false;
        };
        if !self.state.shop.is_unlocked(item_id) {
            return false;
        }
        self.state.player.equipment.set_slot(item.slot, &item.id);
        let max_hp = stats::player_max_hp(&self.state, &self.content);
        self.state.player.current_hp = self.state.player.current_hp.min(max_hp);
        self.state.add_log(format!("Equipped {}.", item.name));
        self.sink.push(EngineEvent::Refresh);
        true
    }

    pub fn start_mission(&mut self, mission_id: &str) -> bool {
        missions::start_mission(
            &mut self.state,
            &self.content,
            &mut self.rng,
            mission_id,
            &mut self.sink,
        )
    }

    /// Walk away from the current mission, forfeiting the banked rewards
    pub fn abandon_mission(&mut self) -> bool {
        missions::end_mission_unpaid(
            &mut self.state,
            &self.content,
            crate::event::MissionEndReason::Abandoned,
            &mut self.sink,
        )
        .is_some()
    }

    // === The tick loop ===

    /// Advance the simulation by one tick
    pub fn tick(&mut self) {
        self.tick_once();
    }

    /// Advance `n` ticks, optionally without recording events
    pub fn run_ticks(&mut self, n: u64, silent: bool) {
        let was_silent = self.sink.is_silent();
        self.sink.set_silent(silent || was_silent);
        for _ in 0..n {
            self.tick_once();
        }
        self.sink.set_silent(was_silent);
    }

    /// Simulate the time the game was away, capped to the tuning's offline
    /// window. Returns `None` (simulating nothing) for windows shorter than
    /// a handful of ticks.
    pub fn offline_catchup(&mut self, elapsed_ms: u64) -> Option<OfflineSummary> {
        let tuning = &self.content.tuning;
        let cap_ms = (tuning.max_offline_hours.max(0.0) * 3_600_000.0) as u64;
        let ticks = elapsed_ms.min(cap_ms) / tuning.tick_rate_ms.max(1);
        if ticks < MIN_OFFLINE_TICKS {
            return None;
        }

        let wins_before = self.state.player.wins;
        let level_before = self.state.player.level;
        let gold_before = self.state.player.gold;

        self.run_ticks(ticks, true);

        let summary = OfflineSummary {
            ticks_simulated: ticks,
            wins_gained: self.state.player.wins - wins_before,
            levels_gained: self.state.player.level - level_before,
            gold_gained: self.state.player.gold - gold_before,
        };
        self.state.add_log(format!(
            "While you were away: {} wins, {} gold.",
            summary.wins_gained, summary.gold_gained
        ));
        self.sink.push(EngineEvent::OfflineProgress(summary));
        tracing::info!(
            ticks,
            wins = summary.wins_gained,
            levels = summary.levels_gained,
            "offline catch-up finished"
        );
        Some(summary)
    }

    fn tick_once(&mut self) {
        if !self.state.combat_active {
            return;
        }
        let tick_ms = self.content.tuning.tick_rate_ms as f64;
        let dt = self.content.tuning.tick_seconds();

        // Play-time accrues in whole seconds for the time achievement
        let seconds_before = self.state.system.seconds_played as i64;
        self.state.system.seconds_played += dt;
        let whole_seconds = self.state.system.seconds_played as i64 - seconds_before;
        if whole_seconds > 0 {
            unlocks::record_time_played(
                &mut self.state,
                &self.content,
                whole_seconds,
                &mut self.sink,
            );
        }

        // A pending respawn freezes the fight until its ticks run out
        if self.state.is_respawning() {
            self.state.respawn_ticks_remaining -= 1;
            if self.state.respawn_ticks_remaining == 0 {
                self.finish_respawn();
                self.sink.push(EngineEvent::Refresh);
            }
            return;
        }

        skills::reduce_cooldowns(&mut self.state, dt);
        effects::update_effects(&mut self.state, &self.content, dt, &mut self.sink);

        // Deaths from periodic damage resolve before anyone swings
        if self.state.player.current_hp <= 0.0 {
            self.handle_death(Side::Player);
            self.sink.push(EngineEvent::Refresh);
            return;
        }
        if self.state.enemy.current_hp <= 0.0 {
            self.handle_death(Side::Enemy);
            self.sink.push(EngineEvent::Refresh);
            return;
        }

        self.state.player.tick_timer_ms += tick_ms;
        self.state.enemy.tick_timer_ms += tick_ms;

        let player_interval =
            stats::effective_stats(&self.state, &self.content, Side::Player).attack_interval_ms;
        if self.state.player.tick_timer_ms >= player_interval {
            skills::auto_use_skills(&mut self.state, &self.content, &mut self.sink);
            self.resolve_exchange(Side::Player);
            self.state.player.tick_timer_ms = 0.0;
            if self.state.is_respawning() {
                self.sink.push(EngineEvent::Refresh);
                return;
            }
        }

        let enemy_interval =
            stats::effective_stats(&self.state, &self.content, Side::Enemy).attack_interval_ms;
        if self.state.enemy.tick_timer_ms >= enemy_interval {
            self.resolve_exchange(Side::Enemy);
            self.state.enemy.tick_timer_ms = 0.0;
        }

        self.sink.push(EngineEvent::Refresh);
    }

    /// One attack: hit roll, damage pipeline, post-hit passives, on-hit
    /// effects, then death resolution with the primary victim first.
    fn resolve_exchange(&mut self, attacker: Side) {
        if self.state.is_respawning() {
            return;
        }
        let defender = attacker.opponent();

        // Snapshot both sides: base, passive skill bonuses (player side
        // only), status effects, mission modifiers, in that order
        let mut player_stats = stats::player_base_stats(&self.state, &self.content);
        skills::apply_passive_flat_stats(&self.state, &self.content, &mut player_stats);
        effects::apply_stat_modifiers(
            &self.state.player.active_effects,
            &self.content,
            &mut player_stats,
        );
        missions::apply_area_modifiers(&self.state, &self.content, Side::Player, &mut player_stats);
        player_stats.sanitize();

        let mut enemy_stats = stats::enemy_base_stats(&self.state, &self.content);
        effects::apply_stat_modifiers(
            &self.state.enemy.active_effects,
            &self.content,
            &mut enemy_stats,
        );
        missions::apply_area_modifiers(&self.state, &self.content, Side::Enemy, &mut enemy_stats);
        enemy_stats.sanitize();

        let (attacker_stats, defender_stats) = match attacker {
            Side::Player => (player_stats, enemy_stats),
            Side::Enemy => (enemy_stats, player_stats),
        };

        let enemy_name = self
            .content
            .enemy(&self.state.enemy.enemy_id)
            .map(|template| template.name.clone())
            .unwrap_or_else(|| "the enemy".to_string());

        let chance = formula::hit_chance(attacker_stats.accuracy, defender_stats.evasion);
        if self.rng.gen::<f64>() >= chance {
            self.sink.push(EngineEvent::FloatingText {
                side: defender,
                text: FloatingText::Miss,
            });
            let line = match attacker {
                Side::Player => format!("You miss {enemy_name}."),
                Side::Enemy => format!("{enemy_name} misses you."),
            };
            self.state.add_log(line);
            return;
        }

        let mut damage =
            formula::roll_damage(&mut self.rng, attacker_stats.min_hit, attacker_stats.max_hit);
        if attacker == Side::Player {
            damage = skills::consume_pending_strikes(&mut self.state, &self.content, damage);
            let defender_max = stats::max_hp(&self.state, &self.content, Side::Enemy);
            let defender_ratio = if defender_max > 0.0 {
                self.state.enemy.current_hp / defender_max
            } else {
                0.0
            };
            damage = skills::passive_damage_bonus(
                &self.state,
                &self.content,
                &mut self.rng,
                defender_ratio,
                damage,
                &mut self.sink,
            );
        }
        damage = formula::apply_damage_reduction(damage, defender_stats.damage_reduction);

        let remaining = (self.state.current_hp(defender) - damage).max(0.0);
        self.state.set_current_hp(defender, remaining);
        self.sink.push(EngineEvent::FloatingText {
            side: defender,
            text: FloatingText::Damage {
                amount: damage as i64,
            },
        });
        let line = match attacker {
            Side::Player => format!("You hit {enemy_name} for {damage:.0}."),
            Side::Enemy => format!("{enemy_name} hits you for {damage:.0}."),
        };
        self.state.add_log(line);

        if attacker == Side::Player {
            skills::lifesteal_after_hit(
                &mut self.state,
                &self.content,
                &mut self.rng,
                damage,
                &mut self.sink,
            );
        }
        self.apply_on_hit_effects(attacker, defender);

        // The primary hit's victim resolves first and ends the exchange.
        // The counter roll happens strictly after, so a dead defender never
        // counters and a counter kill only exists when the defender lived.
        if self.state.current_hp(defender) <= 0.0 {
            self.handle_death(defender);
            return;
        }
        if attacker == Side::Enemy {
            let reflected = skills::counter_damage(
                &self.state,
                &self.content,
                &mut self.rng,
                damage,
                &mut self.sink,
            );
            if reflected > 0.0 {
                let hp = (self.state.enemy.current_hp - reflected).max(0.0);
                self.state.enemy.current_hp = hp;
                self.sink.push(EngineEvent::FloatingText {
                    side: Side::Enemy,
                    text: FloatingText::Damage {
                        amount: reflected as i64,
                    },
                });
                if hp <= 0.0 {
                    self.handle_death(Side::Enemy);
                }
            }
        }
    }

    /// Roll the attacker's on-hit effect applications against the defender
    fn apply_on_hit_effects(&mut self, attacker: Side, defender: Side) {
        let mut applications: Vec<(OnHitEffect, String)> = Vec::new();
        match attacker {
            Side::Enemy => {
                if let Some(template) = self.content.enemy(&self.state.enemy.enemy_id) {
                    for on_hit in &template.on_hit_effects {
                        applications.push((on_hit.clone(), template.id.clone()));
                    }
                }
            }
            Side::Player => {
                for item_id in self.state.player.equipment.ids() {
                    if let Some(item) = self.content.item(item_id) {
                        for on_hit in &item.on_hit_effects {
                            applications.push((on_hit.clone(), item.id.clone()));
                        }
                    }
                }
            }
        }

        for (on_hit, source) in applications {
            if self.rng.gen::<f64>() < on_hit.chance.clamp(0.0, 1.0) {
                effects::apply_effect(
                    &mut self.state,
                    &self.content,
                    defender,
                    &on_hit.effect_id,
                    effects::ApplyOptions {
                        duration: on_hit.duration,
                        intensity: on_hit.intensity,
                        source: Some(source),
                    },
                    &mut self.sink,
                );
            }
        }
    }

    /// Resolve a death: rewards and unlocks for enemy kills, mission
    /// failure for player deaths, then the respawn lockout. Re-entrant
    /// deaths in the same window are ignored.
    fn handle_death(&mut self, victim: Side) {
        if self.state.is_respawning() {
            return;
        }

        match victim {
            Side::Enemy => {
                let Some(template) = self.content.enemy(&self.state.enemy.enemy_id) else {
                    return;
                };
                let enemy_id = template.id.clone();
                let enemy_name = template.name.clone();
                let base_xp = template.defeat_xp() as i64;
                let base_gold = template.defeat_gold(self.content.tuning.gold_per_enemy_level) as i64;

                self.state.player.wins += 1;
                self.state.add_log(format!("You defeated {enemy_name}!"));
                tracing::debug!(enemy = %enemy_id, "enemy defeated");
                unlocks::record_kill(&mut self.state, &self.content, &enemy_id, &mut self.sink);

                let (xp_multiplier, gold_multiplier) =
                    missions::reward_multipliers(&self.state, &self.content);
                let xp = (base_xp as f64 * xp_multiplier).floor() as i64;
                let gold = (base_gold as f64 * gold_multiplier).floor() as i64;

                match missions::on_enemy_defeated(
                    &mut self.state,
                    &self.content,
                    &mut self.rng,
                    xp,
                    gold,
                    &mut self.sink,
                ) {
                    // The next wave's enemy replaced the corpse outright
                    missions::MissionAdvance::WaveAdvanced => {}
                    missions::MissionAdvance::NotActive => {
                        progression::add_gold(&mut self.state, &self.content, gold, &mut self.sink);
                        progression::add_xp(&mut self.state, &self.content, xp, &mut self.sink);
                        self.schedule_respawn(Side::Enemy);
                    }
                    missions::MissionAdvance::Completed => {
                        self.schedule_respawn(Side::Enemy);
                    }
                }
            }
            Side::Player => {
                self.state.player.deaths += 1;
                self.state.add_log("You were defeated!".to_string());
                tracing::debug!("player defeated");
                missions::end_mission_unpaid(
                    &mut self.state,
                    &self.content,
                    crate::event::MissionEndReason::Failed,
                    &mut self.sink,
                );
                self.schedule_respawn(Side::Player);
            }
        }
    }

    fn schedule_respawn(&mut self, victim: Side) {
        self.state.pending_respawn = Some(victim);
        self.state.respawn_ticks_remaining = self.content.tuning.respawn_ticks().max(1);
    }

    /// Bring the dead side back at full strength with a clean effect list
    fn finish_respawn(&mut self) {
        let Some(victim) = self.state.pending_respawn.take() else {
            return;
        };
        match victim {
            Side::Player => {
                effects::clear_effects(&mut self.state, Side::Player);
                self.state.player.current_hp = stats::player_max_hp(&self.state, &self.content);
                self.state.player.tick_timer_ms = 0.0;
                self.state.add_log("You recover and return to the fight.".to_string());
            }
            Side::Enemy => {
                effects::clear_effects(&mut self.state, Side::Enemy);
                // Respawn re-enters combat, so scaling recaptures the level
                self.state.enemy.scaled_to_level = self.state.player.level;
                if let Some(template) = self.content.enemy(&self.state.enemy.enemy_id) {
                    self.state.enemy.current_hp = stats::scaled_enemy_hp(
                        template,
                        self.state.enemy.scaled_to_level,
                        &self.content.tuning,
                    );
                    self.state.add_log(format!("Another {} appears.", template.name));
                }
                self.state.enemy.tick_timer_ms = 0.0;
            }
        }
    }
}
