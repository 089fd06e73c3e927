//! engine_core - Tick-driven combat and progression engine
//!
//! This library simulates an idle combat game: a player and one enemy
//! trade blows on attack timers, with status effects, auto-used skills,
//! missions, achievements, and an economy layered on top. Everything runs
//! in fixed ticks with no internal clock, so the same engine serves an
//! interactive host and offline catch-up alike.
//!
//! The flow:
//! 1. Load a [`ContentRegistry`](content_core::ContentRegistry) (built-in
//!    or from TOML files)
//! 2. Build a [`CombatEngine`] — fresh, seeded, or from a save payload
//! 3. Drive it with [`CombatEngine::tick`] and host commands
//! 4. Drain [`EngineEvent`]s and render them however you like

mod combat;
mod effects;
mod event;
mod missions;
mod progression;
mod skills;
mod state;
mod stats;
mod types;
mod unlocks;

pub use combat::{apply_damage_reduction, hit_chance, roll_damage, CombatEngine};
pub use event::{
    EngineEvent, EventSink, FloatingText, MissionEndReason, MissionOutcome, OfflineSummary,
    PassiveOutcome,
};
pub use missions::MissionAdvance;
pub use progression::xp_required;
pub use state::{
    AchievementProgress, EnemyState, Equipment, GameState, MissionState, PendingStrike,
    PlayerState, ShopState, SkillRuntime, SystemState, LOG_CAPACITY,
};
pub use stats::{effective_stats, player_max_hp};
pub use types::{EffectInstance, Side, Stats};

use thiserror::Error;

/// Error restoring or serializing a save payload.
///
/// Only structurally unparseable JSON is an error; parseable saves with
/// damaged values are repaired during normalization instead.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("malformed save payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
