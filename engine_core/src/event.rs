//! Engine events
//!
//! Every observable thing the engine does is reported as a typed event
//! pushed into an [`EventSink`]. Hosts drain the sink after driving ticks
//! and render however they like; the engine itself never touches a display.
//! Silent sinks drop events without recording them, which is how offline
//! catch-up avoids building a million-entry backlog.

use crate::types::Side;
use serde::{Deserialize, Serialize};

/// Short-lived combat feedback pinned to one combatant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloatingText {
    Damage { amount: i64 },
    Heal { amount: i64 },
    Miss,
}

/// Which passive fired during an exchange, with its observable outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassiveOutcome {
    CriticalHit { damage: i64 },
    ExecuteBonus { damage: i64 },
    LifeSteal { healed: i64 },
    CounterAttack { damage: i64 },
}

/// Why a mission run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionEndReason {
    Completed,
    Failed,
    Abandoned,
}

/// Terminal summary of a mission run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub mission_id: String,
    pub reason: MissionEndReason,
    pub wave_reached: u32,
    pub total_waves: u32,
    /// Banked rewards paid out (zero unless completed)
    pub xp_paid: i64,
    pub gold_paid: i64,
}

impl MissionOutcome {
    pub fn completed(&self) -> bool {
        self.reason == MissionEndReason::Completed
    }
}

/// What happened while the game was away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineSummary {
    pub ticks_simulated: u64,
    pub wins_gained: i64,
    pub levels_gained: u32,
    pub gold_gained: i64,
}

/// One observable engine occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Damage, heal, or miss feedback on one side
    FloatingText { side: Side, text: FloatingText },
    EffectApplied {
        side: Side,
        effect_id: String,
        /// True when an existing instance was refreshed instead of added
        refreshed: bool,
    },
    EffectExpired { side: Side, effect_id: String },
    SkillUsed { skill_id: String },
    PassiveTriggered { skill_id: String, outcome: PassiveOutcome },
    SkillsLearned { skill_ids: Vec<String> },
    LevelUp { level: u32 },
    EnemiesUnlocked { enemy_ids: Vec<String> },
    AchievementUnlocked { achievement_id: String },
    MissionStarted { mission_id: String, total_waves: u32 },
    MissionWave { mission_id: String, wave: u32, total_waves: u32 },
    MissionEnded(MissionOutcome),
    OfflineProgress(OfflineSummary),
    /// The tick mutated combat state; a UI should redraw
    Refresh,
}

/// Collects engine events for the host to drain.
///
/// While `silent` is set, pushes are dropped; state mutation is identical
/// either way, so N silent ticks leave the same state as N observed ticks.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<EngineEvent>,
    silent: bool,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: EngineEvent) {
        if !self.silent {
            self.events.push(event);
        }
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Take every pending event, leaving the sink empty
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
