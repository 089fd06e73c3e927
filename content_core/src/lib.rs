//! content_core - Static content tables for the idle combat engine
//!
//! This library provides the read-only definitions the engine consumes:
//! - Enemy templates, equipment items, status-effect and skill definitions
//! - Mission and achievement definitions
//! - The rarity registry and tunable game constants
//!
//! Content is loaded from TOML files (or the embedded built-in set) into a
//! [`ContentRegistry`], which the engine borrows; the registry never changes
//! at runtime.

mod achievement;
mod effect;
mod enemy;
mod item;
mod mission;
mod registry;
mod skill;
mod tuning;
mod types;

pub use achievement::{AchievementDefinition, AchievementMetric, AchievementReward};
pub use effect::{EffectDefinition, EffectKind, PeriodicAction, StatModifier};
pub use enemy::EnemyTemplate;
pub use item::EquipmentItem;
pub use mission::{AreaModifier, MissionDefinition, MissionReward};
pub use registry::ContentRegistry;
pub use skill::{SkillBehavior, SkillDefinition, SkillKind};
pub use tuning::Tuning;
pub use types::{
    roll_rarity, EquipmentSlot, OnHitEffect, Rarity, StatKey, UnlockRequirement,
};

use std::path::PathBuf;
use thiserror::Error;

/// Error loading or validating content tables
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error reading '{path:?}': {error}")]
    Io {
        error: std::io::Error,
        path: Option<PathBuf>,
    },
    #[error("Parse error{}: {error}", path.as_ref().map(|p| format!(" in '{}'", p.display())).unwrap_or_default())]
    Parse {
        error: Box<toml::de::Error>,
        path: Option<PathBuf>,
    },
    #[error("Validation error: {0}")]
    Validation(String),
}
