//! Content registry: all static tables behind one instance
//!
//! Registries are plain values, not globals: the engine borrows one, and
//! independent game instances can hold different content sets.

use crate::achievement::{AchievementDefinition, AchievementReward};
use crate::effect::EffectDefinition;
use crate::enemy::EnemyTemplate;
use crate::item::EquipmentItem;
use crate::mission::MissionDefinition;
use crate::skill::{SkillBehavior, SkillDefinition};
use crate::tuning::Tuning;
use crate::types::{OnHitEffect, UnlockRequirement};
use crate::ContentError;
use serde::Deserialize;
use std::path::Path;

const BUILTIN_CONTENT: &str = include_str!("builtin_content.toml");

/// One TOML content file. Any section may be omitted; files merge in load
/// order with tuning taken from the last file that sets it.
#[derive(Debug, Default, Deserialize)]
struct ContentDocument {
    tuning: Option<Tuning>,
    #[serde(default)]
    effects: Vec<EffectDefinition>,
    #[serde(default)]
    skills: Vec<SkillDefinition>,
    #[serde(default)]
    enemies: Vec<EnemyTemplate>,
    #[serde(default)]
    equipment: Vec<EquipmentItem>,
    #[serde(default)]
    missions: Vec<MissionDefinition>,
    #[serde(default)]
    achievements: Vec<AchievementDefinition>,
}

/// All static content tables, keyed by stable string ids.
///
/// Tables keep declaration order; skill auto-use priority and unlock event
/// ordering depend on it. Lookups are linear scans — every table is small.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    pub tuning: Tuning,
    effects: Vec<EffectDefinition>,
    skills: Vec<SkillDefinition>,
    enemies: Vec<EnemyTemplate>,
    equipment: Vec<EquipmentItem>,
    missions: Vec<MissionDefinition>,
    achievements: Vec<AchievementDefinition>,
}

impl ContentRegistry {
    /// The embedded default content set
    pub fn builtin() -> Self {
        Self::parse_toml(BUILTIN_CONTENT).expect("builtin content tables are valid")
    }

    /// Parse a registry from a single TOML document
    pub fn parse_toml(content: &str) -> Result<Self, ContentError> {
        let document: ContentDocument =
            toml::from_str(content).map_err(|e| ContentError::Parse {
                error: Box::new(e),
                path: None,
            })?;
        let mut registry = Self::default();
        registry.merge(document);
        registry.validate()?;
        Ok(registry)
    }

    /// Load all `*.toml` files under a directory (recursively)
    pub fn load(dir: &Path) -> Result<Self, ContentError> {
        let mut registry = Self::default();
        registry.load_dir(dir)?;
        registry.validate()?;
        Ok(registry)
    }

    fn load_dir(&mut self, dir: &Path) -> Result<(), ContentError> {
        if !dir.exists() {
            return Ok(());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io {
            error: e,
            path: Some(dir.to_path_buf()),
        })?;

        let mut paths: Vec<_> = entries
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ContentError::Io {
                error: e,
                path: Some(dir.to_path_buf()),
            })?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        // Deterministic merge order regardless of directory iteration order
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.load_dir(&path)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                self.load_file(&path)?;
            }
        }

        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> Result<(), ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
            error: e,
            path: Some(path.to_path_buf()),
        })?;
        let document: ContentDocument =
            toml::from_str(&content).map_err(|e| ContentError::Parse {
                error: Box::new(e),
                path: Some(path.to_path_buf()),
            })?;
        self.merge(document);
        Ok(())
    }

    fn merge(&mut self, document: ContentDocument) {
        if let Some(tuning) = document.tuning {
            self.tuning = tuning;
        }
        self.effects.extend(document.effects);
        self.skills.extend(document.skills);
        self.enemies.extend(document.enemies);
        self.equipment.extend(document.equipment);
        self.missions.extend(document.missions);
        self.achievements.extend(document.achievements);
    }

    // === Lookups ===

    pub fn enemy(&self, id: &str) -> Option<&EnemyTemplate> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn effect(&self, id: &str) -> Option<&EffectDefinition> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| s.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&EquipmentItem> {
        self.equipment.iter().find(|i| i.id == id)
    }

    pub fn mission(&self, id: &str) -> Option<&MissionDefinition> {
        self.missions.iter().find(|m| m.id == id)
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }

    // === Iteration (declaration order) ===

    pub fn enemies(&self) -> &[EnemyTemplate] {
        &self.enemies
    }

    pub fn effects(&self) -> &[EffectDefinition] {
        &self.effects
    }

    pub fn skills(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn equipment(&self) -> &[EquipmentItem] {
        &self.equipment
    }

    pub fn missions(&self) -> &[MissionDefinition] {
        &self.missions
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    /// The enemy a fresh or repaired game state falls back to: the first
    /// template with no gate beyond level 1.
    pub fn default_enemy_id(&self) -> Option<&str> {
        self.enemies
            .iter()
            .find(|enemy| match &enemy.unlock {
                None => true,
                Some(UnlockRequirement::Level { value }) => *value <= 1,
                Some(_) => false,
            })
            .or_else(|| self.enemies.first())
            .map(|enemy| enemy.id.as_str())
    }

    // === Validation ===

    /// Check every cross-table reference
    fn validate(&self) -> Result<(), ContentError> {
        if self.enemies.is_empty() {
            return Err(ContentError::Validation(
                "content defines no enemies".to_string(),
            ));
        }

        for enemy in &self.enemies {
            self.check_on_hit(&enemy.on_hit_effects, &enemy.id)?;
            self.check_unlock(enemy.unlock.as_ref(), &enemy.id)?;
        }
        for item in &self.equipment {
            self.check_on_hit(&item.on_hit_effects, &item.id)?;
            self.check_unlock(item.unlock.as_ref(), &item.id)?;
        }
        for skill in &self.skills {
            if let SkillBehavior::ApplyEffect { effect_id } = &skill.behavior {
                if self.effect(effect_id).is_none() {
                    return Err(ContentError::Validation(format!(
                        "skill '{}' applies unknown effect '{}'",
                        skill.id, effect_id
                    )));
                }
            }
            self.check_unlock(skill.unlock.as_ref(), &skill.id)?;
        }
        for mission in &self.missions {
            if mission.enemy_pool.is_empty() {
                return Err(ContentError::Validation(format!(
                    "mission '{}' has an empty enemy pool",
                    mission.id
                )));
            }
            for enemy_id in &mission.enemy_pool {
                if self.enemy(enemy_id).is_none() {
                    return Err(ContentError::Validation(format!(
                        "mission '{}' references unknown enemy '{}'",
                        mission.id, enemy_id
                    )));
                }
            }
            self.check_unlock(mission.unlock.as_ref(), &mission.id)?;
        }
        for achievement in &self.achievements {
            if let Some(AchievementReward::Equipment { item_id }) = &achievement.reward {
                if self.item(item_id).is_none() {
                    return Err(ContentError::Validation(format!(
                        "achievement '{}' rewards unknown item '{}'",
                        achievement.id, item_id
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_on_hit(&self, effects: &[OnHitEffect], owner: &str) -> Result<(), ContentError> {
        for on_hit in effects {
            if self.effect(&on_hit.effect_id).is_none() {
                return Err(ContentError::Validation(format!(
                    "'{}' references unknown on-hit effect '{}'",
                    owner, on_hit.effect_id
                )));
            }
        }
        Ok(())
    }

    fn check_unlock(
        &self,
        unlock: Option<&UnlockRequirement>,
        owner: &str,
    ) -> Result<(), ContentError> {
        match unlock {
            Some(UnlockRequirement::Kills { enemy_id, .. }) => {
                if self.enemy(enemy_id).is_none() {
                    return Err(ContentError::Validation(format!(
                        "'{owner}' unlock references unknown enemy '{enemy_id}'"
                    )));
                }
            }
            Some(UnlockRequirement::Achievement { id }) => {
                if self.achievement(id).is_none() {
                    return Err(ContentError::Validation(format!(
                        "'{owner}' unlock references unknown achievement '{id}'"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_content_is_valid() {
        let registry = ContentRegistry::builtin();
        assert!(registry.enemy("training_dummy").is_some());
        assert!(registry.effect("poison").is_some());
        assert!(registry.skill("power_strike").is_some());
        assert!(registry.item("w1").is_some());
        assert!(registry.mission("training_patrol").is_some());
        assert!(registry.achievement("kill_10_enemies").is_some());
        assert_eq!(registry.default_enemy_id(), Some("training_dummy"));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let err = ContentRegistry::parse_toml(
            r#"
[[enemies]]
id = "rat"
name = "Rat"
level = 1
hp = 10.0
min_hit = 1.0
max_hit = 2.0
attack_interval_ms = 1000.0
accuracy = 10.0
evasion = 0.0
on_hit_effects = [{ effect_id = "nonexistent", chance = 0.5 }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
    }

    #[test]
    fn test_empty_content_rejected() {
        let err = ContentRegistry::parse_toml("").unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("enemies.toml")).unwrap();
        file.write_all(
            br#"
[[enemies]]
id = "slime"
name = "Slime"
level = 1
hp = 20.0
min_hit = 1.0
max_hit = 3.0
attack_interval_ms = 2000.0
accuracy = 20.0
evasion = 5.0
"#,
        )
        .unwrap();

        let registry = ContentRegistry::load(dir.path()).unwrap();
        assert!(registry.enemy("slime").is_some());
        assert_eq!(registry.default_enemy_id(), Some("slime"));
        // Tuning falls back to defaults when no file sets it
        assert_eq!(registry.tuning.tick_rate_ms, 100);
    }
}
