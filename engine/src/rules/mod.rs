//! The rules service: requirement evaluation, modifier accumulation with
//! stacking and clamping, and the 2DA-driven class/feat/skill tables.

pub mod dice;
pub mod system;

use std::collections::{BTreeMap, HashMap};

use crate::objects::creature::Creature;
use crate::objects::GameObject;
use crate::resources::ResourceManager;
use crate::twoda_cache::TwoDACache;

pub use system::{
    alignment_flags, AlignmentAxis, AlignmentFlags, Modifier, ModifierSource, ModifierValue,
    Qualifier, Requirement, Selector, Versus,
};

/// One row of `classes.2da`, with its attack-bonus progression resolved.
#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub label: String,
    pub name: u32,
    pub hit_die: i32,
    /// Base attack bonus by level, from the class's `cls_atk_*` sheet.
    pub attack_bonus_table: Option<Vec<i32>>,
}

/// One row of `feat.2da`.
#[derive(Debug, Clone, Default)]
pub struct FeatInfo {
    pub label: String,
    pub name: u32,
    pub requirement: Requirement,
}

/// One row of `skills.2da`.
#[derive(Debug, Clone, Default)]
pub struct SkillInfo {
    pub label: String,
    pub name: u32,
    pub key_ability: String,
    pub untrained: bool,
}

/// Declarative rules evaluation over pooled objects and 2DA data.
#[derive(Default)]
pub struct Rules {
    modifiers: Vec<Modifier>,
    clamps: HashMap<String, (i32, i32)>,
    pub classes: Vec<ClassInfo>,
    pub feats: Vec<FeatInfo>,
    pub skills: Vec<SkillInfo>,
}

impl Rules {
    pub fn new() -> Rules {
        Rules::default()
    }

    pub fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    /// Drops every modifier carrying `tag`; returns how many went.
    pub fn remove_modifiers(&mut self, tag: &str) -> usize {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.tag != tag);
        before - self.modifiers.len()
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Clamp bounds applied to an attribute's final value.
    pub fn set_clamp(&mut self, attribute: impl Into<String>, min: i32, max: i32) {
        self.clamps.insert(attribute.into(), (min, max));
    }

    /// Whether `obj` satisfies the requirement: all qualifiers under
    /// conjunction, any one under disjunction.
    pub fn meets_requirement(&self, req: &Requirement, obj: &GameObject) -> bool {
        if req.qualifiers.is_empty() {
            return true;
        }
        if req.conjunction {
            req.qualifiers.iter().all(|q| q.matches(obj))
        } else {
            req.qualifiers.iter().any(|q| q.matches(obj))
        }
    }

    /// The qualifier that sank the requirement, for diagnostics. `None`
    /// when the requirement holds.
    pub fn failing_qualifier<'a>(
        &self,
        req: &'a Requirement,
        obj: &GameObject,
    ) -> Option<&'a Qualifier> {
        if self.meets_requirement(req, obj) {
            return None;
        }
        if req.conjunction {
            req.qualifiers.iter().find(|q| !q.matches(obj))
        } else {
            req.qualifiers.first()
        }
    }

    /// Accumulates every modifier feeding `attribute`.
    ///
    /// Stacking: identical `(subtype, source)` pairs take the maximum,
    /// different pairs add, sources apply in priority order, and the final
    /// value is clamped per-attribute.
    pub fn calculate(
        &self,
        obj: &GameObject,
        attribute: &str,
        versus: Option<&Creature>,
    ) -> i32 {
        let mut buckets: BTreeMap<(ModifierSource, Option<i32>), i32> = BTreeMap::new();
        for modifier in &self.modifiers {
            if modifier.attribute != attribute {
                continue;
            }
            if !self.meets_requirement(&modifier.requirement, obj) {
                continue;
            }
            if !modifier.versus.applies_to(versus) {
                continue;
            }
            let value = modifier.evaluate(obj);
            buckets
                .entry((modifier.source, modifier.subtype))
                .and_modify(|v| *v = (*v).max(value))
                .or_insert(value);
        }

        let total: i32 = buckets.values().sum();
        match self.clamps.get(attribute) {
            Some(&(min, max)) => total.clamp(min, max),
            None => total,
        }
    }

    /// Loads `classes.2da` and each class's attack-bonus sheet.
    pub fn load_classes(&mut self, twodas: &mut TwoDACache, resman: &ResourceManager) -> bool {
        let Some(sheet) = twodas.get(resman, "classes") else {
            log::warn!("rules: classes.2da not available");
            return false;
        };
        self.classes.clear();
        for row in 0..sheet.rows() {
            let mut info = ClassInfo {
                label: sheet.get::<String>(row, "Label").unwrap_or_default(),
                name: sheet.get::<i32>(row, "Name").unwrap_or(0) as u32,
                hit_die: sheet.get::<i32>(row, "HitDie").unwrap_or(0),
                attack_bonus_table: None,
            };
            if let Some(table_name) = sheet.get::<String>(row, "AttackBonusTable") {
                if let Some(table) = twodas.get(resman, &table_name.to_ascii_lowercase()) {
                    let bab: Vec<i32> = (0..table.rows())
                        .map(|r| table.get::<i32>(r, "BAB").unwrap_or(0))
                        .collect();
                    info.attack_bonus_table = Some(bab);
                }
            }
            self.classes.push(info);
        }
        true
    }

    /// Loads `feat.2da`; prerequisite feats become requirement qualifiers.
    pub fn load_feats(&mut self, twodas: &mut TwoDACache, resman: &ResourceManager) -> bool {
        let Some(sheet) = twodas.get(resman, "feat") else {
            log::warn!("rules: feat.2da not available");
            return false;
        };
        self.feats.clear();
        for row in 0..sheet.rows() {
            let mut qualifiers = Vec::new();
            for col in ["PREREQFEAT1", "PREREQFEAT2"] {
                if let Some(feat) = sheet.get::<i32>(row, col) {
                    qualifiers.push(Qualifier::feat(feat as u32));
                }
            }
            if let Some(min_str) = sheet.get::<i32>(row, "MINSTR") {
                qualifiers.push(Qualifier::ability(0, min_str, 0));
            }
            self.feats.push(FeatInfo {
                label: sheet.get::<String>(row, "LABEL").unwrap_or_default(),
                name: sheet.get::<i32>(row, "FEAT").unwrap_or(0) as u32,
                requirement: Requirement::new(qualifiers),
            });
        }
        true
    }

    /// Loads `skills.2da`.
    pub fn load_skills(&mut self, twodas: &mut TwoDACache, resman: &ResourceManager) -> bool {
        let Some(sheet) = twodas.get(resman, "skills") else {
            log::warn!("rules: skills.2da not available");
            return false;
        };
        self.skills.clear();
        for row in 0..sheet.rows() {
            self.skills.push(SkillInfo {
                label: sheet.get::<String>(row, "Label").unwrap_or_default(),
                name: sheet.get::<i32>(row, "Name").unwrap_or(0) as u32,
                key_ability: sheet.get::<String>(row, "KeyAbility").unwrap_or_default(),
                untrained: sheet.get::<i32>(row, "Untrained").unwrap_or(0) != 0,
            });
        }
        true
    }

    /// Base attack bonus summed over class levels via the loaded tables.
    pub fn attack_bonus(&self, cre: &Creature) -> i32 {
        let mut result = 0;
        for entry in &cre.levels.entries {
            let Some(info) = self.classes.get(entry.class as usize) else {
                continue;
            };
            let Some(table) = &info.attack_bonus_table else {
                continue;
            };
            if entry.level < 1 {
                continue;
            }
            let row = (entry.level as usize - 1).min(table.len().saturating_sub(1));
            result += table.get(row).copied().unwrap_or(0);
        }
        result
    }

    /// Feat ids whose prerequisites `obj` currently satisfies and which it
    /// does not already have.
    pub fn available_feats(&self, obj: &GameObject) -> Vec<u32> {
        let Some(cre) = obj.as_creature() else {
            return Vec::new();
        };
        self.feats
            .iter()
            .filter(|f| !cre.stats.has_feat(f.name))
            .filter(|f| self.meets_requirement(&f.requirement, obj))
            .map(|f| f.name)
            .collect()
    }

    /// Drops 2DA-derived tables; registered modifiers and clamps stay.
    pub fn clear_tables(&mut self) {
        self.classes.clear();
        self.feats.clear();
        self.skills.clear();
    }
}
