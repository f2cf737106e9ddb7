//! The first-edition profile: rule constants, effect callbacks, and
//! item-property builders.

use crate::effects::{Effect, EffectHandle, EffectSystem, ItemPropDef, ItemProperty};
use crate::objects::GameObject;
use crate::resources::ResourceManager;
use crate::rules::{Modifier, ModifierSource, ModifierValue, Rules, Selector};
use crate::twoda_cache::TwoDACache;

use super::GameProfile;

pub const ABILITY_STRENGTH: u32 = 0;
pub const ABILITY_DEXTERITY: u32 = 1;
pub const ABILITY_CONSTITUTION: u32 = 2;
pub const ABILITY_INTELLIGENCE: u32 = 3;
pub const ABILITY_WISDOM: u32 = 4;
pub const ABILITY_CHARISMA: u32 = 5;

pub const SKILL_ANIMAL_EMPATHY: u32 = 0;
pub const SKILL_CONCENTRATION: u32 = 1;
pub const SKILL_DISABLE_TRAP: u32 = 2;
pub const SKILL_DISCIPLINE: u32 = 3;

pub const CLASS_TYPE_BARBARIAN: i32 = 0;
pub const CLASS_TYPE_BARD: i32 = 1;
pub const CLASS_TYPE_CLERIC: i32 = 2;
pub const CLASS_TYPE_DRUID: i32 = 3;
pub const CLASS_TYPE_FIGHTER: i32 = 4;
pub const CLASS_TYPE_MONK: i32 = 5;
pub const CLASS_TYPE_PALADIN: i32 = 6;

pub const EFFECT_TYPE_HASTE: u32 = 35;

pub const IP_ABILITY_BONUS: u16 = 0;
pub const IP_HASTE: u16 = 59;

/// Attribute keys fed by the ability clamp registrations.
pub const ABILITY_ATTRIBUTES: [&str; 6] = [
    "ability-strength",
    "ability-dexterity",
    "ability-constitution",
    "ability-intelligence",
    "ability-wisdom",
    "ability-charisma",
];

pub fn effect_haste_apply(obj: &mut GameObject, _effect: &Effect) -> bool {
    match obj.as_creature_mut() {
        Some(cre) => {
            cre.hasted += 1;
            true
        }
        None => false,
    }
}

pub fn effect_haste_remove(obj: &mut GameObject, _effect: &Effect) -> bool {
    match obj.as_creature_mut() {
        Some(cre) => {
            if cre.hasted > 0 {
                cre.hasted -= 1;
            }
            true
        }
        None => false,
    }
}

/// Creates a pooled haste effect.
pub fn effect_haste(effects: &mut EffectSystem) -> EffectHandle {
    effects.create(EFFECT_TYPE_HASTE)
}

pub fn itemprop_haste() -> ItemProperty {
    ItemProperty {
        prop_type: IP_HASTE,
        ..ItemProperty::default()
    }
}

pub fn itemprop_ability_modifier(ability: u32, value: u16) -> ItemProperty {
    ItemProperty {
        prop_type: IP_ABILITY_BONUS,
        subtype: ability as u16,
        cost_value: value,
        ..ItemProperty::default()
    }
}

fn dex_ac_bonus(obj: &GameObject) -> i32 {
    let dex = Selector::Ability(ABILITY_DEXTERITY).select(obj).unwrap_or(10);
    (dex - 10) / 2
}

pub struct Nwn1Profile;

impl GameProfile for Nwn1Profile {
    fn name(&self) -> &str {
        "nwn1"
    }

    fn load_rules(
        &self,
        rules: &mut Rules,
        twodas: &mut TwoDACache,
        resman: &ResourceManager,
    ) -> bool {
        for attribute in ABILITY_ATTRIBUTES {
            rules.set_clamp(attribute, 3, 50);
        }

        rules.add_modifier(Modifier::new(
            "armor-class",
            "base-armor",
            ModifierValue::Constant(10),
            ModifierSource::Unknown,
        ));
        rules.add_modifier(Modifier::new(
            "armor-class",
            "dex-modifier",
            ModifierValue::Callback(dex_ac_bonus),
            ModifierSource::Ability,
        ));

        // Table loads are soft: a bare environment simply has no sheets.
        let mut all = true;
        all &= rules.load_classes(twodas, resman);
        all &= rules.load_feats(twodas, resman);
        all &= rules.load_skills(twodas, resman);
        all
    }

    fn load_effects(
        &self,
        effects: &mut EffectSystem,
        twodas: &mut TwoDACache,
        resman: &ResourceManager,
    ) -> bool {
        effects.add(
            EFFECT_TYPE_HASTE,
            Some(effect_haste_apply),
            Some(effect_haste_remove),
        );

        // Item-property tables, when the sheets are present.
        if let Some(cost_index) = twodas.get(resman, "iprp_costtable") {
            for row in 0..cost_index.rows() {
                let Some(name) = cost_index.get::<String>(row, "Name") else {
                    continue;
                };
                match twodas.get(resman, &name.to_ascii_lowercase()) {
                    Some(sheet) => {
                        effects.register_ip_cost_table(sheet);
                    }
                    None => log::warn!("nwn1: missing cost table {}", name),
                }
            }
        }
        if let Some(param_index) = twodas.get(resman, "iprp_paramtable") {
            for row in 0..param_index.rows() {
                let Some(name) = param_index.get::<String>(row, "TableResRef") else {
                    continue;
                };
                match twodas.get(resman, &name.to_ascii_lowercase()) {
                    Some(sheet) => {
                        effects.register_ip_param_table(sheet);
                    }
                    None => log::warn!("nwn1: missing param table {}", name),
                }
            }
        }

        let Some(defs) = twodas.get(resman, "itempropdef") else {
            return true;
        };
        for row in 0..defs.rows() {
            let Some(name) = defs.get::<i32>(row, "Name") else {
                continue;
            };
            let subtype_names = defs
                .get::<String>(row, "SubTypeResRef")
                .and_then(|r| twodas.get(resman, &r.to_ascii_lowercase()));
            let def = ItemPropDef {
                name: name as u32,
                subtype_names,
                cost_table: defs.get::<i32>(row, "CostTableResRef").map(|v| v as usize),
                param_table: defs.get::<i32>(row, "Param1ResRef").map(|v| v as usize),
            };
            effects.add_ip_definition(row as u16, def);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::creature::Creature;
    use crate::resources::Directory;
    use crate::strings::Strings;
    use aurora_core::tlk::Tlk;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{prefix}_{pid}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn haste_apply_remove_is_symmetric() {
        let mut obj = GameObject::Creature(Creature::default());
        let eff = Effect::new(EFFECT_TYPE_HASTE);

        assert!(effect_haste_apply(&mut obj, &eff));
        assert_eq!(obj.as_creature().unwrap().hasted, 1);
        assert!(effect_haste_remove(&mut obj, &eff));
        assert_eq!(obj.as_creature().unwrap().hasted, 0);
        // Removal clamps at zero.
        assert!(effect_haste_remove(&mut obj, &eff));
        assert_eq!(obj.as_creature().unwrap().hasted, 0);

        let mut door = GameObject::Door(crate::objects::Door::default());
        assert!(!effect_haste_apply(&mut door, &eff));
    }

    #[test]
    fn armor_class_pipeline() {
        let rm = ResourceManager::new();
        let mut twodas = TwoDACache::new();
        let mut rules = Rules::new();
        Nwn1Profile.load_rules(&mut rules, &mut twodas, &rm);

        let mut cre = Creature::default();
        cre.stats.set_ability_score(ABILITY_DEXTERITY, 16);
        let obj = GameObject::Creature(cre);
        assert_eq!(rules.calculate(&obj, "armor-class", None), 13);
    }

    #[test]
    fn itemprop_tables_and_rendering() {
        let dir = unique_temp_dir("nwn1_iprp");
        fs::write(
            dir.join("itempropdef.2da"),
            "2DA V2.0\n\n   Name  SubTypeResRef   CostTableResRef  Param1ResRef\n\
0  649   IPRP_ABILITIES  0                ****\n\
1  700   ****            ****             ****\n",
        )
        .unwrap();
        fs::write(
            dir.join("iprp_costtable.2da"),
            "2DA V2.0\n\n   Name\n0  IPRP_BONUSCOST\n",
        )
        .unwrap();
        fs::write(
            dir.join("iprp_paramtable.2da"),
            "2DA V2.0\n\n   TableResRef\n0  IPRP_COLOR\n",
        )
        .unwrap();
        fs::write(
            dir.join("iprp_bonuscost.2da"),
            "2DA V2.0\n\n   Name\n0  ****\n1  801\n2  802\n3  803\n4  804\n5  805\n6  806\n",
        )
        .unwrap();
        fs::write(
            dir.join("iprp_color.2da"),
            "2DA V2.0\n\n   Name\n0  900\n",
        )
        .unwrap();
        fs::write(
            dir.join("iprp_abilities.2da"),
            "2DA V2.0\n\n   Name\n0  760\n1  761\n",
        )
        .unwrap();

        let mut rm = ResourceManager::new();
        rm.add_container(Box::new(Directory::new(&dir)));
        let mut twodas = TwoDACache::new();
        let mut effects = EffectSystem::new();
        assert!(Nwn1Profile.load_effects(&mut effects, &mut twodas, &rm));

        assert!(effects.ip_cost_table(0).is_some());
        assert!(effects.ip_param_table(0).is_some());
        assert_eq!(effects.ip_definition(IP_ABILITY_BONUS).unwrap().name, 649);

        let mut dialog = Tlk::new(0);
        dialog.set(649, "Enhancement Bonus");
        dialog.set(760, "Strength");
        dialog.set(806, "+6");
        let mut strings = Strings::new();
        strings.set_dialog_tlk(dialog);

        let ip = itemprop_ability_modifier(ABILITY_STRENGTH, 6);
        assert_eq!(
            effects.itemprop_to_string(&ip, &strings),
            "Enhancement Bonus: Strength +6"
        );
    }
}
