//! The creature object and its blueprint (de)serializers, the worked
//! example for GFF ↔ struct ↔ JSON round trips.

use aurora_core::gff::{GffBuilder, GffStruct, GffValue};
use aurora_core::locstring::LocString;
use aurora_core::resref::Resref;
use serde_json::{Map, Value};

use super::common::{Common, ScriptRefs};
use super::SerializationProfile;

/// Ability scores, skill ranks, and feats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatureStats {
    abilities: [u8; 6],
    skills: Vec<u8>,
    feats: Vec<u32>,
}

impl CreatureStats {
    pub fn get_ability_score(&self, id: u32) -> i32 {
        self.abilities.get(id as usize).copied().unwrap_or(0) as i32
    }

    pub fn set_ability_score(&mut self, id: u32, score: u8) {
        if let Some(slot) = self.abilities.get_mut(id as usize) {
            *slot = score;
        }
    }

    pub fn get_skill_rank(&self, id: u32) -> i32 {
        self.skills.get(id as usize).copied().unwrap_or(0) as i32
    }

    pub fn set_skill_rank(&mut self, id: u32, rank: u8) {
        if id as usize >= self.skills.len() {
            self.skills.resize(id as usize + 1, 0);
        }
        self.skills[id as usize] = rank;
    }

    pub fn skills(&self) -> &[u8] {
        &self.skills
    }

    pub fn has_feat(&self, feat: u32) -> bool {
        self.feats.binary_search(&feat).is_ok()
    }

    pub fn add_feat(&mut self, feat: u32) {
        if let Err(pos) = self.feats.binary_search(&feat) {
            self.feats.insert(pos, feat);
        }
    }

    pub fn feats(&self) -> &[u32] {
        &self.feats
    }
}

/// Body-part model selections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyParts {
    pub belt: u8,
    pub left_bicep: u8,
    pub left_foot: u8,
    pub left_forearm: u8,
    pub left_hand: u8,
    pub left_shin: u8,
    pub left_shoulder: u8,
    pub left_thigh: u8,
    pub neck: u8,
    pub pelvis: u8,
    pub right_bicep: u8,
    pub right_foot: u8,
    pub right_forearm: u8,
    pub right_hand: u8,
    pub right_shin: u8,
    pub right_shoulder: u8,
    pub right_thigh: u8,
    pub torso: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatureAppearance {
    pub id: u16,
    pub portrait_id: u16,
    pub phenotype: i32,
    pub tail: u32,
    pub wings: u32,
    pub body_parts: BodyParts,
    pub hair: u8,
    pub skin: u8,
    pub tattoo1: u8,
    pub tattoo2: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassEntry {
    pub class: i32,
    pub level: i16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelStats {
    pub entries: Vec<ClassEntry>,
}

impl LevelStats {
    /// Total character level.
    pub fn level(&self) -> i32 {
        self.entries.iter().map(|e| e.level as i32).sum()
    }

    pub fn class_level(&self, class: i32) -> i32 {
        self.entries
            .iter()
            .find(|e| e.class == class)
            .map(|e| e.level as i32)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecialAbility {
    pub spell: u16,
    pub caster_level: u8,
    pub flags: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatInfo {
    pub ac_natural_bonus: i32,
    pub special_abilities: Vec<SpecialAbility>,
}

/// A creature instance or blueprint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Creature {
    pub common: Common,
    pub scripts: ScriptRefs,
    pub stats: CreatureStats,
    pub appearance: CreatureAppearance,
    pub levels: LevelStats,
    pub combat_info: CombatInfo,
    pub gender: u8,
    pub race: u8,
    pub soundset: u16,
    pub hp: i16,
    pub hp_current: i16,
    pub hp_max: i16,
    pub alignment_lawchaos: u8,
    pub alignment_goodevil: u8,
    /// Transient haste counter, maintained by the effect system.
    pub hasted: i32,
}

/// Blueprint-load progression, reported when a load dies partway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadStage {
    Parsing,
    FieldsExtracted,
    NestedListsLoaded,
}

const SCRIPT_LABELS: &[(&str, fn(&mut ScriptRefs) -> &mut Resref)] = &[
    ("ScriptAttacked", |s| &mut s.on_attacked),
    ("ScriptDamaged", |s| &mut s.on_damaged),
    ("ScriptDeath", |s| &mut s.on_death),
    ("ScriptDialogue", |s| &mut s.on_conversation),
    ("ScriptDisturbed", |s| &mut s.on_disturbed),
    ("ScriptEndRound", |s| &mut s.on_endround),
    ("ScriptHeartbeat", |s| &mut s.on_heartbeat),
    ("ScriptOnBlocked", |s| &mut s.on_blocked),
    ("ScriptOnNotice", |s| &mut s.on_perception),
    ("ScriptRested", |s| &mut s.on_rested),
    ("ScriptSpawn", |s| &mut s.on_spawn),
    ("ScriptSpellAt", |s| &mut s.on_spell_cast_at),
    ("ScriptUserDefine", |s| &mut s.on_user_defined),
];

const ABILITY_LABELS: [&str; 6] = ["Str", "Dex", "Con", "Int", "Wis", "Cha"];

impl Creature {
    /// Deserializes a creature from a parsed GFF struct. On failure the
    /// partially-built value is discarded and the caller receives `None`.
    pub fn from_gff(s: &GffStruct<'_>, profile: SerializationProfile) -> Option<Creature> {
        let mut stage = LoadStage::Parsing;
        let result = Self::from_gff_inner(s, profile, &mut stage);
        if result.is_none() {
            log::warn!("creature: load failed at stage {:?}", stage);
        }
        result
    }

    fn from_gff_inner(
        s: &GffStruct<'_>,
        profile: SerializationProfile,
        stage: &mut LoadStage,
    ) -> Option<Creature> {
        if s.is_empty() {
            return None;
        }

        let mut cre = Creature::default();

        // Identity is the one hard requirement of a blueprint.
        cre.common.resref = s.get::<Resref>("TemplateResRef")?;
        s.get_to("Tag", &mut cre.common.tag);
        s.get_to("FirstName", &mut cre.common.name);
        s.get_to("Gender", &mut cre.gender);
        s.get_to("Race", &mut cre.race);
        s.get_to("SoundSetFile", &mut cre.soundset);
        s.get_to("HitPoints", &mut cre.hp);
        s.get_to("CurrentHitPoints", &mut cre.hp_current);
        s.get_to("MaxHitPoints", &mut cre.hp_max);
        s.get_to("LawfulChaotic", &mut cre.alignment_lawchaos);
        s.get_to("GoodEvil", &mut cre.alignment_goodevil);

        for (i, label) in ABILITY_LABELS.iter().enumerate() {
            if let Some(score) = s.get::<u8>(label) {
                cre.stats.set_ability_score(i as u32, score);
            }
        }

        let mut natural_ac = 0u8;
        s.get_to("NaturalAC", &mut natural_ac);
        cre.combat_info.ac_natural_bonus = natural_ac as i32;

        for (label, slot) in SCRIPT_LABELS {
            if let Some(r) = s.get::<Resref>(label) {
                *slot(&mut cre.scripts) = r;
            }
        }

        Self::appearance_from_gff(s, &mut cre.appearance);
        *stage = LoadStage::FieldsExtracted;

        if let Some(skills) = s.field("SkillList") {
            for item in skills.list_iter() {
                cre.stats.skills.push(item.get::<u8>("Rank").unwrap_or(0));
            }
        }
        if let Some(feats) = s.field("FeatList") {
            for item in feats.list_iter() {
                cre.stats.add_feat(item.get::<u16>("Feat")? as u32);
            }
        }
        if let Some(classes) = s.field("ClassList") {
            for item in classes.list_iter() {
                cre.levels.entries.push(ClassEntry {
                    class: item.get::<i32>("Class")?,
                    level: item.get::<i16>("ClassLevel").unwrap_or(1),
                });
            }
        }
        if let Some(abilities) = s.field("SpecAbilityList") {
            for item in abilities.list_iter() {
                cre.combat_info.special_abilities.push(SpecialAbility {
                    spell: item.get::<u16>("Spell")?,
                    caster_level: item.get::<u8>("SpellCasterLevel").unwrap_or(1),
                    flags: item.get::<u8>("SpellFlags").unwrap_or(1),
                });
            }
        }
        *stage = LoadStage::NestedListsLoaded;

        if profile == SerializationProfile::Savegame {
            s.get_to("HastedState", &mut cre.hasted);
        }
        Some(cre)
    }

    fn appearance_from_gff(s: &GffStruct<'_>, appearance: &mut CreatureAppearance) {
        // Newer assets carry dword tail/wings; fall back to the byte form.
        if !s.get_to("Tail_New", &mut appearance.tail) {
            if let Some(old) = s.get::<u8>("Tail") {
                appearance.tail = old as u32;
            }
        }
        if !s.get_to("Wings_New", &mut appearance.wings) {
            if let Some(old) = s.get::<u8>("Wings") {
                appearance.wings = old as u32;
            }
        }

        s.get_to("Appearance_Type", &mut appearance.id);
        s.get_to("PortraitId", &mut appearance.portrait_id);
        s.get_to("Phenotype", &mut appearance.phenotype);

        let bp = &mut appearance.body_parts;
        s.get_to("BodyPart_Belt", &mut bp.belt);
        s.get_to("BodyPart_LBicep", &mut bp.left_bicep);
        s.get_to("BodyPart_LFArm", &mut bp.left_forearm);
        s.get_to("BodyPart_LFoot", &mut bp.left_foot);
        s.get_to("BodyPart_LHand", &mut bp.left_hand);
        s.get_to("BodyPart_LShin", &mut bp.left_shin);
        s.get_to("BodyPart_LShoul", &mut bp.left_shoulder);
        s.get_to("BodyPart_LThigh", &mut bp.left_thigh);
        s.get_to("BodyPart_Neck", &mut bp.neck);
        s.get_to("BodyPart_Pelvis", &mut bp.pelvis);
        s.get_to("BodyPart_RBicep", &mut bp.right_bicep);
        s.get_to("BodyPart_RFArm", &mut bp.right_forearm);
        // The legacy label for the right foot really is ArmorPart_.
        s.get_to("ArmorPart_RFoot", &mut bp.right_foot);
        s.get_to("BodyPart_RHand", &mut bp.right_hand);
        s.get_to("BodyPart_RShin", &mut bp.right_shin);
        s.get_to("BodyPart_RShoul", &mut bp.right_shoulder);
        s.get_to("BodyPart_RThigh", &mut bp.right_thigh);
        s.get_to("BodyPart_Torso", &mut bp.torso);
        s.get_to("Color_Hair", &mut appearance.hair);
        s.get_to("Color_Skin", &mut appearance.skin);
        s.get_to("Color_Tattoo1", &mut appearance.tattoo1);
        s.get_to("Color_Tattoo2", &mut appearance.tattoo2);
    }

    /// Serializes to a canonical GFF builder.
    pub fn to_gff(&self, profile: SerializationProfile) -> GffBuilder {
        let mut b = GffBuilder::new("UTC");
        let root = b.root();

        b.add(root, "TemplateResRef", GffValue::Resref(self.common.resref));
        b.add(root, "Tag", GffValue::String(self.common.tag.clone()));
        b.add(root, "FirstName", GffValue::LocString(self.common.name.clone()));
        b.add(root, "Gender", GffValue::Byte(self.gender));
        b.add(root, "Race", GffValue::Byte(self.race));
        b.add(root, "SoundSetFile", GffValue::Word(self.soundset));
        b.add(root, "HitPoints", GffValue::Short(self.hp));
        b.add(root, "CurrentHitPoints", GffValue::Short(self.hp_current));
        b.add(root, "MaxHitPoints", GffValue::Short(self.hp_max));
        b.add(root, "LawfulChaotic", GffValue::Byte(self.alignment_lawchaos));
        b.add(root, "GoodEvil", GffValue::Byte(self.alignment_goodevil));
        b.add(root, "NaturalAC", GffValue::Byte(self.combat_info.ac_natural_bonus as u8));

        for (i, label) in ABILITY_LABELS.iter().enumerate() {
            b.add(root, label, GffValue::Byte(self.stats.abilities[i]));
        }

        let mut scripts = self.scripts.clone();
        for (label, slot) in SCRIPT_LABELS {
            b.add(root, label, GffValue::Resref(*slot(&mut scripts)));
        }

        self.appearance_to_gff(&mut b);

        let skills = b.add_list(root, "SkillList");
        for &rank in &self.stats.skills {
            let s = b.list_append(skills, 0);
            b.add(s, "Rank", GffValue::Byte(rank));
        }
        let feats = b.add_list(root, "FeatList");
        for &feat in &self.stats.feats {
            let s = b.list_append(feats, 1);
            b.add(s, "Feat", GffValue::Word(feat as u16));
        }
        let classes = b.add_list(root, "ClassList");
        for entry in &self.levels.entries {
            let s = b.list_append(classes, 2);
            b.add(s, "Class", GffValue::Int(entry.class));
            b.add(s, "ClassLevel", GffValue::Short(entry.level));
        }
        let specs = b.add_list(root, "SpecAbilityList");
        for ability in &self.combat_info.special_abilities {
            let s = b.list_append(specs, 4);
            b.add(s, "Spell", GffValue::Word(ability.spell));
            b.add(s, "SpellCasterLevel", GffValue::Byte(ability.caster_level));
            b.add(s, "SpellFlags", GffValue::Byte(ability.flags));
        }

        if profile == SerializationProfile::Savegame {
            b.add(root, "HastedState", GffValue::Int(self.hasted));
        }
        b
    }

    fn appearance_to_gff(&self, b: &mut GffBuilder) {
        let root = b.root();
        let a = &self.appearance;
        b.add(root, "Appearance_Type", GffValue::Word(a.id));
        b.add(root, "PortraitId", GffValue::Word(a.portrait_id));
        b.add(root, "Phenotype", GffValue::Int(a.phenotype));
        b.add(root, "Tail_New", GffValue::Dword(a.tail));
        b.add(root, "Wings_New", GffValue::Dword(a.wings));

        let bp = &a.body_parts;
        b.add(root, "BodyPart_Belt", GffValue::Byte(bp.belt));
        b.add(root, "BodyPart_LBicep", GffValue::Byte(bp.left_bicep));
        b.add(root, "BodyPart_LFArm", GffValue::Byte(bp.left_forearm));
        b.add(root, "BodyPart_LFoot", GffValue::Byte(bp.left_foot));
        b.add(root, "BodyPart_LHand", GffValue::Byte(bp.left_hand));
        b.add(root, "BodyPart_LShin", GffValue::Byte(bp.left_shin));
        b.add(root, "BodyPart_LShoul", GffValue::Byte(bp.left_shoulder));
        b.add(root, "BodyPart_LThigh", GffValue::Byte(bp.left_thigh));
        b.add(root, "BodyPart_Neck", GffValue::Byte(bp.neck));
        b.add(root, "BodyPart_Pelvis", GffValue::Byte(bp.pelvis));
        b.add(root, "BodyPart_RBicep", GffValue::Byte(bp.right_bicep));
        b.add(root, "BodyPart_RFArm", GffValue::Byte(bp.right_forearm));
        b.add(root, "ArmorPart_RFoot", GffValue::Byte(bp.right_foot));
        b.add(root, "BodyPart_RHand", GffValue::Byte(bp.right_hand));
        b.add(root, "BodyPart_RShin", GffValue::Byte(bp.right_shin));
        b.add(root, "BodyPart_RShoul", GffValue::Byte(bp.right_shoulder));
        b.add(root, "BodyPart_RThigh", GffValue::Byte(bp.right_thigh));
        b.add(root, "BodyPart_Torso", GffValue::Byte(bp.torso));
        b.add(root, "Color_Hair", GffValue::Byte(a.hair));
        b.add(root, "Color_Skin", GffValue::Byte(a.skin));
        b.add(root, "Color_Tattoo1", GffValue::Byte(a.tattoo1));
        b.add(root, "Color_Tattoo2", GffValue::Byte(a.tattoo2));
    }

    /// JSON projection using the same labels as the GFF form.
    pub fn to_json(&self, profile: SerializationProfile) -> Value {
        let builder = self.to_gff(profile);
        let gff = aurora_core::gff::Gff::from_bytes(&builder.to_bytes());
        aurora_core::gff_json::gff_to_json(&gff).unwrap_or(Value::Null)
    }

    /// Inverse of [`Creature::to_json`]; also accepts any GFF projection of
    /// a creature.
    pub fn from_json(value: &Value, profile: SerializationProfile) -> Option<Creature> {
        let obj = value.as_object()?;
        let builder = json_to_builder(obj)?;
        let gff = aurora_core::gff::Gff::from_bytes(&builder.to_bytes());
        if !gff.valid() {
            return None;
        }
        Creature::from_gff(&gff.toplevel(), profile)
    }
}

/// Rehydrates a creature JSON object into GFF form using the creature
/// schema to restore field types.
fn json_to_builder(obj: &Map<String, Value>) -> Option<GffBuilder> {
    let mut b = GffBuilder::new("UTC");
    let root = b.root();
    for (key, value) in obj {
        if key == aurora_core::gff_json::STRUCT_ID_KEY {
            continue;
        }
        match key.as_str() {
            "TemplateResRef" => {
                b.add(root, key, GffValue::Resref(Resref::from(value.as_str()?)))
            }
            "Tag" => b.add(root, key, GffValue::String(value.as_str()?.to_string())),
            "FirstName" => {
                let loc: LocString = serde_json::from_value(value.clone()).ok()?;
                b.add(root, key, GffValue::LocString(loc));
            }
            "SoundSetFile" | "Appearance_Type" | "PortraitId" => {
                b.add(root, key, GffValue::Word(value.as_u64()? as u16))
            }
            "HitPoints" | "CurrentHitPoints" | "MaxHitPoints" => {
                b.add(root, key, GffValue::Short(value.as_i64()? as i16))
            }
            "Phenotype" | "HastedState" => {
                b.add(root, key, GffValue::Int(value.as_i64()? as i32))
            }
            "Tail_New" | "Wings_New" => {
                b.add(root, key, GffValue::Dword(value.as_u64()? as u32))
            }
            "SkillList" => {
                let list = b.add_list(root, key);
                for item in value.as_array()? {
                    let s = b.list_append(list, 0);
                    b.add(s, "Rank", GffValue::Byte(item.get("Rank")?.as_u64()? as u8));
                }
            }
            "FeatList" => {
                let list = b.add_list(root, key);
                for item in value.as_array()? {
                    let s = b.list_append(list, 1);
                    b.add(s, "Feat", GffValue::Word(item.get("Feat")?.as_u64()? as u16));
                }
            }
            "ClassList" => {
                let list = b.add_list(root, key);
                for item in value.as_array()? {
                    let s = b.list_append(list, 2);
                    b.add(s, "Class", GffValue::Int(item.get("Class")?.as_i64()? as i32));
                    b.add(
                        s,
                        "ClassLevel",
                        GffValue::Short(item.get("ClassLevel")?.as_i64()? as i16),
                    );
                }
            }
            "SpecAbilityList" => {
                let list = b.add_list(root, key);
                for item in value.as_array()? {
                    let s = b.list_append(list, 4);
                    b.add(s, "Spell", GffValue::Word(item.get("Spell")?.as_u64()? as u16));
                    b.add(
                        s,
                        "SpellCasterLevel",
                        GffValue::Byte(item.get("SpellCasterLevel")?.as_u64()? as u8),
                    );
                    b.add(
                        s,
                        "SpellFlags",
                        GffValue::Byte(item.get("SpellFlags")?.as_u64()? as u8),
                    );
                }
            }
            _ if value.is_string() => {
                // Remaining strings are script resrefs.
                b.add(root, key, GffValue::Resref(Resref::from(value.as_str()?)));
            }
            _ => {
                // Remaining scalars are byte-sized.
                b.add(root, key, GffValue::Byte(value.as_u64()? as u8));
            }
        }
    }
    Some(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::gff::Gff;
    use aurora_core::locstring::Language;

    pub(crate) fn chicken() -> Creature {
        let mut cre = Creature::default();
        cre.common.resref = Resref::from("nw_chicken");
        cre.common.tag = "NW_CHICKEN".to_string();
        let mut name = LocString::new(0xFFFF_FFFF);
        name.add(Language::English, "Chicken", false);
        cre.common.name = name;
        cre.gender = 1;
        cre.race = 20;
        cre.soundset = 211;
        cre.hp = 1;
        cre.hp_current = 1;
        cre.hp_max = 1;
        cre.stats.set_ability_score(0, 3);
        cre.stats.set_ability_score(1, 7);
        cre.stats.set_ability_score(2, 10);
        cre.stats.set_ability_score(3, 2);
        cre.stats.set_ability_score(4, 11);
        cre.stats.set_ability_score(5, 5);
        cre.stats.set_skill_rank(3, 0);
        cre.stats.add_feat(289);
        cre.scripts.on_attacked = Resref::from("nw_c2_default5");
        cre.appearance.id = 31;
        cre.appearance.body_parts.left_shin = 1;
        cre.levels.entries.push(ClassEntry { class: 12, level: 1 });
        cre.combat_info.special_abilities.push(SpecialAbility {
            spell: 120,
            caster_level: 1,
            flags: 1,
        });
        cre
    }

    #[test]
    fn gff_round_trip_preserves_everything() {
        let cre = chicken();
        let bytes = cre.to_gff(SerializationProfile::Blueprint).to_bytes();
        let gff = Gff::from_bytes(&bytes);
        assert!(gff.valid());
        assert_eq!(gff.content_type(), "UTC");

        let back = Creature::from_gff(&gff.toplevel(), SerializationProfile::Blueprint).unwrap();
        assert_eq!(back, cre);
        assert_eq!(back.stats.get_ability_score(1), 7);
        assert_eq!(back.scripts.on_attacked, "nw_c2_default5");
        assert_eq!(back.appearance.id, 31);
        assert_eq!(back.gender, 1);
        assert_eq!(back.levels.class_level(12), 1);
        assert_eq!(back.combat_info.special_abilities[0].spell, 120);

        // Canonical bytes are stable across a rebuild.
        assert_eq!(back.to_gff(SerializationProfile::Blueprint).to_bytes(), bytes);
    }

    #[test]
    fn json_round_trip() {
        let cre = chicken();
        let json = cre.to_json(SerializationProfile::Blueprint);
        assert_eq!(json["TemplateResRef"], Value::from("nw_chicken"));
        assert_eq!(json["Dex"], Value::from(7));

        let back = Creature::from_json(&json, SerializationProfile::Blueprint).unwrap();
        assert_eq!(back, cre);
    }

    #[test]
    fn savegame_profile_keeps_transient_counters() {
        let mut cre = chicken();
        cre.hasted = 2;

        let blueprint = cre.to_gff(SerializationProfile::Blueprint).to_bytes();
        let gff = Gff::from_bytes(&blueprint);
        let back = Creature::from_gff(&gff.toplevel(), SerializationProfile::Blueprint).unwrap();
        assert_eq!(back.hasted, 0);

        let save = cre.to_gff(SerializationProfile::Savegame).to_bytes();
        let gff = Gff::from_bytes(&save);
        let back = Creature::from_gff(&gff.toplevel(), SerializationProfile::Savegame).unwrap();
        assert_eq!(back.hasted, 2);
    }

    #[test]
    fn missing_identity_fails_the_load() {
        let mut b = GffBuilder::new("UTC");
        let root = b.root();
        b.add(root, "Gender", GffValue::Byte(1));
        let gff = Gff::from_bytes(&b.to_bytes());
        assert!(Creature::from_gff(&gff.toplevel(), SerializationProfile::Blueprint).is_none());
    }

    #[test]
    fn legacy_tail_and_wings_fallback() {
        let mut b = GffBuilder::new("UTC");
        let root = b.root();
        b.add(root, "TemplateResRef", GffValue::Resref(Resref::from("x")));
        b.add(root, "Tail", GffValue::Byte(4));
        b.add(root, "Wings", GffValue::Byte(2));
        let gff = Gff::from_bytes(&b.to_bytes());
        let cre = Creature::from_gff(&gff.toplevel(), SerializationProfile::Blueprint).unwrap();
        assert_eq!(cre.appearance.tail, 4);
        assert_eq!(cre.appearance.wings, 2);
    }

    #[test]
    fn feats_are_sorted_for_lookup() {
        let mut stats = CreatureStats::default();
        stats.add_feat(90);
        stats.add_feat(2);
        stats.add_feat(40);
        stats.add_feat(40);
        assert_eq!(stats.feats(), &[2, 40, 90]);
        assert!(stats.has_feat(40));
        assert!(!stats.has_feat(41));
    }
}
