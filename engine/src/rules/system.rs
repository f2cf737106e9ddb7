//! The declarative rules triple: selectors read object state, qualifiers
//! test it, modifiers contribute to a derived attribute.

use bitflags::bitflags;

use crate::objects::creature::Creature;
use crate::objects::GameObject;

bitflags! {
    /// Alignment test flags for one axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AlignmentFlags: u8 {
        const NEUTRAL = 0x01;
        const LAWFUL  = 0x02;
        const CHAOTIC = 0x04;
        const GOOD    = 0x08;
        const EVIL    = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentAxis {
    LawChaos,
    GoodEvil,
}

/// Flags describing a creature's position on one axis. Scores run 0..=100;
/// 70 and above is lawful/good, 30 and below chaotic/evil.
pub fn alignment_flags(axis: AlignmentAxis, score: i32) -> AlignmentFlags {
    match axis {
        AlignmentAxis::LawChaos => {
            if score >= 70 {
                AlignmentFlags::LAWFUL
            } else if score <= 30 {
                AlignmentFlags::CHAOTIC
            } else {
                AlignmentFlags::NEUTRAL
            }
        }
        AlignmentAxis::GoodEvil => {
            if score >= 70 {
                AlignmentFlags::GOOD
            } else if score <= 30 {
                AlignmentFlags::EVIL
            } else {
                AlignmentFlags::NEUTRAL
            }
        }
    }
}

/// Reads one property of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Ability(u32),
    Skill(u32),
    ClassLevel(i32),
    Feat(u32),
    Level,
    Alignment(AlignmentAxis),
    Race,
    LocalVarInt(String),
}

impl Selector {
    /// The selected value; `None` when the object has no such property.
    pub fn select(&self, obj: &GameObject) -> Option<i32> {
        match self {
            Selector::LocalVarInt(name) => obj.common().locals.get(name).copied(),
            _ => {
                let cre = obj.as_creature()?;
                Some(match self {
                    Selector::Ability(id) => cre.stats.get_ability_score(*id),
                    Selector::Skill(id) => cre.stats.get_skill_rank(*id),
                    Selector::ClassLevel(id) => cre.levels.class_level(*id),
                    Selector::Feat(id) => cre.stats.has_feat(*id) as i32,
                    Selector::Level => cre.levels.level(),
                    Selector::Alignment(axis) => match axis {
                        AlignmentAxis::LawChaos => cre.alignment_lawchaos as i32,
                        AlignmentAxis::GoodEvil => cre.alignment_goodevil as i32,
                    },
                    Selector::Race => cre.race as i32,
                    Selector::LocalVarInt(_) => unreachable!(),
                })
            }
        }
    }
}

/// Tests a selector against a range, set, or flag mask. A `max` of zero
/// means unbounded above.
#[derive(Debug, Clone, PartialEq)]
pub enum Qualifier {
    Ability { id: u32, min: i32, max: i32 },
    Skill { id: u32, min: i32, max: i32 },
    ClassLevel { id: i32, min: i32, max: i32 },
    Level { min: i32, max: i32 },
    Feat(u32),
    Race(u32),
    Alignment { axis: AlignmentAxis, flags: AlignmentFlags },
}

fn in_range(value: i32, min: i32, max: i32) -> bool {
    value >= min && (max == 0 || value <= max)
}

impl Qualifier {
    pub fn ability(id: u32, min: i32, max: i32) -> Qualifier {
        Qualifier::Ability { id, min, max }
    }

    pub fn skill(id: u32, min: i32) -> Qualifier {
        Qualifier::Skill { id, min, max: 0 }
    }

    pub fn class_level(id: i32, min: i32, max: i32) -> Qualifier {
        Qualifier::ClassLevel { id, min, max }
    }

    pub fn level(min: i32, max: i32) -> Qualifier {
        Qualifier::Level { min, max }
    }

    pub fn feat(id: u32) -> Qualifier {
        Qualifier::Feat(id)
    }

    pub fn race(id: u32) -> Qualifier {
        Qualifier::Race(id)
    }

    pub fn alignment(axis: AlignmentAxis, flags: AlignmentFlags) -> Qualifier {
        Qualifier::Alignment { axis, flags }
    }

    pub fn matches(&self, obj: &GameObject) -> bool {
        match self {
            Qualifier::Ability { id, min, max } => Selector::Ability(*id)
                .select(obj)
                .is_some_and(|v| in_range(v, *min, *max)),
            Qualifier::Skill { id, min, max } => Selector::Skill(*id)
                .select(obj)
                .is_some_and(|v| in_range(v, *min, *max)),
            Qualifier::ClassLevel { id, min, max } => Selector::ClassLevel(*id)
                .select(obj)
                .is_some_and(|v| in_range(v, *min, *max)),
            Qualifier::Level { min, max } => Selector::Level
                .select(obj)
                .is_some_and(|v| in_range(v, *min, *max)),
            Qualifier::Feat(id) => Selector::Feat(*id).select(obj) == Some(1),
            Qualifier::Race(id) => Selector::Race.select(obj) == Some(*id as i32),
            Qualifier::Alignment { axis, flags } => Selector::Alignment(*axis)
                .select(obj)
                .is_some_and(|v| flags.intersects(alignment_flags(*axis, v))),
        }
    }
}

/// A set of qualifiers, all of which (conjunction) or any of which
/// (disjunction) must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirement {
    pub qualifiers: Vec<Qualifier>,
    pub conjunction: bool,
}

impl Requirement {
    pub fn new(qualifiers: Vec<Qualifier>) -> Requirement {
        Requirement {
            qualifiers,
            conjunction: true,
        }
    }

    pub fn any(qualifiers: Vec<Qualifier>) -> Requirement {
        Requirement {
            qualifiers,
            conjunction: false,
        }
    }
}

/// Modifier/effect targeting restrictions; empty matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Versus {
    pub race: Option<u32>,
    pub alignment: AlignmentFlags,
}

impl Versus {
    pub fn applies_to(&self, target: Option<&Creature>) -> bool {
        let Some(cre) = target else {
            // No target: only unrestricted entries apply.
            return self.race.is_none() && self.alignment.is_empty();
        };
        if let Some(race) = self.race {
            if cre.race as u32 != race {
                return false;
            }
        }
        if !self.alignment.is_empty() {
            let lc = alignment_flags(AlignmentAxis::LawChaos, cre.alignment_lawchaos as i32);
            let ge = alignment_flags(AlignmentAxis::GoodEvil, cre.alignment_goodevil as i32);
            if !self.alignment.intersects(lc | ge) {
                return false;
            }
        }
        true
    }
}

/// Where a modifier's contribution comes from, in stacking-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModifierSource {
    Unknown,
    Ability,
    Skill,
    Feat,
    Race,
    Class,
    Item,
    Spell,
    Effect,
}

/// How a modifier computes its contribution.
#[derive(Clone)]
pub enum ModifierValue {
    Constant(i32),
    /// `floor(level * factor)`.
    PerLevel(f32),
    Callback(fn(&GameObject) -> i32),
}

impl std::fmt::Debug for ModifierValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModifierValue::Constant(v) => write!(f, "Constant({v})"),
            ModifierValue::PerLevel(v) => write!(f, "PerLevel({v})"),
            ModifierValue::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// One contribution to a derived attribute.
#[derive(Debug, Clone)]
pub struct Modifier {
    /// Attribute the contribution feeds, e.g. `"armor-class"`.
    pub attribute: String,
    /// Unique name, used for bookkeeping and removal.
    pub tag: String,
    pub subtype: Option<i32>,
    pub source: ModifierSource,
    pub value: ModifierValue,
    pub requirement: Requirement,
    pub versus: Versus,
}

impl Modifier {
    pub fn new(
        attribute: impl Into<String>,
        tag: impl Into<String>,
        value: ModifierValue,
        source: ModifierSource,
    ) -> Modifier {
        Modifier {
            attribute: attribute.into(),
            tag: tag.into(),
            subtype: None,
            source,
            value,
            requirement: Requirement::default(),
            versus: Versus::default(),
        }
    }

    pub fn with_subtype(mut self, subtype: i32) -> Modifier {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Modifier {
        self.requirement = requirement;
        self
    }

    pub fn with_versus(mut self, versus: Versus) -> Modifier {
        self.versus = versus;
        self
    }

    /// Evaluates the contribution for an object.
    pub fn evaluate(&self, obj: &GameObject) -> i32 {
        match &self.value {
            ModifierValue::Constant(v) => *v,
            ModifierValue::PerLevel(factor) => {
                let level = Selector::Level.select(obj).unwrap_or(0);
                (level as f32 * factor).floor() as i32
            }
            ModifierValue::Callback(f) => f(obj),
        }
    }
}
