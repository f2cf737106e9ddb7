//! Fields shared by every game object.

use std::collections::HashMap;

use aurora_core::locstring::LocString;
use aurora_core::resref::Resref;

use crate::effects::EffectHandle;

use super::pool::Handle;

pub type ObjectHandle = Handle;

/// Shared identity composed into every object variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Common {
    pub resref: Resref,
    pub tag: String,
    pub name: LocString,
    /// Pool identity, assigned on insertion.
    pub handle: ObjectHandle,
    /// Effects currently applied; owned by the effect system's lifecycle.
    pub(crate) effects: Vec<EffectHandle>,
    /// Local integer variables.
    pub locals: HashMap<String, i32>,
}

impl Common {
    pub fn effects(&self) -> &[EffectHandle] {
        &self.effects
    }
}

/// Event-script slots. Object kinds populate the slots they use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptRefs {
    pub on_attacked: Resref,
    pub on_blocked: Resref,
    pub on_conversation: Resref,
    pub on_damaged: Resref,
    pub on_death: Resref,
    pub on_disturbed: Resref,
    pub on_endround: Resref,
    pub on_enter: Resref,
    pub on_exit: Resref,
    pub on_heartbeat: Resref,
    pub on_perception: Resref,
    pub on_rested: Resref,
    pub on_spawn: Resref,
    pub on_spell_cast_at: Resref,
    pub on_user_defined: Resref,
}

/// Discriminator for the object variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    Creature = 1,
    Item = 2,
    Door = 3,
    Placeable = 4,
    Trigger = 5,
    Sound = 6,
    Store = 7,
    Encounter = 8,
    Waypoint = 9,
    Area = 10,
    Module = 11,
    Player = 12,
}
