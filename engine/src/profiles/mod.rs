//! Game profiles: per-game constants and the registrations they push into
//! the rules and effect systems at service start.

pub mod nwn1;

use crate::effects::EffectSystem;
use crate::resources::ResourceManager;
use crate::rules::Rules;
use crate::twoda_cache::TwoDACache;

/// A game profile wires its tables and callbacks into the generic engine.
pub trait GameProfile {
    fn name(&self) -> &str;

    /// Registers modifiers, clamps, and 2DA tables into the rules service.
    fn load_rules(
        &self,
        rules: &mut Rules,
        twodas: &mut TwoDACache,
        resman: &ResourceManager,
    ) -> bool;

    /// Registers effect callbacks and item-property tables.
    fn load_effects(
        &self,
        effects: &mut EffectSystem,
        twodas: &mut TwoDACache,
        resman: &ResourceManager,
    ) -> bool;
}
