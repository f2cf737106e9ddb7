//! Effects: pooled value records plus the registry that applies and removes
//! them. Registered apply/remove callbacks are the only place gameplay state
//! transitions touch effect-bearing fields on objects.

use std::collections::HashMap;
use std::rc::Rc;

use aurora_core::twoda::TwoDA;
use serde_json::Value;

use crate::objects::pool::{Handle, HandlePool};
use crate::objects::GameObject;
use crate::rules::system::Versus;
use crate::strings::Strings;

pub type EffectHandle = Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationKind {
    #[default]
    Instant,
    Temporary,
    Permanent,
}

/// A transient gameplay modifier. Value-typed but pooled; the handle is the
/// identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effect {
    handle: EffectHandle,
    // Object currently carrying this effect; the default handle means none.
    applied_to: Handle,
    pub effect_type: u32,
    pub subtype: i32,
    pub creator: Handle,
    pub duration_kind: DurationKind,
    pub duration: f32,
    ints: [i32; 8],
    floats: [f32; 4],
    strings: [String; 4],
    pub versus: Versus,
}

impl Effect {
    pub fn new(effect_type: u32) -> Effect {
        Effect {
            effect_type,
            ..Effect::default()
        }
    }

    pub fn handle(&self) -> EffectHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: EffectHandle) {
        self.handle = handle;
    }

    /// Handle of the object this effect is applied to, if any.
    pub fn applied_to(&self) -> Option<Handle> {
        (self.applied_to != Handle::default()).then_some(self.applied_to)
    }

    pub fn get_int(&self, index: usize) -> i32 {
        self.ints.get(index).copied().unwrap_or(0)
    }

    pub fn set_int(&mut self, index: usize, value: i32) {
        match self.ints.get_mut(index) {
            Some(slot) => *slot = value,
            None => log::warn!("effect: int index {} out of range", index),
        }
    }

    pub fn get_float(&self, index: usize) -> f32 {
        self.floats.get(index).copied().unwrap_or(0.0)
    }

    pub fn set_float(&mut self, index: usize, value: f32) {
        match self.floats.get_mut(index) {
            Some(slot) => *slot = value,
            None => log::warn!("effect: float index {} out of range", index),
        }
    }

    pub fn get_string(&self, index: usize) -> &str {
        self.strings.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn set_string(&mut self, index: usize, value: impl Into<String>) {
        match self.strings.get_mut(index) {
            Some(slot) => *slot = value.into(),
            None => log::warn!("effect: string index {} out of range", index),
        }
    }

    /// Resets everything except the pool identity.
    pub fn clear(&mut self) {
        let handle = self.handle;
        *self = Effect::default();
        self.handle = handle;
    }
}

/// Apply or remove callback. Returning `false` vetoes the transition.
pub type EffectFunc = fn(&mut GameObject, &Effect) -> bool;

/// An item property value, the itemized cousin of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemProperty {
    pub prop_type: u16,
    pub subtype: u16,
    pub cost_value: u16,
    pub param_value: u8,
}

impl Default for ItemProperty {
    fn default() -> Self {
        ItemProperty {
            prop_type: 0,
            subtype: 0xFFFF,
            cost_value: 0,
            param_value: 0xFF,
        }
    }
}

/// Table-driven definition of one item-property type.
#[derive(Debug, Clone, Default)]
pub struct ItemPropDef {
    /// Name strref.
    pub name: u32,
    /// Sheet whose rows name the subtypes (strrefs in a `Name` column).
    pub subtype_names: Option<Rc<TwoDA>>,
    /// Index into the registered cost tables.
    pub cost_table: Option<usize>,
    /// Index into the registered param tables.
    pub param_table: Option<usize>,
}

/// Pool-size snapshot for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSystemStats {
    pub free_list_size: usize,
    pub pool_size: usize,
}

/// Effect type → (apply, remove) registry plus the effect pool and the
/// item-property tables.
#[derive(Default)]
pub struct EffectSystem {
    registry: HashMap<u32, (Option<EffectFunc>, Option<EffectFunc>)>,
    pool: HandlePool<Effect>,
    ip_cost_tables: Vec<Rc<TwoDA>>,
    ip_param_tables: Vec<Rc<TwoDA>>,
    ip_definitions: HashMap<u16, ItemPropDef>,
}

impl EffectSystem {
    pub fn new() -> EffectSystem {
        EffectSystem::default()
    }

    /// Registers callbacks for an effect type; `false` if already present.
    pub fn add(
        &mut self,
        effect_type: u32,
        apply: Option<EffectFunc>,
        remove: Option<EffectFunc>,
    ) -> bool {
        if self.registry.contains_key(&effect_type) {
            log::warn!("effects: type {} registered twice", effect_type);
            return false;
        }
        self.registry.insert(effect_type, (apply, remove));
        true
    }

    pub fn create(&mut self, effect_type: u32) -> EffectHandle {
        let handle = self.pool.create(Effect::new(effect_type));
        if let Some(effect) = self.pool.get_mut(handle) {
            effect.set_handle(handle);
        }
        handle
    }

    pub fn destroy(&mut self, handle: EffectHandle) -> bool {
        self.pool.destroy(handle)
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&Effect> {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: EffectHandle) -> Option<&mut Effect> {
        self.pool.get_mut(handle)
    }

    pub fn valid(&self, handle: EffectHandle) -> bool {
        self.pool.valid(handle)
    }

    pub fn stats(&self) -> EffectSystemStats {
        EffectSystemStats {
            free_list_size: self.pool.free_list_len(),
            pool_size: self.pool.slot_count(),
        }
    }

    /// Applies an effect to an object. On success the effect joins the
    /// object's effect list; a live effect sits in at most one list.
    /// Unknown types, null callbacks, dead handles, and re-application are
    /// no-ops returning `false`.
    pub fn apply(&mut self, obj: &mut GameObject, handle: EffectHandle) -> bool {
        {
            let Some(effect) = self.pool.get(handle) else {
                log::warn!("effects: apply of dead effect handle");
                return false;
            };
            if effect.applied_to().is_some() || obj.common().effects.contains(&handle) {
                log::warn!("effects: effect already applied");
                return false;
            }
            let Some(&(Some(apply), _)) = self.registry.get(&effect.effect_type) else {
                return false;
            };
            if !apply(obj, effect) {
                return false;
            }
        }
        obj.common_mut().effects.push(handle);
        if let Some(effect) = self.pool.get_mut(handle) {
            effect.applied_to = obj.common().handle;
        }
        true
    }

    /// Removes a previously applied effect, symmetric to [`apply`].
    ///
    /// [`apply`]: EffectSystem::apply
    pub fn remove(&mut self, obj: &mut GameObject, handle: EffectHandle) -> bool {
        {
            let Some(effect) = self.pool.get(handle) else {
                log::warn!("effects: remove of dead effect handle");
                return false;
            };
            if !obj.common().effects.contains(&handle) {
                log::warn!("effects: effect not on object");
                return false;
            }
            let Some(&(_, Some(remove))) = self.registry.get(&effect.effect_type) else {
                return false;
            };
            if !remove(obj, effect) {
                return false;
            }
        }
        obj.common_mut().effects.retain(|&h| h != handle);
        if let Some(effect) = self.pool.get_mut(handle) {
            effect.applied_to = Handle::default();
        }
        true
    }

    /// Savegame projection of an object's applied effects.
    pub fn effects_to_json(&self, obj: &GameObject) -> Value {
        let list: Vec<Value> = obj
            .common()
            .effects
            .iter()
            .filter_map(|&h| self.pool.get(h))
            .map(|e| {
                serde_json::json!({
                    "type": e.effect_type,
                    "subtype": e.subtype,
                    "duration": e.duration,
                    "ints": e.ints.to_vec(),
                    "floats": e.floats.to_vec(),
                    "strings": e.strings.to_vec(),
                })
            })
            .collect();
        Value::Array(list)
    }

    pub fn register_ip_cost_table(&mut self, table: Rc<TwoDA>) -> usize {
        self.ip_cost_tables.push(table);
        self.ip_cost_tables.len() - 1
    }

    pub fn register_ip_param_table(&mut self, table: Rc<TwoDA>) -> usize {
        self.ip_param_tables.push(table);
        self.ip_param_tables.len() - 1
    }

    pub fn ip_cost_table(&self, index: usize) -> Option<Rc<TwoDA>> {
        self.ip_cost_tables.get(index).cloned()
    }

    pub fn ip_param_table(&self, index: usize) -> Option<Rc<TwoDA>> {
        self.ip_param_tables.get(index).cloned()
    }

    pub fn add_ip_definition(&mut self, prop_type: u16, def: ItemPropDef) {
        self.ip_definitions.insert(prop_type, def);
    }

    pub fn ip_definition(&self, prop_type: u16) -> Option<&ItemPropDef> {
        self.ip_definitions.get(&prop_type)
    }

    /// Renders an item property for display, e.g.
    /// `"Enhancement Bonus: Strength +6"`.
    pub fn itemprop_to_string(&self, ip: &ItemProperty, strings: &Strings) -> String {
        let Some(def) = self.ip_definitions.get(&ip.prop_type) else {
            return String::new();
        };
        let mut out = strings.get(def.name).to_string();

        if ip.subtype != 0xFFFF {
            if let Some(table) = &def.subtype_names {
                if let Some(strref) = table.get::<i32>(ip.subtype as usize, "Name") {
                    let name = strings.get(strref as u32);
                    if !name.is_empty() {
                        out.push_str(": ");
                        out.push_str(name);
                    }
                }
            }
        }

        if let Some(cost_index) = def.cost_table {
            if let Some(table) = self.ip_cost_tables.get(cost_index) {
                if let Some(strref) = table.get::<i32>(ip.cost_value as usize, "Name") {
                    let name = strings.get(strref as u32);
                    if !name.is_empty() {
                        out.push(' ');
                        out.push_str(name);
                    }
                }
            }
        }
        out
    }

    /// Drops pooled effects and item-property tables; registered callbacks
    /// survive module turnover.
    pub fn clear_pool(&mut self) {
        self.pool.clear();
        self.ip_cost_tables.clear();
        self.ip_param_tables.clear();
        self.ip_definitions.clear();
    }

    pub fn clear(&mut self) {
        self.clear_pool();
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_accessors_are_bounds_checked() {
        let mut eff = Effect::new(1);
        eff.set_string(2, "my string");
        assert_eq!(eff.get_string(2), "my string");
        assert_eq!(eff.get_int(3), 0);
        eff.set_int(3, 9);
        assert_eq!(eff.get_int(3), 9);

        // Out of range reads default, writes are dropped.
        eff.set_int(100, 1);
        assert_eq!(eff.get_int(100), 0);
        assert_eq!(eff.get_string(99), "");

        eff.set_float(0, 2.5);
        eff.clear();
        assert_eq!(eff.get_float(0), 0.0);
        assert_eq!(eff.get_int(3), 0);
    }

    #[test]
    fn pool_create_destroy_cycle() {
        let mut sys = EffectSystem::new();
        let handles: Vec<EffectHandle> = (0..100).map(|_| sys.create(35)).collect();
        assert_eq!(sys.stats().pool_size, 100);
        for h in handles {
            assert!(sys.destroy(h));
        }
        let stats = sys.stats();
        assert!(stats.free_list_size >= 100);
        assert_eq!(sys.get(EffectHandle::default()), None);
    }

    #[test]
    fn effect_identity() {
        let mut sys = EffectSystem::new();
        let h = sys.create(7);
        let eff = sys.get(h).unwrap();
        assert_eq!(eff.handle(), h);
        assert_eq!(eff.effect_type, 7);
        assert!(sys.valid(h));
        sys.destroy(h);
        assert!(!sys.valid(h));
    }

    #[test]
    fn double_registration_is_refused() {
        fn nop(_: &mut GameObject, _: &Effect) -> bool {
            true
        }
        let mut sys = EffectSystem::new();
        assert!(sys.add(1, Some(nop), Some(nop)));
        assert!(!sys.add(1, Some(nop), Some(nop)));
    }
}
