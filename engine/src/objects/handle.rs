//! Typed 64-bit handles and the runtime object pool that multiplexes
//! effects and events in one storage.

use crate::effects::Effect;

use super::pool::{Handle, HandlePool};

pub const TYPE_NONE: u8 = 0;
pub const TYPE_EFFECT: u8 = 1;
pub const TYPE_EVENT: u8 = 2;

/// A pool handle carrying a small type tag, packed into 64 bits as
/// 24-bit id | 8-bit type | 32-bit generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypedHandle {
    pub id: u32,
    pub type_tag: u8,
    pub generation: u32,
}

impl TypedHandle {
    pub fn to_ull(self) -> u64 {
        (self.id as u64 & 0x00FF_FFFF)
            | ((self.type_tag as u64) << 24)
            | ((self.generation as u64) << 32)
    }

    pub fn from_ull(value: u64) -> TypedHandle {
        TypedHandle {
            id: (value & 0x00FF_FFFF) as u32,
            type_tag: ((value >> 24) & 0xFF) as u8,
            generation: (value >> 32) as u32,
        }
    }

    fn untyped(self) -> Handle {
        Handle {
            index: self.id,
            generation: self.generation,
        }
    }
}

/// A transient scripted event; effects' sibling in the runtime pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventObject {
    pub ints: [i32; EventObject::NUM_INTS],
    pub floats: [f32; 4],
}

impl EventObject {
    pub const NUM_INTS: usize = 6;

    pub fn num_ints(&self) -> usize {
        Self::NUM_INTS
    }
}

/// What a runtime slot holds.
pub enum RuntimeObject {
    Effect(Effect),
    Event(EventObject),
}

impl RuntimeObject {
    fn type_tag(&self) -> u8 {
        match self {
            RuntimeObject::Effect(_) => TYPE_EFFECT,
            RuntimeObject::Event(_) => TYPE_EVENT,
        }
    }
}

/// One storage for both effects and events, resolved by typed handle.
#[derive(Default)]
pub struct RuntimeObjectPool {
    pool: HandlePool<RuntimeObject>,
}

impl RuntimeObjectPool {
    pub fn new() -> RuntimeObjectPool {
        RuntimeObjectPool::default()
    }

    fn allocate(&mut self, value: RuntimeObject) -> TypedHandle {
        let type_tag = value.type_tag();
        let handle = self.pool.create(value);
        debug_assert!(handle.index <= 0x00FF_FFFF);
        TypedHandle {
            id: handle.index,
            type_tag,
            generation: handle.generation,
        }
    }

    pub fn allocate_effect(&mut self, effect_type: u32) -> TypedHandle {
        self.allocate(RuntimeObject::Effect(Effect::new(effect_type)))
    }

    pub fn allocate_event(&mut self) -> TypedHandle {
        self.allocate(RuntimeObject::Event(EventObject::default()))
    }

    pub fn get(&self, handle: TypedHandle) -> Option<&RuntimeObject> {
        let obj = self.pool.get(handle.untyped())?;
        (obj.type_tag() == handle.type_tag).then_some(obj)
    }

    pub fn get_mut(&mut self, handle: TypedHandle) -> Option<&mut RuntimeObject> {
        let obj = self.pool.get_mut(handle.untyped())?;
        (obj.type_tag() == handle.type_tag).then_some(obj)
    }

    pub fn valid(&self, handle: TypedHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn destroy(&mut self, handle: TypedHandle) -> bool {
        if !self.valid(handle) {
            log::warn!("runtime pool: destroy of dead typed handle");
            return false;
        }
        self.pool.destroy(handle.untyped())
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_dispatch() {
        let mut pool = RuntimeObjectPool::new();

        let eff = pool.allocate_effect(35);
        assert_eq!(eff.type_tag, TYPE_EFFECT);
        assert!(pool.valid(eff));

        let evt = pool.allocate_event();
        assert_eq!(evt.type_tag, TYPE_EVENT);
        assert!(pool.valid(evt));

        match pool.get(eff).unwrap() {
            RuntimeObject::Effect(e) => assert_eq!(e.effect_type, 35),
            RuntimeObject::Event(_) => panic!("effect handle resolved to an event"),
        }
        match pool.get(evt).unwrap() {
            RuntimeObject::Event(e) => assert_eq!(e.num_ints(), 6),
            RuntimeObject::Effect(_) => panic!("event handle resolved to an effect"),
        }

        // A forged handle with the wrong tag does not resolve.
        let forged = TypedHandle {
            type_tag: TYPE_EVENT,
            ..eff
        };
        assert!(pool.get(forged).is_none());
    }

    #[test]
    fn invalid_handles() {
        let mut pool = RuntimeObjectPool::new();
        let invalid = TypedHandle::default();
        assert!(!pool.valid(invalid));
        assert!(pool.get(invalid).is_none());

        let eff = pool.allocate_effect(1);
        assert!(pool.destroy(eff));
        assert!(!pool.valid(eff));
        assert!(!pool.destroy(eff));
    }

    #[test]
    fn packing_is_bit_exact() {
        let h = TypedHandle {
            id: 12345,
            type_tag: TYPE_EFFECT,
            generation: 67890,
        };
        let packed = h.to_ull();
        let back = TypedHandle::from_ull(packed);
        assert_eq!(back.id, 12345);
        assert_eq!(back.type_tag, TYPE_EFFECT);
        assert_eq!(back.generation, 67890);
        assert_eq!(back, h);

        let max = TypedHandle {
            id: 0x00FF_FFFF,
            type_tag: 0xFF,
            generation: u32::MAX,
        };
        assert_eq!(TypedHandle::from_ull(max.to_ull()), max);
    }
}
