//! Pooled game objects: polymorphic storage behind generational handles,
//! tag and blueprint indices, and the vault player registry.

pub mod area;
pub mod common;
pub mod creature;
pub mod handle;
pub mod module;
pub mod player;
pub mod pool;

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use aurora_core::gff::Gff;
use aurora_core::resref::{Resource, ResourceType, Resref};

use crate::config::{Config, PathAlias};
use crate::effects::EffectHandle;
use crate::resources::ResourceManager;

pub use area::Area;
pub use common::{Common, ObjectHandle, ObjectKind, ScriptRefs};
pub use creature::Creature;
pub use module::Module;
pub use player::Player;
pub use pool::{Handle, HandlePool};

/// Which fields a blueprint (de)serializer includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationProfile {
    #[default]
    Any,
    Blueprint,
    Instance,
    Savegame,
}

macro_rules! plain_object {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub common: Common,
            pub scripts: ScriptRefs,
        }
    };
}

plain_object!(Item);
plain_object!(Door);
plain_object!(Placeable);
plain_object!(Trigger);
plain_object!(SoundObject);
plain_object!(Store);
plain_object!(Encounter);
plain_object!(Waypoint);

/// Tagged union over every object kind. Shared fields live in [`Common`];
/// dispatch is on the tag, not a virtual hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum GameObject {
    Creature(Creature),
    Item(Item),
    Door(Door),
    Placeable(Placeable),
    Trigger(Trigger),
    Sound(SoundObject),
    Store(Store),
    Encounter(Encounter),
    Waypoint(Waypoint),
    Area(Area),
    Module(Module),
    Player(Player),
}

impl GameObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GameObject::Creature(_) => ObjectKind::Creature,
            GameObject::Item(_) => ObjectKind::Item,
            GameObject::Door(_) => ObjectKind::Door,
            GameObject::Placeable(_) => ObjectKind::Placeable,
            GameObject::Trigger(_) => ObjectKind::Trigger,
            GameObject::Sound(_) => ObjectKind::Sound,
            GameObject::Store(_) => ObjectKind::Store,
            GameObject::Encounter(_) => ObjectKind::Encounter,
            GameObject::Waypoint(_) => ObjectKind::Waypoint,
            GameObject::Area(_) => ObjectKind::Area,
            GameObject::Module(_) => ObjectKind::Module,
            GameObject::Player(_) => ObjectKind::Player,
        }
    }

    pub fn common(&self) -> &Common {
        match self {
            GameObject::Creature(o) => &o.common,
            GameObject::Item(o) => &o.common,
            GameObject::Door(o) => &o.common,
            GameObject::Placeable(o) => &o.common,
            GameObject::Trigger(o) => &o.common,
            GameObject::Sound(o) => &o.common,
            GameObject::Store(o) => &o.common,
            GameObject::Encounter(o) => &o.common,
            GameObject::Waypoint(o) => &o.common,
            GameObject::Area(o) => &o.common,
            GameObject::Module(o) => &o.common,
            GameObject::Player(o) => &o.creature.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            GameObject::Creature(o) => &mut o.common,
            GameObject::Item(o) => &mut o.common,
            GameObject::Door(o) => &mut o.common,
            GameObject::Placeable(o) => &mut o.common,
            GameObject::Trigger(o) => &mut o.common,
            GameObject::Sound(o) => &mut o.common,
            GameObject::Store(o) => &mut o.common,
            GameObject::Encounter(o) => &mut o.common,
            GameObject::Waypoint(o) => &mut o.common,
            GameObject::Area(o) => &mut o.common,
            GameObject::Module(o) => &mut o.common,
            GameObject::Player(o) => &mut o.creature.common,
        }
    }

    /// The creature view; players expose their embedded creature.
    pub fn as_creature(&self) -> Option<&Creature> {
        match self {
            GameObject::Creature(c) => Some(c),
            GameObject::Player(p) => Some(&p.creature),
            _ => None,
        }
    }

    pub fn as_creature_mut(&mut self) -> Option<&mut Creature> {
        match self {
            GameObject::Creature(c) => Some(c),
            GameObject::Player(p) => Some(&mut p.creature),
            _ => None,
        }
    }

    pub fn as_area(&self) -> Option<&Area> {
        match self {
            GameObject::Area(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self {
            GameObject::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn effects(&self) -> &[EffectHandle] {
        self.common().effects()
    }
}

/// Object storage plus the secondary indices over it.
#[derive(Default)]
pub struct ObjectManager {
    pool: HandlePool<GameObject>,
    // Lowercased tag → handles in creation order.
    by_tag: HashMap<String, Vec<ObjectHandle>>,
    // Parsed blueprint cache; instances are fresh, the parse is shared.
    templates: HashMap<Resource, Rc<Gff>>,
    players: HashMap<(String, String), ObjectHandle>,
}

impl ObjectManager {
    pub fn new() -> ObjectManager {
        ObjectManager::default()
    }

    /// Inserts an object, assigning its handle and indexing its tag.
    pub fn insert(&mut self, obj: GameObject) -> ObjectHandle {
        let tag = obj.common().tag.to_ascii_lowercase();
        let handle = self.pool.create(obj);
        if let Some(slot) = self.pool.get_mut(handle) {
            slot.common_mut().handle = handle;
        }
        if !tag.is_empty() {
            self.by_tag.entry(tag).or_default().push(handle);
        }
        handle
    }

    pub fn make_creature(&mut self) -> ObjectHandle {
        self.insert(GameObject::Creature(Creature::default()))
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&GameObject> {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut GameObject> {
        self.pool.get_mut(handle)
    }

    pub fn creature(&self, handle: ObjectHandle) -> Option<&Creature> {
        self.get(handle)?.as_creature()
    }

    pub fn valid(&self, handle: ObjectHandle) -> bool {
        self.pool.valid(handle)
    }

    /// Live objects.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// The cached parse of a blueprint, shared across loads.
    pub fn template(&mut self, resman: &ResourceManager, res: Resource) -> Option<Rc<Gff>> {
        if let Some(cached) = self.templates.get(&res) {
            return Some(cached.clone());
        }
        let data = resman.demand(&res);
        if data.is_empty() {
            return None;
        }
        let gff = Gff::from_bytes(&data.bytes);
        if !gff.valid() {
            log::warn!("objects: blueprint {} is corrupt", res);
            return None;
        }
        let shared = Rc::new(gff);
        self.templates.insert(res, shared.clone());
        Some(shared)
    }

    /// Loads a fresh creature instance from its blueprint. The handle is
    /// allocated first and destroyed if any load stage fails.
    pub fn load_creature(
        &mut self,
        resman: &ResourceManager,
        resref: &str,
    ) -> Option<ObjectHandle> {
        let res = Resource::new(Resref::from(resref), ResourceType::Utc);
        let gff = self.template(resman, res)?;

        let handle = self.insert(GameObject::Creature(Creature::default()));
        match Creature::from_gff(&gff.toplevel(), SerializationProfile::Blueprint) {
            Some(mut cre) => {
                cre.common.handle = handle;
                let tag = cre.common.tag.to_ascii_lowercase();
                if let Some(slot) = self.pool.get_mut(handle) {
                    *slot = GameObject::Creature(cre);
                }
                if !tag.is_empty() {
                    self.by_tag.entry(tag).or_default().push(handle);
                }
                Some(handle)
            }
            None => {
                self.destroy(handle);
                None
            }
        }
    }

    /// Loads a creature from a loose `.utc` or `.utc.json` file.
    pub fn load_creature_file(&mut self, path: impl AsRef<Path>) -> Option<ObjectHandle> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(err) => {
                log::error!("objects: read {}: {}", path.display(), err);
                return None;
            }
        };

        let cre = if path.extension().is_some_and(|e| e == "json") {
            let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
            Creature::from_json(&value, SerializationProfile::Any)?
        } else {
            let gff = Gff::from_bytes(&bytes);
            if !gff.valid() {
                return None;
            }
            Creature::from_gff(&gff.toplevel(), SerializationProfile::Any)?
        };
        Some(self.insert(GameObject::Creature(cre)))
    }

    /// The `nth` live object carrying `tag`, in creation order.
    pub fn get_by_tag(&self, tag: &str, nth: usize) -> Option<ObjectHandle> {
        self.by_tag
            .get(&tag.to_ascii_lowercase())?
            .iter()
            .copied()
            .filter(|&h| self.pool.valid(h))
            .nth(nth)
    }

    /// Loads a vault character. The cdkey must name the vault directory the
    /// `.bic` lives in; a mismatch is a plain miss.
    pub fn load_player(
        &mut self,
        config: &Config,
        cdkey: &str,
        name: &str,
    ) -> Option<ObjectHandle> {
        let key = (cdkey.to_string(), name.to_string());
        if let Some(&existing) = self.players.get(&key) {
            if self.pool.valid(existing) {
                return Some(existing);
            }
        }

        let path = config
            .alias_path(PathAlias::ServerVault)
            .join(cdkey)
            .join(format!("{name}.bic"));
        if !path.is_file() {
            log::info!("objects: no vault character at {}", path.display());
            return None;
        }
        let gff = Gff::from_file(&path);
        if !gff.valid() {
            return None;
        }
        let player = Player::from_gff(&gff.toplevel(), cdkey, name)?;
        let handle = self.insert(GameObject::Player(player));
        self.players.insert(key, handle);
        Some(handle)
    }

    /// Destroys an object; areas and modules destroy their children first,
    /// in stored order.
    pub fn destroy(&mut self, handle: ObjectHandle) -> bool {
        let Some(obj) = self.pool.get(handle) else {
            log::warn!("objects: destroy of dead handle");
            return false;
        };

        let children: Vec<ObjectHandle> = match obj {
            GameObject::Area(a) => a.creatures.clone(),
            GameObject::Module(m) => m.areas.clone(),
            _ => Vec::new(),
        };
        let tag = obj.common().tag.to_ascii_lowercase();

        for child in children {
            self.destroy(child);
        }

        if !tag.is_empty() {
            if let Some(list) = self.by_tag.get_mut(&tag) {
                list.retain(|&h| h != handle);
            }
        }
        self.players.retain(|_, &mut h| h != handle);
        self.pool.destroy(handle)
    }

    /// Wipes everything, including the blueprint cache.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.by_tag.clear();
        self.templates.clear();
        self.players.clear();
    }
}
