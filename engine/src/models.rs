//! Reference-counted model cache and the tileset registry.
//!
//! Model parsing is an external collaborator supplied as a callback; the
//! cache owns sharing and lifetime. Tilesets are `.set` files (INI layout)
//! whose tiles reference models.

use std::collections::HashMap;
use std::rc::Rc;

use aurora_core::ini::Ini;
use aurora_core::resref::{Resource, ResourceType, Resref};

use crate::resources::ResourceManager;

/// Opaque result of the external model loader.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub size: usize,
}

pub type ModelLoaderFn = Box<dyn Fn(&str, &[u8]) -> Option<Model>>;

pub struct ModelCache {
    loader: ModelLoaderFn,
    map: HashMap<Resref, (Rc<Model>, u32)>,
}

impl Default for ModelCache {
    fn default() -> Self {
        ModelCache::new()
    }
}

impl ModelCache {
    pub fn new() -> ModelCache {
        ModelCache::with_loader(Box::new(|name, bytes| {
            Some(Model {
                name: name.to_string(),
                size: bytes.len(),
            })
        }))
    }

    pub fn with_loader(loader: ModelLoaderFn) -> ModelCache {
        ModelCache {
            loader,
            map: HashMap::new(),
        }
    }

    /// Loads `name.mdl`, bumping the reference count on a hit.
    pub fn load(&mut self, resman: &ResourceManager, name: &str) -> Option<Rc<Model>> {
        let key = Resref::from(name);
        if let Some((model, refcount)) = self.map.get_mut(&key) {
            *refcount += 1;
            return Some(model.clone());
        }

        let data = resman.demand(&Resource::new(key, ResourceType::Mdl));
        if data.is_empty() {
            return None;
        }
        let model = Rc::new((self.loader)(name, &data.bytes)?);
        self.map.insert(key, (model.clone(), 1));
        Some(model)
    }

    /// Releases one reference; the entry is erased when the count hits zero.
    pub fn release(&mut self, name: &str) {
        let key = Resref::from(name);
        let Some((_, refcount)) = self.map.get_mut(&key) else {
            log::warn!("models: release of unloaded model {}", name);
            return;
        };
        *refcount -= 1;
        if *refcount == 0 {
            self.map.remove(&key);
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// A parsed `.set` file: name plus the models its tiles reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub tile_models: Vec<Resref>,
}

#[derive(Default)]
pub struct TilesetRegistry {
    map: HashMap<Resref, Rc<Tileset>>,
}

impl TilesetRegistry {
    pub fn new() -> TilesetRegistry {
        TilesetRegistry::default()
    }

    /// Parses `name.set` and loads every referenced tile model.
    pub fn load(
        &mut self,
        resman: &ResourceManager,
        models: &mut ModelCache,
        name: &str,
    ) -> bool {
        let key = Resref::from(name);
        if self.map.contains_key(&key) {
            return true;
        }

        let data = resman.demand(&Resource::new(key, ResourceType::Set));
        if data.is_empty() {
            log::warn!("tilesets: {}.set not found", name);
            return false;
        }
        let ini = Ini::from_str_data(&String::from_utf8_lossy(&data.bytes));
        let count: u32 = ini.get::<i32>("TILES/Count").unwrap_or(0).max(0) as u32;

        let mut tile_models = Vec::new();
        for i in 0..count {
            let Some(model) = ini.get_str(&format!("TILE{i}/Model")) else {
                log::warn!("tilesets: {}.set missing TILE{} model", name, i);
                continue;
            };
            if models.load(resman, model).is_none() {
                log::warn!("tilesets: {}.set references missing model {}", name, model);
            }
            tile_models.push(Resref::from(model));
        }

        let display = ini
            .get_str("GENERAL/Name")
            .unwrap_or(name)
            .to_string();
        self.map.insert(
            key,
            Rc::new(Tileset {
                name: display,
                tile_models,
            }),
        );
        true
    }

    pub fn get(&self, name: &str) -> Option<Rc<Tileset>> {
        self.map.get(&Resref::from(name)).cloned()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Directory;
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

    fn manager_with(files: &[(&str, &[u8])]) -> ResourceManager {
        let dir = unique_temp_dir("models");
        for (name, bytes) in files {
            fs::write(dir.join(name), bytes).unwrap();
        }
        let mut rm = ResourceManager::new();
        rm.add_container(Box::new(Directory::new(&dir)));
        rm
    }

    #[test]
    fn refcounted_load_release() {
        let rm = manager_with(&[("c_orcus.mdl", b"model bytes")]);
        let mut cache = ModelCache::new();

        let m1 = cache.load(&rm, "c_orcus").unwrap();
        let m2 = cache.load(&rm, "c_orcus").unwrap();
        assert!(Rc::ptr_eq(&m1, &m2));
        assert_eq!(cache.len(), 1);

        // Two references above, so the first release keeps the entry.
        cache.release("c_orcus");
        assert_eq!(cache.len(), 1);
        cache.release("c_orcus");
        assert_eq!(cache.len(), 0);

        assert!(cache.load(&rm, "missing").is_none());
    }

    #[test]
    fn tileset_load() {
        let set = b"[GENERAL]\nName=Rural Winter\n[TILES]\nCount=2\n[TILE0]\nModel=ttr01_a01_01\n[TILE1]\nModel=ttr01_a01_02\n";
        let rm = manager_with(&[
            ("ttr01.set", set.as_slice()),
            ("ttr01_a01_01.mdl", b"m1"),
            ("ttr01_a01_02.mdl", b"m2"),
        ]);

        let mut models = ModelCache::new();
        let mut tilesets = TilesetRegistry::new();
        assert!(tilesets.load(&rm, &mut models, "TTR01"));

        let ts = tilesets.get("TTR01").unwrap();
        assert_eq!(ts.name, "Rural Winter");
        assert_eq!(ts.tile_models.len(), 2);
        assert_eq!(models.len(), 2);

        assert!(!tilesets.load(&rm, &mut models, "FAKE01"));
        assert!(tilesets.get("FAKE01").is_none());
    }
}
