//! Memoized 2DA sheets, keyed by resref. Invalidated wholesale on module
//! unload.

use std::collections::HashMap;
use std::rc::Rc;

use aurora_core::resref::{Resource, ResourceType, Resref};
use aurora_core::twoda::TwoDA;

use crate::resources::ResourceManager;

#[derive(Default)]
pub struct TwoDACache {
    // Misses are cached too, so absent sheets cost one lookup.
    cache: HashMap<Resref, Option<Rc<TwoDA>>>,
}

impl TwoDACache {
    pub fn new() -> TwoDACache {
        TwoDACache::default()
    }

    /// The parsed sheet for `name.2da`; the second call is a hit.
    pub fn get(&mut self, resman: &ResourceManager, name: &str) -> Option<Rc<TwoDA>> {
        let key = Resref::from(name);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let data = resman.demand(&Resource::new(key, ResourceType::TwoDA));
        let parsed = if data.is_empty() {
            None
        } else {
            let sheet = TwoDA::from_str_data(&String::from_utf8_lossy(&data.bytes));
            if sheet.is_valid() {
                Some(Rc::new(sheet))
            } else {
                log::warn!("twoda cache: {}.2da failed to parse", name);
                None
            }
        };
        self.cache.insert(key, parsed.clone());
        parsed
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
