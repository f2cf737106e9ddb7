//! The resource-locator layer: a priority-ordered, case-insensitive
//! namespace over `(name, type)` composed from stacked containers.

pub mod container;
pub mod directory;
pub mod erf;
pub mod keybif;
pub mod nwsync;
pub mod zipfile;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use aurora_core::resref::{Resource, ResourceType, Resref};
use regex::Regex;

pub use container::{Container, ContainerSource, ResourceData, ResourceMeta};
pub use directory::Directory;
pub use erf::Erf;
pub use keybif::Key;
pub use nwsync::{NWSync, NWSyncManifest};
pub use zipfile::Zip;

/// Layers of a layered palette texture (PLT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PltLayer {
    Skin,
    Hair,
    Metal1,
    Metal2,
    Cloth1,
    Cloth2,
    Leather1,
    Leather2,
    Tattoo1,
    Tattoo2,
}

impl PltLayer {
    /// The palette texture resref backing this layer.
    pub fn texture(self) -> &'static str {
        match self {
            PltLayer::Skin => "pal_skin01",
            PltLayer::Hair => "pal_hair01",
            PltLayer::Metal1 => "pal_metal01",
            PltLayer::Metal2 => "pal_metal02",
            PltLayer::Cloth1 => "pal_cloth01",
            PltLayer::Cloth2 => "pal_cloth02",
            PltLayer::Leather1 => "pal_leath01",
            PltLayer::Leather2 => "pal_leath02",
            PltLayer::Tattoo1 => "pal_tattoo01",
            PltLayer::Tattoo2 => "pal_tattoo02",
        }
    }
}

/// Priority stack of containers. The most recently added container wins;
/// shadowing is at `(resref, type)` granularity.
#[derive(Default)]
pub struct ResourceManager {
    containers: Vec<ContainerSource>,
}

impl ResourceManager {
    pub fn new() -> ResourceManager {
        ResourceManager::default()
    }

    /// Number of stacked containers.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Total resources across all containers, shadowed entries included.
    pub fn size(&self) -> usize {
        self.containers.iter().map(|c| c.get().size()).sum()
    }

    /// Pushes a container on top of the stack. Rejects invalid containers
    /// and duplicates of one already present.
    pub fn add_container(&mut self, source: impl Into<ContainerSource>) -> bool {
        let source = source.into();
        let c = source.get();
        if !c.valid() {
            log::error!("resman: refusing invalid container {}", c.name());
            return false;
        }
        for existing in &self.containers {
            let e = existing.get();
            let same = match (e.path(), c.path()) {
                (Some(a), Some(b)) => a == b,
                _ => e.name() == c.name(),
            };
            if same {
                log::warn!("resman: container {} already registered", c.name());
                return false;
            }
        }
        log::info!("resman: adding container {}", c.name());
        self.containers.push(source);
        true
    }

    /// Drops containers from the top until `count` remain.
    pub fn truncate(&mut self, count: usize) {
        while self.containers.len() > count {
            if let Some(c) = self.containers.pop() {
                log::info!("resman: removing container {}", c.get().name());
            }
        }
    }

    fn scan_top_down(&self) -> impl Iterator<Item = &dyn Container> {
        self.containers.iter().rev().map(|c| c.get())
    }

    pub fn contains(&self, res: &Resource) -> bool {
        self.scan_top_down().any(|c| c.contains(res))
    }

    /// Top-down lookup; empty bytes on a miss. No caching at this layer.
    pub fn demand(&self, res: &Resource) -> ResourceData {
        for c in self.scan_top_down() {
            if c.contains(res) {
                return c.demand(res);
            }
        }
        ResourceData::default()
    }

    pub fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        self.scan_top_down().find_map(|c| c.stat(res))
    }

    /// Deduplicated enumeration: each resource reported exactly once, from
    /// the topmost container owning it.
    pub fn visit(&self, visitor: &mut dyn FnMut(&Resource)) {
        let mut seen: HashSet<Resource> = HashSet::new();
        for c in self.scan_top_down() {
            c.visit(&mut |res| {
                if seen.insert(*res) {
                    visitor(res);
                }
            });
        }
    }

    /// Materializes every resource whose filename matches `pattern` into
    /// `dest`, honoring shadowing. Returns the number written.
    pub fn extract(&self, pattern: &Regex, dest: &Path) -> usize {
        let mut matched = Vec::new();
        self.visit(&mut |res| {
            if pattern.is_match(&res.filename()) {
                matched.push(*res);
            }
        });
        if matched.is_empty() {
            return 0;
        }
        if let Err(err) = fs::create_dir_all(dest) {
            log::error!("resman: cannot create {}: {}", dest.display(), err);
            return 0;
        }

        let mut count = 0;
        for res in matched {
            let data = self.demand(&res);
            if data.is_empty() {
                continue;
            }
            match fs::write(dest.join(res.filename()), &data.bytes) {
                Ok(()) => count += 1,
                Err(err) => log::error!("resman: extract {}: {}", res, err),
            }
        }
        count
    }

    /// Convenience lookup for a layered palette texture.
    pub fn palette_texture(&self, layer: PltLayer) -> Option<ResourceData> {
        let resref = Resref::from(layer.texture());
        for restype in [ResourceType::Plt, ResourceType::Tga, ResourceType::Dds] {
            let data = self.demand(&Resource::new(resref, restype));
            if !data.is_empty() {
                return Some(data);
            }
        }
        None
    }
}
