//! The container seam: anything that can produce bytes for a [`Resource`].

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use aurora_core::resref::Resource;
use regex::Regex;

/// Bytes plus provenance returned by [`Container::demand`]. A miss is an
/// empty payload, never an error.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    pub bytes: Vec<u8>,
    pub mtime: u64,
    pub size: u64,
}

impl ResourceData {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Size and mtime without a full read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceMeta {
    pub mtime: u64,
    pub size: u64,
}

/// A single source of resources.
pub trait Container {
    /// Display name, e.g. the archive filename or directory basename.
    fn name(&self) -> &str;

    /// Backing path, used for duplicate-container detection.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// False after a structurally corrupt open; invalid containers are
    /// skipped by the manager.
    fn valid(&self) -> bool;

    /// Number of resources.
    fn size(&self) -> usize;

    fn contains(&self, res: &Resource) -> bool;

    fn demand(&self, res: &Resource) -> ResourceData;

    fn stat(&self, res: &Resource) -> Option<ResourceMeta>;

    /// Calls `visitor` once per resource, in the container's natural order.
    fn visit(&self, visitor: &mut dyn FnMut(&Resource));

    /// Writes resources whose filename matches `pattern` into `dest`,
    /// returning the number written.
    fn extract(&self, pattern: &Regex, dest: &Path) -> usize {
        let mut matched = Vec::new();
        self.visit(&mut |res| {
            if pattern.is_match(&res.filename()) {
                matched.push(*res);
            }
        });

        if !matched.is_empty() {
            if let Err(err) = fs::create_dir_all(dest) {
                log::error!("container: cannot create {}: {}", dest.display(), err);
                return 0;
            }
        }

        let mut count = 0;
        for res in matched {
            let data = self.demand(&res);
            if data.is_empty() {
                continue;
            }
            match fs::write(dest.join(res.filename()), &data.bytes) {
                Ok(()) => count += 1,
                Err(err) => log::error!("container: extract {}: {}", res, err),
            }
        }
        count
    }
}

/// Owned-or-shared container, so the manager never carries a lifetime.
pub enum ContainerSource {
    Owned(Box<dyn Container>),
    Shared(Rc<dyn Container>),
}

impl ContainerSource {
    pub fn get(&self) -> &dyn Container {
        match self {
            ContainerSource::Owned(c) => c.as_ref(),
            ContainerSource::Shared(c) => c.as_ref(),
        }
    }
}

impl<C: Container + 'static> From<Box<C>> for ContainerSource {
    fn from(c: Box<C>) -> Self {
        ContainerSource::Owned(c)
    }
}

impl<C: Container + 'static> From<Rc<C>> for ContainerSource {
    fn from(c: Rc<C>) -> Self {
        ContainerSource::Shared(c)
    }
}

/// Filesystem mtime as epoch seconds; zero when unavailable.
pub fn file_mtime(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
