//! A watched filesystem directory as a container.

use std::fs;
use std::path::{Path, PathBuf};

use aurora_core::resref::Resource;

use super::container::{file_mtime, Container, ResourceData, ResourceMeta};

/// Flat directory of loose resource files.
///
/// On case-sensitive filesystems lookups fold the filename to lowercase; on
/// case-insensitive ones the native comparison already matches.
pub struct Directory {
    path: PathBuf,
    name: String,
    valid: bool,
}

impl Directory {
    pub fn new(path: impl AsRef<Path>) -> Directory {
        let path = path.as_ref();
        let valid = path.is_dir();
        if !valid {
            log::error!("directory: {} is not a directory", path.display());
        }
        let canonical = if valid {
            path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.to_path_buf()
        };
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Directory {
            path: canonical,
            name,
            valid,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a resource to an on-disk path, trying the exact filename and
    /// then the lowercase fold.
    fn resolve(&self, res: &Resource) -> Option<PathBuf> {
        let exact = self.path.join(res.filename());
        if exact.is_file() {
            return Some(exact);
        }
        let folded = self.path.join(res.filename().to_ascii_lowercase());
        folded.is_file().then_some(folded)
    }
}

impl Container for Directory {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn valid(&self) -> bool {
        self.valid
    }

    fn size(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_| count += 1);
        count
    }

    fn contains(&self, res: &Resource) -> bool {
        self.valid && self.resolve(res).is_some()
    }

    fn demand(&self, res: &Resource) -> ResourceData {
        let Some(path) = self.resolve(res) else {
            return ResourceData::default();
        };
        match fs::read(&path) {
            Ok(bytes) => ResourceData {
                mtime: file_mtime(&path),
                size: bytes.len() as u64,
                bytes,
            },
            Err(err) => {
                log::error!("directory: read {}: {}", path.display(), err);
                ResourceData::default()
            }
        }
    }

    fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        let path = self.resolve(res)?;
        let meta = fs::metadata(&path).ok()?;
        Some(ResourceMeta {
            mtime: file_mtime(&path),
            size: meta.len(),
        })
    }

    fn visit(&self, visitor: &mut dyn FnMut(&Resource)) {
        if !self.valid {
            return;
        }
        let Ok(entries) = fs::read_dir(&self.path) else {
            return;
        };
        let mut resources: Vec<Resource> = entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| Resource::from_path(&e.path()))
            .collect();
        // Directory iteration order is filesystem-dependent; normalize.
        resources.sort();
        for res in &resources {
            visitor(res);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::resref::{Resref, ResourceType};
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

    #[test]
    fn construction_and_lookup() {
        let dir = unique_temp_dir("resdir");
        fs::write(dir.join("test.nss"), b"void main() {}").unwrap();
        fs::write(dir.join("notes.txt"), b"hi").unwrap();
        fs::write(dir.join("ignored.bogus"), b"x").unwrap();

        let d = Directory::new(&dir);
        assert!(d.valid());
        assert_eq!(d.size(), 2);

        let res = Resource::new(Resref::new("test").unwrap(), ResourceType::Nss);
        assert!(d.contains(&res));
        let data = d.demand(&res);
        assert_eq!(data.bytes, b"void main() {}");
        assert_eq!(data.size, 14);

        let meta = d.stat(&res).unwrap();
        assert_eq!(meta.size, data.size);
        assert_eq!(meta.mtime, data.mtime);

        let missing = Resource::new(Resref::new("nope").unwrap(), ResourceType::Nss);
        assert!(!d.contains(&missing));
        assert!(d.demand(&missing).is_empty());
        assert!(d.stat(&missing).is_none());
    }

    #[test]
    fn case_folded_lookup() {
        let dir = unique_temp_dir("resdir_case");
        fs::write(dir.join("test.nss"), b"x").unwrap();

        let d = Directory::new(&dir);
        let res = Resource::new(Resref::new("TEST").unwrap(), ResourceType::Nss);
        assert!(d.contains(&res));
        assert!(!d.demand(&res).is_empty());
    }

    #[test]
    fn visit_counts_match_size() {
        let dir = unique_temp_dir("resdir_visit");
        fs::write(dir.join("a.2da"), b"x").unwrap();
        fs::write(dir.join("b.utc"), b"x").unwrap();

        let d = Directory::new(&dir);
        let mut count = 0;
        d.visit(&mut |_| count += 1);
        assert_eq!(count, d.size());
    }

    #[test]
    fn invalid_paths() {
        assert!(!Directory::new("/does/not/exist").valid());
        let dir = unique_temp_dir("resdir_file");
        let file = dir.join("plain.nss");
        fs::write(&file, b"x").unwrap();
        assert!(!Directory::new(&file).valid());
    }
}
