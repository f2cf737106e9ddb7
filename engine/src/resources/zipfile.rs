//! PKZIP archives as containers. Entries anywhere in the tree are indexed by
//! their basename; bytes are decompressed on demand.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use aurora_core::resref::Resource;
use zip::ZipArchive;

use super::container::{file_mtime, Container, ResourceData, ResourceMeta};

pub struct Zip {
    path: PathBuf,
    name: String,
    archive: RefCell<Option<ZipArchive<File>>>,
    index: HashMap<Resource, usize>,
    resources: Vec<Resource>,
    sizes: HashMap<Resource, u64>,
    mtime: u64,
    valid: bool,
}

impl Zip {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Zip> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("zip: open {}", path.display()))?;

        let mut zip = Zip {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            archive: RefCell::new(None),
            index: HashMap::new(),
            resources: Vec::new(),
            sizes: HashMap::new(),
            mtime: file_mtime(path),
            valid: false,
        };

        let mut archive = match ZipArchive::new(file) {
            Ok(a) => a,
            Err(err) => {
                log::error!("zip: corrupt archive {}: {}", path.display(), err);
                return Ok(zip);
            }
        };

        for i in 0..archive.len() {
            let Ok(entry) = archive.by_index(i) else {
                continue;
            };
            if !entry.is_file() {
                continue;
            }
            let Some(basename) = entry.name().rsplit('/').next() else {
                continue;
            };
            let Some(res) = Resource::from_filename(basename) else {
                continue;
            };
            if zip.index.insert(res, i).is_none() {
                zip.resources.push(res);
                zip.sizes.insert(res, entry.size());
            }
        }

        zip.archive = RefCell::new(Some(archive));
        zip.valid = true;
        Ok(zip)
    }
}

impl Container for Zip {
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
        self.resources.len()
    }

    fn contains(&self, res: &Resource) -> bool {
        self.index.contains_key(res)
    }

    fn demand(&self, res: &Resource) -> ResourceData {
        let Some(&i) = self.index.get(res) else {
            return ResourceData::default();
        };
        let mut guard = self.archive.borrow_mut();
        let Some(archive) = guard.as_mut() else {
            return ResourceData::default();
        };
        let mut entry = match archive.by_index(i) {
            Ok(e) => e,
            Err(err) => {
                log::error!("zip: entry {} in {}: {}", res, self.name, err);
                return ResourceData::default();
            }
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        if let Err(err) = entry.read_to_end(&mut bytes) {
            log::error!("zip: inflate {} in {}: {}", res, self.name, err);
            return ResourceData::default();
        }
        ResourceData {
            size: bytes.len() as u64,
            mtime: self.mtime,
            bytes,
        }
    }

    fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        self.sizes.get(res).map(|&size| ResourceMeta {
            mtime: self.mtime,
            size,
        })
    }

    fn visit(&self, visitor: &mut dyn FnMut(&Resource)) {
        for res in &self.resources {
            visitor(res);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Writes a small zip fixture with the given `(entry name, bytes)` pairs.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, bytes) in entries {
            writer
                .start_file(*name, FileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_zip;
    use super::*;
    use aurora_core::resref::{ResourceType, Resref};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{prefix}_{pid}_{nanos}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn res(name: &str, ty: ResourceType) -> Resource {
        Resource::new(Resref::new(name).unwrap(), ty)
    }

    #[test]
    fn open_and_demand() {
        let dir = unique_temp_dir("zipc");
        let path = dir.join("module_as_zip.zip");
        write_zip(
            &path,
            &[
                ("demo/module.ifo", b"ifo bytes"),
                ("demo/test_area.are", b"are bytes"),
                ("demo/readme.nonsense", b"skipped"),
            ],
        );

        let z = Zip::new(&path).unwrap();
        assert!(z.valid());
        assert_eq!(Container::name(&z), "module_as_zip.zip");
        assert_eq!(z.size(), 2);

        assert!(z.contains(&res("module", ResourceType::Ifo)));
        assert!(z.contains(&res("test_area", ResourceType::Are)));
        assert_eq!(z.demand(&res("module", ResourceType::Ifo)).bytes, b"ifo bytes");
        assert_eq!(z.stat(&res("test_area", ResourceType::Are)).unwrap().size, 9);
        assert!(z.demand(&res("other", ResourceType::Are)).is_empty());

        let mut count = 0;
        z.visit(&mut |_| count += 1);
        assert_eq!(count, z.size());
    }

    #[test]
    fn missing_file_is_a_construction_error() {
        assert!(Zip::new("/does/not/exist.zip").is_err());
    }

    #[test]
    fn corrupt_zip_is_invalid() {
        let dir = unique_temp_dir("zipc_bad");
        let path = dir.join("bad.zip");
        std::fs::write(&path, b"this is not a zip file").unwrap();
        let z = Zip::new(&path).unwrap();
        assert!(!z.valid());
    }

    #[test]
    fn extract() {
        let dir = unique_temp_dir("zipc_extract");
        let path = dir.join("pack.zip");
        write_zip(&path, &[("a.2da", b"2DA V2.0"), ("b.txt", b"t")]);

        let z = Zip::new(&path).unwrap();
        let out = dir.join("out");
        let all = regex::Regex::new(".*").unwrap();
        assert_eq!(z.extract(&all, &out), 2);
        assert!(out.join("a.2da").is_file());
        assert!(out.join("b.txt").is_file());
    }
}
