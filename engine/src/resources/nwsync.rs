//! NWSync: content-addressed storage. A manifest lists `(resource, sha1)`
//! pairs; blob bytes live under `data/<xx>/<rest-of-sha1>`, optionally inside
//! an `NSYC` zlib frame.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use aurora_core::bytes::ByteCursor;
use aurora_core::resref::Resource;
use flate2::read::ZlibDecoder;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use super::container::{file_mtime, Container, ResourceData, ResourceMeta};

const NSYC_MAGIC: &[u8; 4] = b"NSYC";

/// One manifest line: a resource and the content address of its bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub name: Resource,
    pub sha1: String,
}

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    entries: Vec<ManifestEntry>,
}

/// A whole NWSync repository: `manifests/` plus sharded `data/`.
pub struct NWSync {
    root: PathBuf,
    manifest_names: Vec<String>,
    loaded: bool,
}

impl NWSync {
    pub fn new(root: impl AsRef<Path>) -> NWSync {
        let root = root.as_ref().to_path_buf();
        let manifest_dir = root.join("manifests");
        let mut manifest_names = Vec::new();
        let loaded = manifest_dir.is_dir();
        if loaded {
            if let Ok(entries) = fs::read_dir(&manifest_dir) {
                for entry in entries.flatten() {
                    if entry.path().is_file() {
                        if let Some(stem) = entry.path().file_stem() {
                            manifest_names.push(stem.to_string_lossy().into_owned());
                        }
                    }
                }
            }
            manifest_names.sort();
        } else {
            log::warn!("nwsync: no manifests directory under {}", root.display());
        }
        NWSync {
            root,
            manifest_names,
            loaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Known manifest names (content hashes).
    pub fn manifests(&self) -> &[String] {
        &self.manifest_names
    }

    /// Number of `data/<xx>` shard directories.
    pub fn shard_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.root.join("data")) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| {
                e.path().is_dir()
                    && e.file_name()
                        .to_str()
                        .is_some_and(|n| n.len() == 2 && n.chars().all(|c| c.is_ascii_hexdigit()))
            })
            .count()
    }

    /// Loads a manifest by name.
    pub fn get(&self, name: &str) -> Option<Rc<NWSyncManifest>> {
        if !self.manifest_names.iter().any(|m| m == name) {
            return None;
        }
        NWSyncManifest::load(&self.root, name).map(Rc::new)
    }
}

/// A single manifest acting as a container over the shared data shards.
pub struct NWSyncManifest {
    root: PathBuf,
    name: String,
    entries: Vec<ManifestEntry>,
    lookup: HashMap<Resource, usize>,
    mtime: u64,
}

impl NWSyncManifest {
    fn load(root: &Path, name: &str) -> Option<NWSyncManifest> {
        let path = root.join("manifests").join(format!("{name}.json"));
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(err) => {
                log::error!("nwsync: read manifest {}: {}", path.display(), err);
                return None;
            }
        };
        let doc: ManifestDoc = match serde_json::from_str(&text) {
            Ok(d) => d,
            Err(err) => {
                log::error!("nwsync: parse manifest {}: {}", path.display(), err);
                return None;
            }
        };

        let mut lookup = HashMap::new();
        for (i, entry) in doc.entries.iter().enumerate() {
            lookup.entry(entry.name).or_insert(i);
        }
        Some(NWSyncManifest {
            root: root.to_path_buf(),
            name: name.to_string(),
            entries: doc.entries,
            lookup,
            // Per contract, resource mtimes come from the manifest itself.
            mtime: file_mtime(&path),
        })
    }

    /// Every entry in manifest order.
    pub fn all(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn blob_path(&self, sha1: &str) -> Option<PathBuf> {
        if sha1.len() < 3 {
            return None;
        }
        Some(self.root.join("data").join(&sha1[..2]).join(&sha1[2..]))
    }

    fn read_blob(&self, sha1: &str) -> Option<Vec<u8>> {
        let path = self.blob_path(sha1)?;
        let raw = fs::read(&path).ok()?;

        let bytes = if raw.starts_with(NSYC_MAGIC) {
            let mut c = ByteCursor::at(&raw, 4);
            let _version = c.read_u32()?;
            let expected = c.read_u32()? as usize;
            let mut out = Vec::with_capacity(expected);
            let mut decoder = ZlibDecoder::new(&raw[c.pos()..]);
            decoder.read_to_end(&mut out).ok()?;
            if out.len() != expected {
                log::warn!("nwsync: {} inflated to unexpected size", sha1);
            }
            out
        } else {
            raw
        };

        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let digest: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        if !digest.eq_ignore_ascii_case(sha1) {
            log::warn!("nwsync: content hash mismatch for {}", sha1);
        }
        Some(bytes)
    }
}

impl Container for NWSyncManifest {
    fn name(&self) -> &str {
        &self.name
    }

    fn valid(&self) -> bool {
        true
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, res: &Resource) -> bool {
        self.lookup.contains_key(res)
    }

    fn demand(&self, res: &Resource) -> ResourceData {
        let Some(&i) = self.lookup.get(res) else {
            return ResourceData::default();
        };
        match self.read_blob(&self.entries[i].sha1) {
            Some(bytes) => ResourceData {
                size: bytes.len() as u64,
                mtime: self.mtime,
                bytes,
            },
            None => {
                log::error!("nwsync: missing blob for {}", res);
                ResourceData::default()
            }
        }
    }

    fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        let &i = self.lookup.get(res)?;
        let path = self.blob_path(&self.entries[i].sha1)?;
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Some(ResourceMeta {
            mtime: self.mtime,
            size,
        })
    }

    fn visit(&self, visitor: &mut dyn FnMut(&Resource)) {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if seen.insert(entry.name) {
                visitor(&entry.name);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use sha1::{Digest, Sha1};

    pub fn sha1_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Stores a blob under `data/<xx>/<rest>`, optionally NSYC-framed.
    pub fn store_blob(root: &Path, bytes: &[u8], compressed: bool) -> String {
        let sha = sha1_hex(bytes);
        let dir = root.join("data").join(&sha[..2]);
        fs::create_dir_all(&dir).unwrap();
        let payload = if compressed {
            let mut framed = Vec::new();
            framed.extend_from_slice(b"NSYC");
            framed.extend_from_slice(&1u32.to_le_bytes());
            framed.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).unwrap();
            framed.extend_from_slice(&encoder.finish().unwrap());
            framed
        } else {
            bytes.to_vec()
        };
        fs::write(dir.join(&sha[2..]), payload).unwrap();
        sha
    }

    /// Writes `manifests/<name>.json` for the given `(filename, sha1)` list.
    pub fn store_manifest(root: &Path, name: &str, entries: &[(String, String)]) {
        let dir = root.join("manifests");
        fs::create_dir_all(&dir).unwrap();
        let body = serde_json::json!({
            "version": 1,
            "entries": entries
                .iter()
                .map(|(n, s)| serde_json::json!({"name": n, "sha1": s}))
                .collect::<Vec<_>>(),
        });
        fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
    }
}
