//! KEY/BIF pairs: a `.key` index naming resources and pointing into a set of
//! `.bif` bags that hold the bytes.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use aurora_core::bytes::ByteCursor;
use aurora_core::resref::{Resource, ResourceType, Resref};

use super::container::{file_mtime, Container, ResourceData, ResourceMeta};

const KEY_MAGIC: &[u8; 4] = b"KEY ";
const BIF_MAGIC: &[u8; 4] = b"BIFF";
const V1_VERSION: &[u8; 4] = b"V1  ";

#[derive(Debug, Clone, Copy)]
struct BifEntry {
    offset: u32,
    size: u32,
}

struct Bif {
    path: PathBuf,
    entries: Vec<BifEntry>,
}

impl Bif {
    fn open(path: &Path) -> Option<Bif> {
        let bytes = fs::read(path).ok()?;
        let mut c = ByteCursor::new(&bytes);
        let magic: [u8; 4] = c.read_array()?;
        let version: [u8; 4] = c.read_array()?;
        if &magic != BIF_MAGIC || &version != V1_VERSION {
            return None;
        }
        let variable_count = c.read_u32()? as usize;
        let _fixed_count = c.read_u32()?;
        let table_offset = c.read_u32()? as usize;

        let mut c = ByteCursor::new(&bytes);
        c.seek(table_offset).then_some(())?;
        let mut entries = Vec::with_capacity(variable_count);
        for _ in 0..variable_count {
            let _id = c.read_u32()?;
            let offset = c.read_u32()?;
            let size = c.read_u32()?;
            let _restype = c.read_u32()?;
            entries.push(BifEntry { offset, size });
        }
        Some(Bif {
            path: path.to_path_buf(),
            entries,
        })
    }
}

/// A `.key` index over its `.bif` bags. Bif paths in the index are relative
/// to the key file's directory.
pub struct Key {
    path: PathBuf,
    name: String,
    bifs: Vec<Option<Bif>>,
    resources: Vec<Resource>,
    lookup: HashMap<Resource, (usize, usize)>,
    mtime: u64,
    valid: bool,
}

impl Key {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Key> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("key: open {}", path.display()))?;

        let mut key = Key {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bifs: Vec::new(),
            resources: Vec::new(),
            lookup: HashMap::new(),
            mtime: file_mtime(path),
            valid: false,
        };
        if key.parse(&bytes).is_none() {
            log::error!("key: corrupt index {}", path.display());
        }
        Ok(key)
    }

    fn parse(&mut self, data: &[u8]) -> Option<()> {
        let mut c = ByteCursor::new(data);
        let magic: [u8; 4] = c.read_array()?;
        let version: [u8; 4] = c.read_array()?;
        if &magic != KEY_MAGIC || &version != V1_VERSION {
            return None;
        }
        let bif_count = c.read_u32()? as usize;
        let key_count = c.read_u32()? as usize;
        let file_table_offset = c.read_u32()? as usize;
        let key_table_offset = c.read_u32()? as usize;

        let root = self.path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let mut c = ByteCursor::new(data);
        c.seek(file_table_offset).then_some(())?;
        for _ in 0..bif_count {
            let _file_size = c.read_u32()?;
            let name_offset = c.read_u32()? as usize;
            let name_size = c.read_u16()? as usize;
            let _drives = c.read_u16()?;

            let raw = data.get(name_offset..name_offset + name_size)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let filename = String::from_utf8_lossy(&raw[..end]).replace('\\', "/");
            let bif_path = root.join(&filename);
            let bif = Bif::open(&bif_path);
            if bif.is_none() {
                log::warn!("key: missing or corrupt bif {}", bif_path.display());
            }
            self.bifs.push(bif);
        }

        let mut c = ByteCursor::new(data);
        c.seek(key_table_offset).then_some(())?;
        for _ in 0..key_count {
            let raw: [u8; 16] = c.read_array()?;
            let restype = c.read_u16()?;
            let res_id = c.read_u32()?;

            let ty = ResourceType::from_code(restype);
            if !ty.is_valid() {
                continue;
            }
            let res = Resource::new(Resref::from_array(raw), ty);
            let bif_index = (res_id >> 20) as usize;
            let var_index = (res_id & 0xF_FFFF) as usize;
            if self.lookup.insert(res, (bif_index, var_index)).is_none() {
                self.resources.push(res);
            }
        }

        self.valid = true;
        Some(())
    }

    fn entry(&self, res: &Resource) -> Option<(&Bif, BifEntry)> {
        let &(bif_index, var_index) = self.lookup.get(res)?;
        let bif = self.bifs.get(bif_index)?.as_ref()?;
        let entry = *bif.entries.get(var_index)?;
        Some((bif, entry))
    }
}

impl Container for Key {
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
        self.lookup.contains_key(res)
    }

    fn demand(&self, res: &Resource) -> ResourceData {
        let Some((bif, entry)) = self.entry(res) else {
            return ResourceData::default();
        };
        let read = || -> std::io::Result<Vec<u8>> {
            let mut file = File::open(&bif.path)?;
            file.seek(SeekFrom::Start(entry.offset as u64))?;
            let mut bytes = vec![0u8; entry.size as usize];
            file.read_exact(&mut bytes)?;
            Ok(bytes)
        };
        match read() {
            Ok(bytes) => ResourceData {
                size: bytes.len() as u64,
                mtime: self.mtime,
                bytes,
            },
            Err(err) => {
                log::error!("key: read {} from {}: {}", res, bif.path.display(), err);
                ResourceData::default()
            }
        }
    }

    fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        self.entry(res).map(|(_, e)| ResourceMeta {
            mtime: self.mtime,
            size: e.size as u64,
        })
    }

    fn visit(&self, visitor: &mut dyn FnMut(&Resource)) {
        for res in &self.resources {
            visitor(res);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::bytes::ByteWriter;
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

    fn build_bif(payloads: &[&[u8]]) -> Vec<u8> {
        let table_offset = 20u32;
        let data_offset = table_offset + 16 * payloads.len() as u32;

        let mut w = ByteWriter::new();
        w.write_bytes(BIF_MAGIC);
        w.write_bytes(V1_VERSION);
        w.write_u32(payloads.len() as u32);
        w.write_u32(0);
        w.write_u32(table_offset);

        let mut offset = data_offset;
        for (i, p) in payloads.iter().enumerate() {
            w.write_u32(i as u32);
            w.write_u32(offset);
            w.write_u32(p.len() as u32);
            w.write_u32(ResourceType::Nss as u32);
            offset += p.len() as u32;
        }
        for p in payloads {
            w.write_bytes(p);
        }
        w.into_vec()
    }

    fn build_key(bif_names: &[&str], keys: &[(Resource, u32)]) -> Vec<u8> {
        let file_table_offset = 64u32;
        let names_offset = file_table_offset + 12 * bif_names.len() as u32;
        let names_len: u32 = bif_names.iter().map(|n| n.len() as u32 + 1).sum();
        let key_table_offset = names_offset + names_len;

        let mut w = ByteWriter::new();
        w.write_bytes(KEY_MAGIC);
        w.write_bytes(V1_VERSION);
        w.write_u32(bif_names.len() as u32);
        w.write_u32(keys.len() as u32);
        w.write_u32(file_table_offset);
        w.write_u32(key_table_offset);
        w.write_u32(2026);
        w.write_u32(1);
        w.write_bytes(&[0u8; 32]);

        let mut name_offset = names_offset;
        for name in bif_names {
            w.write_u32(0);
            w.write_u32(name_offset);
            w.write_u16(name.len() as u16 + 1);
            w.write_u16(0);
            name_offset += name.len() as u32 + 1;
        }
        for name in bif_names {
            w.write_bytes(name.as_bytes());
            w.write_u8(0);
        }
        for (res, id) in keys {
            w.write_bytes(&res.resref.as_array());
            w.write_u16(res.restype as u16);
            w.write_u32(*id);
        }
        w.into_vec()
    }

    fn res(name: &str, ty: ResourceType) -> Resource {
        Resource::new(Resref::new(name).unwrap(), ty)
    }

    #[test]
    fn index_and_demand() {
        let dir = unique_temp_dir("keybif");
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(
            dir.join("data/scripts.bif"),
            build_bif(&[b"void main() {}", b"int x;"]),
        )
        .unwrap();

        let keys = [
            (res("nwscript", ResourceType::Nss), 0u32),
            (res("helper", ResourceType::Nss), 1u32),
        ];
        let key_path = dir.join("base.key");
        fs::write(&key_path, build_key(&["data\\scripts.bif"], &keys)).unwrap();

        let k = Key::new(&key_path).unwrap();
        assert!(k.valid());
        assert_eq!(k.size(), 2);

        let data = k.demand(&res("nwscript", ResourceType::Nss));
        assert_eq!(data.bytes, b"void main() {}");
        assert_eq!(
            k.stat(&res("helper", ResourceType::Nss)).unwrap().size,
            6
        );
        assert!(k.demand(&res("other", ResourceType::Nss)).is_empty());

        let mut count = 0;
        k.visit(&mut |_| count += 1);
        assert_eq!(count, k.size());
    }

    #[test]
    fn second_bif_selected_by_id() {
        let dir = unique_temp_dir("keybif2");
        fs::write(dir.join("a.bif"), build_bif(&[b"first"])).unwrap();
        fs::write(dir.join("b.bif"), build_bif(&[b"second"])).unwrap();

        let keys = [
            (res("one", ResourceType::Txt), 0u32),
            (res("two", ResourceType::Txt), 1 << 20),
        ];
        let key_path = dir.join("pair.key");
        fs::write(&key_path, build_key(&["a.bif", "b.bif"], &keys)).unwrap();

        let k = Key::new(&key_path).unwrap();
        assert_eq!(k.demand(&res("one", ResourceType::Txt)).bytes, b"first");
        assert_eq!(k.demand(&res("two", ResourceType::Txt)).bytes, b"second");
    }

    #[test]
    fn corrupt_and_missing() {
        let dir = unique_temp_dir("keybif_bad");
        let path = dir.join("bad.key");
        fs::write(&path, b"NOPE").unwrap();
        assert!(!Key::new(&path).unwrap().valid());
        assert!(Key::new(dir.join("absent.key")).is_err());
    }
}
