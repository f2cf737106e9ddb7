//! ERF archives (`.erf` / `.mod` / `.hak` / `.sav`): one binary file with a
//! key table naming resources and a resource table locating their bytes.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use aurora_core::bytes::ByteCursor;
use aurora_core::locstring::LocString;
use aurora_core::resref::{Resource, ResourceType, Resref};

use super::container::{file_mtime, Container, ResourceData, ResourceMeta};

const ERF_VERSION: &[u8; 4] = b"V1.0";
const HEADER_SIZE: usize = 160;

#[derive(Debug, Clone, Copy)]
struct ErfEntry {
    offset: u32,
    size: u32,
}

/// A parsed ERF-family archive. The archive file is re-opened per `demand`;
/// only the tables live in memory.
pub struct Erf {
    path: PathBuf,
    name: String,
    file_type: [u8; 4],
    description: LocString,
    resources: Vec<Resource>,
    entries: HashMap<Resource, ErfEntry>,
    mtime: u64,
    valid: bool,
}

impl Erf {
    /// Opens and indexes an archive. IO failures are construction errors;
    /// structural damage yields `valid() == false`.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Erf> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("erf: open {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mtime = file_mtime(path);

        let mut erf = Erf {
            path: path.to_path_buf(),
            name,
            file_type: *b"ERF ",
            description: LocString::empty(),
            resources: Vec::new(),
            entries: HashMap::new(),
            mtime,
            valid: false,
        };

        if erf.parse(&bytes).is_none() {
            log::error!("erf: corrupt archive {}", path.display());
        }
        Ok(erf)
    }

    fn parse(&mut self, data: &[u8]) -> Option<()> {
        let mut c = ByteCursor::new(data);
        let magic: [u8; 4] = c.read_array()?;
        let version: [u8; 4] = c.read_array()?;
        if !matches!(&magic, b"ERF " | b"MOD " | b"HAK " | b"SAV ") || &version != ERF_VERSION {
            return None;
        }
        self.file_type = magic;

        let language_count = c.read_u32()?;
        let _localized_string_size = c.read_u32()?;
        let entry_count = c.read_u32()? as usize;
        let loc_offset = c.read_u32()? as usize;
        let key_offset = c.read_u32()? as usize;
        let res_offset = c.read_u32()? as usize;
        let _build_year = c.read_u32()?;
        let _build_day = c.read_u32()?;
        let description_strref = c.read_u32()?;

        // Localized description table.
        let mut description = LocString::new(description_strref);
        let mut c = ByteCursor::new(data);
        c.seek(loc_offset).then_some(())?;
        for _ in 0..language_count {
            let lang = c.read_u32()?;
            let size = c.read_u32()? as usize;
            let text = c.take(size)?;
            description.add_by_id(lang, String::from_utf8_lossy(text).into_owned());
        }
        self.description = description;

        let mut keys = ByteCursor::new(data);
        keys.seek(key_offset).then_some(())?;
        let mut table = ByteCursor::new(data);
        table.seek(res_offset).then_some(())?;

        for _ in 0..entry_count {
            let raw: [u8; 16] = keys.read_array()?;
            let _res_id = keys.read_u32()?;
            let res_type = keys.read_u16()?;
            let _unused = keys.read_u16()?;

            let offset = table.read_u32()?;
            let size = table.read_u32()?;

            let restype = ResourceType::from_code(res_type);
            if !restype.is_valid() {
                log::warn!("erf: {} has an entry with unknown type {}", self.name, res_type);
                continue;
            }
            let res = Resource::new(Resref::from_array(raw), restype);
            if self.entries.insert(res, ErfEntry { offset, size }).is_none() {
                self.resources.push(res);
            }
        }

        self.valid = true;
        Some(())
    }

    /// Archive kind from the magic: `"ERF"`, `"MOD"`, `"HAK"`, or `"SAV"`.
    pub fn file_type(&self) -> &str {
        std::str::from_utf8(&self.file_type)
            .unwrap_or("")
            .trim_end_matches(' ')
    }

    pub fn description(&self) -> &LocString {
        &self.description
    }
}

impl Container for Erf {
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
        self.entries.contains_key(res)
    }

    fn demand(&self, res: &Resource) -> ResourceData {
        let Some(entry) = self.entries.get(res) else {
            return ResourceData::default();
        };
        let read = || -> std::io::Result<Vec<u8>> {
            let mut file = File::open(&self.path)?;
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
                log::error!("erf: read {} from {}: {}", res, self.name, err);
                ResourceData::default()
            }
        }
    }

    fn stat(&self, res: &Resource) -> Option<ResourceMeta> {
        self.entries.get(res).map(|e| ResourceMeta {
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
