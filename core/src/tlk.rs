//! Talk tables (`.tlk`): the indexed localized-string database.
//!
//! Layout is the legacy `TLK V3.0` fixed format: a 20-byte header, 40-byte
//! entries, then a packed string blob. [`Tlk::save_as`] writes the canonical
//! layout, so load → save is byte-identical for canonically written files.

use std::fs;
use std::io;
use std::path::Path;

use crate::bytes::{ByteCursor, ByteWriter};
use crate::resref::Resref;

const TLK_MAGIC: &[u8; 4] = b"TLK ";
const TLK_VERSION: &[u8; 4] = b"V3.0";
const HEADER_SIZE: usize = 20;
const ENTRY_SIZE: usize = 40;

/// Entry flag: text is present.
pub const TLK_TEXT_PRESENT: u32 = 0x1;
/// Entry flag: a sound resref is present.
pub const TLK_SND_PRESENT: u32 = 0x2;
/// Entry flag: a sound length is present.
pub const TLK_SNDLENGTH_PRESENT: u32 = 0x4;

/// One talk-table entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlkEntry {
    pub flags: u32,
    pub text: String,
    pub sound_resref: Resref,
    pub volume_variance: u32,
    pub pitch_variance: u32,
    pub sound_length: f32,
}

/// A parsed talk table.
#[derive(Debug, Clone, Default)]
pub struct Tlk {
    language: u32,
    entries: Vec<TlkEntry>,
    valid: bool,
}

impl Tlk {
    /// An empty, valid table for the given language id.
    pub fn new(language: u32) -> Self {
        Self {
            language,
            entries: Vec::new(),
            valid: true,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Tlk {
        match fs::read(path.as_ref()) {
            Ok(bytes) => Tlk::from_bytes(&bytes),
            Err(err) => {
                log::error!("tlk: failed to read {}: {}", path.as_ref().display(), err);
                Tlk::default()
            }
        }
    }

    pub fn from_bytes(data: &[u8]) -> Tlk {
        // `Tlk::default()` is the invalid table.
        let invalid = Tlk::default();

        let mut cursor = ByteCursor::new(data);
        let magic: [u8; 4] = match cursor.read_array() {
            Some(m) => m,
            None => return invalid,
        };
        let version: [u8; 4] = match cursor.read_array() {
            Some(v) => v,
            None => return invalid,
        };
        if &magic != TLK_MAGIC || &version != TLK_VERSION {
            log::error!("tlk: bad magic or version");
            return invalid;
        }

        let (language, count, strings_offset) =
            match (cursor.read_u32(), cursor.read_u32(), cursor.read_u32()) {
                (Some(l), Some(c), Some(o)) => (l, c, o as usize),
                _ => return invalid,
            };

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let flags = match cursor.read_u32() {
                Some(f) => f,
                None => return invalid,
            };
            let sound: [u8; 16] = match cursor.read_array() {
                Some(s) => s,
                None => return invalid,
            };
            let (volume_variance, pitch_variance, offset, size, sound_length) = match (
                cursor.read_u32(),
                cursor.read_u32(),
                cursor.read_u32(),
                cursor.read_u32(),
                cursor.read_f32(),
            ) {
                (Some(v), Some(p), Some(o), Some(s), Some(l)) => (v, p, o as usize, s as usize, l),
                _ => return invalid,
            };

            let start = strings_offset.saturating_add(offset);
            let text = if size == 0 {
                String::new()
            } else if let Some(slice) = data.get(start..start + size) {
                String::from_utf8_lossy(slice).into_owned()
            } else {
                log::warn!("tlk: string data out of range, entry treated as empty");
                String::new()
            };

            entries.push(TlkEntry {
                flags,
                text,
                sound_resref: Resref::from_array(sound),
                volume_variance,
                pitch_variance,
                sound_length,
            });
        }

        Tlk {
            language,
            entries,
            valid: true,
        }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn language(&self) -> u32 {
        self.language
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text for a strref; `""` for the invalid sentinel or out-of-range.
    pub fn get(&self, strref: u32) -> &str {
        if strref == crate::locstring::STRREF_INVALID {
            return "";
        }
        match self.entries.get(strref as usize) {
            Some(e) => &e.text,
            None => "",
        }
    }

    pub fn entry(&self, strref: u32) -> Option<&TlkEntry> {
        self.entries.get(strref as usize)
    }

    /// Sets the text for a strref, growing the table with empty entries.
    pub fn set(&mut self, strref: u32, text: impl Into<String>) {
        let idx = strref as usize;
        if idx >= self.entries.len() {
            self.entries.resize(idx + 1, TlkEntry::default());
        }
        let entry = &mut self.entries[idx];
        entry.text = text.into();
        entry.flags |= TLK_TEXT_PRESENT;
    }

    /// Serializes the canonical layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = ByteWriter::new();
        header.write_bytes(TLK_MAGIC);
        header.write_bytes(TLK_VERSION);
        header.write_u32(self.language);
        header.write_u32(self.entries.len() as u32);
        header.write_u32((HEADER_SIZE + self.entries.len() * ENTRY_SIZE) as u32);

        let mut table = ByteWriter::new();
        let mut blob = ByteWriter::new();
        for entry in &self.entries {
            table.write_u32(entry.flags);
            table.write_bytes(&entry.sound_resref.as_array());
            table.write_u32(entry.volume_variance);
            table.write_u32(entry.pitch_variance);
            table.write_u32(blob.len() as u32);
            table.write_u32(entry.text.len() as u32);
            table.write_f32(entry.sound_length);
            blob.write_bytes(entry.text.as_bytes());
        }

        let mut out = header.into_vec();
        out.extend_from_slice(table.as_slice());
        out.extend_from_slice(blob.as_slice());
        out
    }

    pub fn save_as(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}
