//! Minimal INI reader for `nwnplayer.ini`-style settings and `.set` tileset
//! descriptions. Lookups use `"Section/Key"` paths and fold ASCII case.

use std::fs;
use std::path::Path;

use crate::twoda::FromCell;

#[derive(Debug, Clone, Default)]
pub struct Ini {
    // (section, key, value), insertion-ordered.
    entries: Vec<(String, String, String)>,
    valid: bool,
}

impl Ini {
    pub fn from_file(path: impl AsRef<Path>) -> Ini {
        match fs::read_to_string(path.as_ref()) {
            Ok(text) => Ini::from_str_data(&text),
            Err(err) => {
                log::error!("ini: failed to read {}: {}", path.as_ref().display(), err);
                Ini::default()
            }
        }
    }

    pub fn from_str_data(text: &str) -> Ini {
        let mut entries = Vec::new();
        let mut section = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.push((
                    section.clone(),
                    key.trim().to_string(),
                    value.trim().to_string(),
                ));
            }
        }
        Ini {
            entries,
            valid: true,
        }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw lookup of `"Section/Key"`, case-insensitive on both parts.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        let (section, key) = path.split_once('/')?;
        self.entries
            .iter()
            .find(|(s, k, _)| s.eq_ignore_ascii_case(section) && k.eq_ignore_ascii_case(key))
            .map(|(_, _, v)| v.as_str())
    }

    /// Typed lookup.
    pub fn get<T: FromCell>(&self, path: &str) -> Option<T> {
        T::from_cell(self.get_str(path)?)
    }

    /// Decodes into `out`; `false` when the key is missing or unparsable.
    pub fn get_to<T: FromCell>(&self, path: &str, out: &mut T) -> bool {
        match self.get::<T>(path) {
            Some(v) => {
                *out = v;
                true
            }
            None => false,
        }
    }

    /// All keys of a section in insertion order, as `(key, value)` pairs.
    pub fn section<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(move |(s, _, _)| s.eq_ignore_ascii_case(name))
            .map(|(_, k, v)| (k.as_str(), v.as_str()))
    }
}
