//! Localized strings.
//!
//! A [`LocString`] couples an optional talk-table reference with a set of
//! inline per-language strings. Language identifiers are even; the feminine
//! variant of a language is its identifier plus one, exactly as the wire
//! formats store them.

use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel meaning "no talk-table lookup".
pub const STRREF_INVALID: u32 = 0xFFFF_FFFF;

/// Canonical language identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Language {
    English = 0,
    French = 2,
    German = 4,
    Italian = 6,
    Spanish = 8,
    Polish = 10,
    Korean = 256,
    ChineseTraditional = 258,
    ChineseSimplified = 260,
    Japanese = 262,
}

impl Language {
    /// Decodes a wire identifier, dropping the feminine bit.
    pub fn from_id(id: u32) -> Option<(Language, bool)> {
        let feminine = id & 1 == 1;
        let base = id & !1;
        let lang = match base {
            0 => Language::English,
            2 => Language::French,
            4 => Language::German,
            6 => Language::Italian,
            8 => Language::Spanish,
            10 => Language::Polish,
            256 => Language::Korean,
            258 => Language::ChineseTraditional,
            260 => Language::ChineseSimplified,
            262 => Language::Japanese,
            _ => return None,
        };
        Some((lang, feminine))
    }

    /// Wire identifier for this language and feminine axis.
    pub fn to_id(self, feminine: bool) -> u32 {
        self as u32 + feminine as u32
    }
}

/// Localized text: a strref plus inline strings keyed by wire language id.
///
/// Inline strings keep insertion order, which the JSON projection preserves.
#[derive(Debug, Clone, PartialEq)]
pub struct LocString {
    strref: u32,
    strings: Vec<(u32, String)>,
}

impl Default for LocString {
    fn default() -> Self {
        LocString::empty()
    }
}

impl LocString {
    pub fn new(strref: u32) -> Self {
        Self {
            strref,
            strings: Vec::new(),
        }
    }

    /// A locstring with no table reference and no strings.
    pub fn empty() -> Self {
        Self::new(STRREF_INVALID)
    }

    pub fn strref(&self) -> u32 {
        self.strref
    }

    pub fn set_strref(&mut self, strref: u32) {
        self.strref = strref;
    }

    /// Adds or replaces the string for a language/feminine pair.
    pub fn add(&mut self, language: Language, text: impl Into<String>, feminine: bool) {
        let id = language.to_id(feminine);
        if let Some(slot) = self.strings.iter_mut().find(|(k, _)| *k == id) {
            slot.1 = text.into();
        } else {
            self.strings.push((id, text.into()));
        }
    }

    /// Adds or replaces a string by raw wire id, used by the GFF reader.
    pub fn add_by_id(&mut self, id: u32, text: impl Into<String>) {
        if let Some(slot) = self.strings.iter_mut().find(|(k, _)| *k == id) {
            slot.1 = text.into();
        } else {
            self.strings.push((id, text.into()));
        }
    }

    pub fn get(&self, language: Language, feminine: bool) -> Option<&str> {
        let id = language.to_id(feminine);
        self.strings
            .iter()
            .find(|(k, _)| *k == id)
            .map(|(_, s)| s.as_str())
    }

    pub fn contains(&self, language: Language, feminine: bool) -> bool {
        self.get(language, feminine).is_some()
    }

    /// Number of inline strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Inline strings in insertion order as `(wire id, text)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings.iter().map(|(k, s)| (*k, s.as_str()))
    }
}

impl fmt::Display for LocString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strings.first() {
            Some((_, s)) => f.write_str(s),
            None => Ok(()),
        }
    }
}

impl Serialize for LocString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            lang: u32,
            string: &'a str,
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("strref", &self.strref)?;
        let entries: Vec<Entry<'_>> = self
            .strings
            .iter()
            .map(|(k, s)| Entry {
                lang: *k,
                string: s,
            })
            .collect();
        map.serialize_entry("strings", &entries)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for LocString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Entry {
            lang: u32,
            string: String,
        }

        #[derive(Deserialize)]
        struct Raw {
            strref: Option<u32>,
            #[serde(default)]
            strings: Vec<Entry>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut out = LocString::new(raw.strref.unwrap_or(STRREF_INVALID));
        for e in raw.strings {
            if e.lang != 0 && Language::from_id(e.lang).is_none() {
                return Err(D::Error::custom(format!("unknown language id {}", e.lang)));
            }
            out.add_by_id(e.lang, e.string);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut l = LocString::new(1);
        l.add(Language::English, "test", false);
        l.add(Language::French, "french test", false);
        l.add(Language::French, "elle", true);

        assert_eq!(l.get(Language::English, false), Some("test"));
        assert_eq!(l.get(Language::French, false), Some("french test"));
        assert_eq!(l.get(Language::French, true), Some("elle"));
        assert_eq!(l.get(Language::German, false), None);
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn add_replaces() {
        let mut l = LocString::empty();
        l.add(Language::English, "one", false);
        l.add(Language::English, "two", false);
        assert_eq!(l.len(), 1);
        assert_eq!(l.get(Language::English, false), Some("two"));
    }

    #[test]
    fn json_round_trip() {
        let mut l = LocString::new(1);
        l.add(Language::English, "test", false);
        l.add(Language::French, "french test", false);

        let json = serde_json::to_value(&l).unwrap();
        let expected = serde_json::json!({
            "strref": 1,
            "strings": [
                {"lang": 0, "string": "test"},
                {"lang": 2, "string": "french test"},
            ],
        });
        assert_eq!(json, expected);

        let l2: LocString = serde_json::from_value(json).unwrap();
        assert_eq!(l, l2);
    }

    #[test]
    fn language_id_round_trip() {
        assert_eq!(Language::French.to_id(true), 3);
        assert_eq!(Language::from_id(3), Some((Language::French, true)));
        assert_eq!(Language::from_id(0), Some((Language::English, false)));
        assert_eq!(Language::from_id(999), None);
    }
}
