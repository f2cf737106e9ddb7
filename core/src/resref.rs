//! Resource names and identities.
//!
//! A [`Resref`] is the legacy engine's fixed 16-byte, case-insensitive ASCII
//! name. A [`Resource`] pairs a resref with a [`ResourceType`] and is the unit
//! of identity across every container.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum resref length. NWN2-era assets use 32; only the 16-byte variety is
/// supported here.
pub const RESREF_MAX: usize = 16;

/// Fixed-capacity, case-insensitive ASCII resource name.
///
/// Comparison, ordering, and hashing all ASCII-fold, so `"Module"` and
/// `"module"` are the same resref. Padding NULs are ignored. Immutable after
/// construction.
#[derive(Clone, Copy, Default)]
pub struct Resref {
    data: [u8; RESREF_MAX],
}

impl Resref {
    /// Builds a resref, rejecting names that are too long or non-ASCII.
    pub fn new(name: &str) -> Option<Self> {
        if name.len() > RESREF_MAX || !name.is_ascii() {
            return None;
        }
        let mut data = [0u8; RESREF_MAX];
        data[..name.len()].copy_from_slice(name.as_bytes());
        Some(Self { data })
    }

    /// Builds a resref from a raw fixed array as stored on disk.
    pub fn from_array(data: [u8; RESREF_MAX]) -> Self {
        let mut out = [0u8; RESREF_MAX];
        for (i, &b) in data.iter().enumerate() {
            if b == 0 {
                break;
            }
            out[i] = if b.is_ascii() { b } else { b'?' };
        }
        Self { data: out }
    }

    /// The raw padded array, as written to archive key tables.
    pub fn as_array(&self) -> [u8; RESREF_MAX] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data[0] == 0
    }

    /// Number of characters excluding padding NULs.
    pub fn len(&self) -> usize {
        self.data.iter().position(|&b| b == 0).unwrap_or(RESREF_MAX)
    }

    /// View of the name without padding.
    pub fn view(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.data[..self.len()]).unwrap_or("")
    }

    fn folded(&self) -> [u8; RESREF_MAX] {
        let mut out = self.data;
        for b in &mut out {
            *b = b.to_ascii_lowercase();
        }
        out
    }
}

impl From<&str> for Resref {
    /// Truncating constructor used by readers of already-validated data.
    fn from(name: &str) -> Self {
        let mut data = [0u8; RESREF_MAX];
        let mut i = 0;
        for &b in name.as_bytes() {
            if i == RESREF_MAX {
                break;
            }
            data[i] = if b.is_ascii() && b != 0 { b } else { b'?' };
            i += 1;
        }
        Self { data }
    }
}

impl PartialEq for Resref {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for Resref {}

impl PartialEq<&str> for Resref {
    fn eq(&self, other: &&str) -> bool {
        self.view().eq_ignore_ascii_case(other)
    }
}

impl PartialOrd for Resref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resref {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(&other.folded())
    }
}

impl Hash for Resref {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl fmt::Display for Resref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.view())
    }
}

impl fmt::Debug for Resref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resref({:?})", self.view())
    }
}

impl Serialize for Resref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.view())
    }
}

impl<'de> Deserialize<'de> for Resref {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Resref::new(&s).ok_or_else(|| D::Error::custom("invalid resref"))
    }
}

/// Dense resource type code with a bidirectional extension map.
///
/// Values are the legacy engine's on-disk type ids, which appear verbatim in
/// ERF key tables and KEY indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ResourceType {
    Invalid = 0xFFFF,
    Bmp = 1,
    Tga = 3,
    Wav = 4,
    Plt = 6,
    Ini = 7,
    Txt = 10,
    Mdl = 2002,
    Nss = 2009,
    Ncs = 2010,
    Mod = 2011,
    Are = 2012,
    Set = 2013,
    Ifo = 2014,
    Bic = 2015,
    Wok = 2016,
    TwoDA = 2017,
    Tlk = 2018,
    Txi = 2022,
    Git = 2023,
    Uti = 2025,
    Utc = 2027,
    Dlg = 2029,
    Itp = 2030,
    Utt = 2032,
    Dds = 2033,
    Uts = 2035,
    Ltr = 2036,
    Gff = 2037,
    Fac = 2038,
    Ute = 2040,
    Utd = 2042,
    Utp = 2044,
    Dft = 2045,
    Gic = 2046,
    Gui = 2047,
    Utm = 2051,
    Dwk = 2052,
    Pwk = 2053,
    Jrl = 2056,
    Sav = 2057,
    Utw = 2058,
    Ssf = 2060,
    Hak = 2061,
    Nwm = 2062,
    Bik = 2063,
    Ptm = 2065,
    Ptt = 2066,
    Erf = 9997,
    Bif = 9998,
    Key = 9999,
}

/// `(code, extension)` in a single table so the two maps can never drift.
const RESOURCE_TYPES: &[(ResourceType, &str)] = &[
    (ResourceType::Bmp, "bmp"),
    (ResourceType::Tga, "tga"),
    (ResourceType::Wav, "wav"),
    (ResourceType::Plt, "plt"),
    (ResourceType::Ini, "ini"),
    (ResourceType::Txt, "txt"),
    (ResourceType::Mdl, "mdl"),
    (ResourceType::Nss, "nss"),
    (ResourceType::Ncs, "ncs"),
    (ResourceType::Mod, "mod"),
    (ResourceType::Are, "are"),
    (ResourceType::Set, "set"),
    (ResourceType::Ifo, "ifo"),
    (ResourceType::Bic, "bic"),
    (ResourceType::Wok, "wok"),
    (ResourceType::TwoDA, "2da"),
    (ResourceType::Tlk, "tlk"),
    (ResourceType::Txi, "txi"),
    (ResourceType::Git, "git"),
    (ResourceType::Uti, "uti"),
    (ResourceType::Utc, "utc"),
    (ResourceType::Dlg, "dlg"),
    (ResourceType::Itp, "itp"),
    (ResourceType::Utt, "utt"),
    (ResourceType::Dds, "dds"),
    (ResourceType::Uts, "uts"),
    (ResourceType::Ltr, "ltr"),
    (ResourceType::Gff, "gff"),
    (ResourceType::Fac, "fac"),
    (ResourceType::Ute, "ute"),
    (ResourceType::Utd, "utd"),
    (ResourceType::Utp, "utp"),
    (ResourceType::Dft, "dft"),
    (ResourceType::Gic, "gic"),
    (ResourceType::Gui, "gui"),
    (ResourceType::Utm, "utm"),
    (ResourceType::Dwk, "dwk"),
    (ResourceType::Pwk, "pwk"),
    (ResourceType::Jrl, "jrl"),
    (ResourceType::Sav, "sav"),
    (ResourceType::Utw, "utw"),
    (ResourceType::Ssf, "ssf"),
    (ResourceType::Hak, "hak"),
    (ResourceType::Nwm, "nwm"),
    (ResourceType::Bik, "bik"),
    (ResourceType::Ptm, "ptm"),
    (ResourceType::Ptt, "ptt"),
    (ResourceType::Erf, "erf"),
    (ResourceType::Bif, "bif"),
    (ResourceType::Key, "key"),
];

impl ResourceType {
    /// Maps an extension (with or without a leading dot) to a type.
    pub fn from_extension(ext: &str) -> ResourceType {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        for &(ty, e) in RESOURCE_TYPES {
            if ext.eq_ignore_ascii_case(e) {
                return ty;
            }
        }
        ResourceType::Invalid
    }

    /// Maps an on-disk type code back to the enum.
    pub fn from_code(code: u16) -> ResourceType {
        for &(ty, _) in RESOURCE_TYPES {
            if ty as u16 == code {
                return ty;
            }
        }
        ResourceType::Invalid
    }

    /// The canonical (lowercase) file extension, or `""` for invalid.
    pub fn extension(self) -> &'static str {
        for &(ty, e) in RESOURCE_TYPES {
            if ty == self {
                return e;
            }
        }
        ""
    }

    pub fn is_valid(self) -> bool {
        self != ResourceType::Invalid
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `(name, type)` resource identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    pub resref: Resref,
    pub restype: ResourceType,
}

impl Resource {
    pub fn new(resref: Resref, restype: ResourceType) -> Self {
        Self { resref, restype }
    }

    /// Parses `name.ext`, failing on unknown extensions or oversize stems.
    pub fn from_filename(filename: &str) -> Option<Resource> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        let restype = ResourceType::from_extension(ext);
        if !restype.is_valid() {
            return None;
        }
        Some(Resource {
            resref: Resref::new(stem)?,
            restype,
        })
    }

    /// Parses the final component of a path via [`Resource::from_filename`].
    pub fn from_path(path: &Path) -> Option<Resource> {
        Resource::from_filename(path.file_name()?.to_str()?)
    }

    /// `name.ext` form used in directory containers and logs.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.resref, self.restype.extension())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.filename())
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Resource::from_filename(&s).ok_or_else(|| D::Error::custom("invalid resource filename"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn resref_case_insensitive() {
        let a = Resref::new("Module").unwrap();
        let b = Resref::new("module").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "MODULE");
        assert_eq!(a.view(), "Module");
        assert_eq!(a.len(), 6);
        assert!(!a.is_empty());

        let mut hasher_a = std::collections::hash_map::DefaultHasher::new();
        let mut hasher_b = std::collections::hash_map::DefaultHasher::new();
        a.hash(&mut hasher_a);
        b.hash(&mut hasher_b);
        assert_eq!(hasher_a.finish(), hasher_b.finish());
    }

    #[test]
    fn resref_rejects_oversize_and_non_ascii() {
        assert!(Resref::new("this_name_is_way_too_long").is_none());
        assert!(Resref::new("héro").is_none());
        assert!(Resref::new("exactly_16_chars").is_some());
    }

    #[test]
    fn resref_ordering_folds_case() {
        let a = Resref::new("Alpha").unwrap();
        let b = Resref::new("beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn restype_conversion() {
        assert_eq!(ResourceType::from_extension("2da"), ResourceType::TwoDA);
        assert_eq!(ResourceType::from_extension(".2da"), ResourceType::TwoDA);
        assert_eq!(ResourceType::from_extension("XXX"), ResourceType::Invalid);
        assert_eq!(ResourceType::TwoDA.extension(), "2da");
        assert_eq!(ResourceType::from_code(2027), ResourceType::Utc);
        assert_eq!(ResourceType::from_code(1234), ResourceType::Invalid);
    }

    #[test]
    fn resource_from_path() {
        assert!(Resource::from_path(&PathBuf::from("test.utc")).is_some());
        assert!(Resource::from_path(&PathBuf::from("test.xxx")).is_none());
        assert!(Resource::from_path(&PathBuf::from(".xxx")).is_none());
        assert!(Resource::from_path(&PathBuf::from("")).is_none());
        assert!(Resource::from_path(&PathBuf::from("sub/test.ini")).is_some());
        assert!(
            Resource::from_path(&PathBuf::from("test_this_is_too_long_for_a_resref.ini")).is_none()
        );
    }

    #[test]
    fn resource_json_is_filename() {
        let r = Resource::new(Resref::new("test").unwrap(), ResourceType::TwoDA);
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json, serde_json::json!("test.2da"));
        let r2: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(r, r2);
    }
}
