//! The strings service: dialog/custom talk-table lookup plus tag interning.

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use aurora_core::locstring::{Language, LocString, STRREF_INVALID};
use aurora_core::tlk::Tlk;

/// First strref of the custom (module) talk table.
pub const CUSTOM_TLK_BASE: u32 = 0x0100_0000;

#[derive(Default)]
pub struct Strings {
    dialog: Option<Tlk>,
    custom: Option<Tlk>,
    interned: HashSet<Rc<str>>,
}

impl Strings {
    pub fn new() -> Strings {
        Strings::default()
    }

    pub fn load_dialog_tlk(&mut self, path: impl AsRef<Path>) -> bool {
        let tlk = Tlk::from_file(path.as_ref());
        if !tlk.valid() {
            log::error!("strings: bad dialog tlk {}", path.as_ref().display());
            return false;
        }
        self.dialog = Some(tlk);
        true
    }

    pub fn load_custom_tlk(&mut self, path: impl AsRef<Path>) -> bool {
        let tlk = Tlk::from_file(path.as_ref());
        if !tlk.valid() {
            log::error!("strings: bad custom tlk {}", path.as_ref().display());
            return false;
        }
        self.custom = Some(tlk);
        true
    }

    pub fn set_dialog_tlk(&mut self, tlk: Tlk) {
        self.dialog = Some(tlk);
    }

    pub fn set_custom_tlk(&mut self, tlk: Tlk) {
        self.custom = Some(tlk);
    }

    pub fn unload_custom_tlk(&mut self) {
        self.custom = None;
    }

    /// Resolves a strref. References at or above [`CUSTOM_TLK_BASE`] go to
    /// the custom table; the invalid sentinel and misses resolve to `""`.
    pub fn get(&self, strref: u32) -> &str {
        if strref == STRREF_INVALID {
            return "";
        }
        if strref >= CUSTOM_TLK_BASE {
            return match &self.custom {
                Some(tlk) => tlk.get(strref - CUSTOM_TLK_BASE),
                None => "",
            };
        }
        match &self.dialog {
            Some(tlk) => tlk.get(strref),
            None => "",
        }
    }

    /// Resolves a locstring: an inline string wins over the table lookup.
    pub fn get_locstring<'a>(&'a self, loc: &'a LocString) -> &'a str {
        if let Some(s) = loc.get(Language::English, false) {
            return s;
        }
        self.get(loc.strref())
    }

    /// Interns a frequently-reused string, returning the shared copy.
    pub fn intern(&mut self, s: &str) -> Rc<str> {
        if let Some(existing) = self.interned.get(s) {
            return existing.clone();
        }
        let shared: Rc<str> = Rc::from(s);
        self.interned.insert(shared.clone());
        shared
    }

    /// Non-allocating probe of the intern table.
    pub fn get_interned(&self, s: &str) -> Option<Rc<str>> {
        self.interned.get(s).cloned()
    }

    /// Drops the custom table and the intern pool; the dialog table stays.
    pub fn clear_module_state(&mut self) {
        self.custom = None;
        self.interned.clear();
    }
}
