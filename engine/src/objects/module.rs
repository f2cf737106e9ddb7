//! The module object: the `module.ifo` manifest of areas, hak dependencies,
//! and the optional custom talk table.

use aurora_core::gff::GffStruct;
use aurora_core::resref::Resref;

use super::common::{Common, ObjectHandle, ScriptRefs};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub common: Common,
    pub scripts: ScriptRefs,
    /// Area resrefs in `Mod_Area` order.
    pub area_resrefs: Vec<Resref>,
    /// Live area objects, parallel to `area_resrefs` once loaded.
    pub areas: Vec<ObjectHandle>,
    /// Hak archives, topmost first.
    pub haks: Vec<String>,
    pub custom_tlk: Option<String>,
}

impl Module {
    pub fn from_gff(s: &GffStruct<'_>) -> Option<Module> {
        if s.is_empty() {
            return None;
        }
        let mut module = Module::default();
        s.get_to("Mod_Name", &mut module.common.name);
        s.get_to("Mod_Tag", &mut module.common.tag);

        let area_list = s.field("Mod_Area")?;
        for item in area_list.list_iter() {
            module.area_resrefs.push(item.get::<Resref>("Area_Name")?);
        }

        if let Some(haks) = s.field("Mod_HakList") {
            for item in haks.list_iter() {
                if let Some(h) = item.get::<String>("Mod_Hak") {
                    module.haks.push(h);
                }
            }
        } else if let Some(hak) = s.get::<String>("Mod_Hak") {
            // Pre-hak-list manifests carry a single name.
            if !hak.is_empty() {
                module.haks.push(hak);
            }
        }

        if let Some(tlk) = s.get::<String>("Mod_CustomTlk") {
            if !tlk.is_empty() {
                module.custom_tlk = Some(tlk);
            }
        }

        if let Some(r) = s.get::<Resref>("Mod_OnHeartbeat") {
            module.scripts.on_heartbeat = r;
        }
        if let Some(r) = s.get::<Resref>("Mod_OnUsrDefined") {
            module.scripts.on_user_defined = r;
        }
        Some(module)
    }

    pub fn area_count(&self) -> usize {
        self.area_resrefs.len()
    }

    pub fn get_area(&self, index: usize) -> Option<ObjectHandle> {
        self.areas.get(index).copied()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use aurora_core::gff::{GffBuilder, GffValue};
    use aurora_core::resref::Resref;

    /// Builds a `module.ifo` naming the given areas and haks.
    pub fn build_ifo(areas: &[&str], haks: &[&str], custom_tlk: Option<&str>) -> GffBuilder {
        let mut b = GffBuilder::new("IFO");
        let root = b.root();
        b.add(root, "Mod_Tag", GffValue::String("DEMO".into()));
        let list = b.add_list(root, "Mod_Area");
        for area in areas {
            let s = b.list_append(list, 6);
            b.add(s, "Area_Name", GffValue::Resref(Resref::from(*area)));
        }
        let hak_list = b.add_list(root, "Mod_HakList");
        for hak in haks {
            let s = b.list_append(hak_list, 8);
            b.add(s, "Mod_Hak", GffValue::String(hak.to_string()));
        }
        b.add(
            root,
            "Mod_CustomTlk",
            GffValue::String(custom_tlk.unwrap_or("").to_string()),
        );
        b
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_ifo;
    use super::*;
    use aurora_core::gff::Gff;

    #[test]
    fn manifest_fields() {
        let b = build_ifo(&["start", "crypt"], &["ruleset"], Some("demo_tlk"));
        let gff = Gff::from_bytes(&b.to_bytes());
        let module = Module::from_gff(&gff.toplevel()).unwrap();

        assert_eq!(module.area_count(), 2);
        assert_eq!(module.area_resrefs[0], "start");
        assert_eq!(module.haks, ["ruleset"]);
        assert_eq!(module.custom_tlk.as_deref(), Some("demo_tlk"));
        assert_eq!(module.common.tag, "DEMO");
        // Areas are not yet instantiated.
        assert!(module.get_area(0).is_none());
    }

    #[test]
    fn missing_area_list_is_fatal() {
        let mut b = aurora_core::gff::GffBuilder::new("IFO");
        let root = b.root();
        b.add(
            root,
            "Mod_Tag",
            aurora_core::gff::GffValue::String("X".into()),
        );
        let gff = Gff::from_bytes(&b.to_bytes());
        assert!(Module::from_gff(&gff.toplevel()).is_none());
    }
}
