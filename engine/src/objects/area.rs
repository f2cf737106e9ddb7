//! Areas: static properties from the `.are` sheet, instance lists from the
//! `.git` sheet. Child objects are held by handle, never by ownership, so
//! the area ↔ creature cycle stays acyclic in memory.

use aurora_core::gff::GffStruct;
use aurora_core::resref::Resref;

use super::common::{Common, ObjectHandle, ScriptRefs};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Area {
    pub common: Common,
    pub scripts: ScriptRefs,
    pub height: i32,
    pub width: i32,
    /// Live creature instances, in spawn order. Destroyed with the area.
    pub creatures: Vec<ObjectHandle>,
}

impl Area {
    /// Deserializes the static `.are` properties.
    pub fn from_gff(s: &GffStruct<'_>) -> Option<Area> {
        let mut area = Area {
            common: Common {
                resref: s.get::<Resref>("ResRef")?,
                ..Common::default()
            },
            ..Area::default()
        };
        s.get_to("Tag", &mut area.common.tag);
        s.get_to("Name", &mut area.common.name);
        s.get_to("Height", &mut area.height);
        s.get_to("Width", &mut area.width);

        if let Some(r) = s.get::<Resref>("OnEnter") {
            area.scripts.on_enter = r;
        }
        if let Some(r) = s.get::<Resref>("OnExit") {
            area.scripts.on_exit = r;
        }
        if let Some(r) = s.get::<Resref>("OnHeartbeat") {
            area.scripts.on_heartbeat = r;
        }
        if let Some(r) = s.get::<Resref>("OnUserDefined") {
            area.scripts.on_user_defined = r;
        }
        Some(area)
    }

    /// Creature blueprint resrefs named by a `.git` instance sheet.
    pub fn instance_resrefs(git: &GffStruct<'_>) -> Vec<Resref> {
        let mut out = Vec::new();
        if let Some(list) = git.field("Creature List") {
            for item in list.list_iter() {
                if let Some(r) = item.get::<Resref>("TemplateResRef") {
                    out.push(r);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::gff::{Gff, GffBuilder, GffValue};

    #[test]
    fn are_fields() {
        let mut b = GffBuilder::new("ARE");
        let root = b.root();
        b.add(root, "ResRef", GffValue::Resref(Resref::from("start")));
        b.add(root, "Tag", GffValue::String("START".into()));
        b.add(root, "Height", GffValue::Int(8));
        b.add(root, "Width", GffValue::Int(8));
        b.add(root, "OnEnter", GffValue::Resref(Resref::from("area_enter")));

        let gff = Gff::from_bytes(&b.to_bytes());
        let area = Area::from_gff(&gff.toplevel()).unwrap();
        assert_eq!(area.common.resref, "start");
        assert_eq!(area.common.tag, "START");
        assert_eq!(area.height, 8);
        assert_eq!(area.scripts.on_enter, "area_enter");

        // Missing ResRef is fatal.
        let empty = GffBuilder::new("ARE");
        let gff = Gff::from_bytes(&empty.to_bytes());
        assert!(Area::from_gff(&gff.toplevel()).is_none());
    }

    #[test]
    fn git_instances() {
        let mut b = GffBuilder::new("GIT");
        let root = b.root();
        let list = b.add_list(root, "Creature List");
        for name in ["nw_chicken", "nw_chicken", "test_creature"] {
            let s = b.list_append(list, 4);
            b.add(s, "TemplateResRef", GffValue::Resref(Resref::from(name)));
        }

        let gff = Gff::from_bytes(&b.to_bytes());
        let resrefs = Area::instance_resrefs(&gff.toplevel());
        assert_eq!(resrefs.len(), 3);
        assert_eq!(resrefs[2], "test_creature");
    }
}
