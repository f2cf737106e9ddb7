//! Canonical JSON projection of GFF data.
//!
//! Leaves map to their natural JSON scalar, locstrings to
//! `{strref, strings: [{lang, string}…]}`, structs to objects carrying the
//! reserved `__struct_id` key, lists to arrays. Object keys keep field order.

use serde_json::{Map, Value};

use crate::gff::{Gff, GffField, GffFieldType, GffStruct};
use crate::locstring::LocString;
use crate::resref::Resref;

/// Reserved object key holding the struct's schema discriminator.
pub const STRUCT_ID_KEY: &str = "__struct_id";

/// Projects a whole file; `None` when the file is invalid.
pub fn gff_to_json(gff: &Gff) -> Option<Value> {
    if !gff.valid() {
        return None;
    }
    Some(struct_to_json(&gff.toplevel()))
}

/// Projects one struct, preserving field insertion order.
pub fn struct_to_json(s: &GffStruct<'_>) -> Value {
    let mut map = Map::new();
    map.insert(STRUCT_ID_KEY.into(), Value::from(s.struct_id()));
    for field in s.iter() {
        map.insert(field.name().to_string(), field_to_json(&field));
    }
    Value::Object(map)
}

fn field_to_json(field: &GffField<'_>) -> Value {
    let Some(ty) = field.field_type() else {
        return Value::Null;
    };
    match ty {
        GffFieldType::Byte => field.get::<u8>().map(Value::from),
        GffFieldType::Char => field.get::<i8>().map(Value::from),
        GffFieldType::Word => field.get::<u16>().map(Value::from),
        GffFieldType::Short => field.get::<i16>().map(Value::from),
        GffFieldType::Dword => field.get::<u32>().map(Value::from),
        GffFieldType::Int => field.get::<i32>().map(Value::from),
        GffFieldType::Dword64 => field.get::<u64>().map(Value::from),
        GffFieldType::Int64 => field.get::<i64>().map(Value::from),
        GffFieldType::Float => field.get::<f32>().map(Value::from),
        GffFieldType::Double => field.get::<f64>().map(Value::from),
        GffFieldType::String => field.get::<String>().map(Value::from),
        GffFieldType::Resref => field
            .get::<Resref>()
            .map(|r| Value::from(r.view().to_string())),
        GffFieldType::LocString => field
            .get::<LocString>()
            .and_then(|l| serde_json::to_value(l).ok()),
        GffFieldType::Void => field.get::<Vec<u8>>().map(|bytes| {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            Value::from(hex)
        }),
        GffFieldType::Struct => field.as_struct().map(|s| struct_to_json(&s)),
        GffFieldType::List => Some(Value::Array(
            field.list_iter().map(|s| struct_to_json(&s)).collect(),
        )),
    }
    .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff::{GffBuilder, GffValue};
    use crate::locstring::Language;

    #[test]
    fn projection_shape_and_key_order() {
        let mut b = GffBuilder::new("UTC");
        let root = b.root();
        b.add(root, "Gender", GffValue::Byte(1));
        b.add(root, "TemplateResRef", GffValue::Resref(Resref::from("nw_chicken")));
        let mut name = LocString::new(42);
        name.add(Language::English, "Chicken", false);
        b.add(root, "FirstName", GffValue::LocString(name));
        let list = b.add_list(root, "ClassList");
        let c = b.list_append(list, 2);
        b.add(c, "Class", GffValue::Int(12));

        let g = Gff::from_bytes(&b.to_bytes());
        let json = gff_to_json(&g).unwrap();

        let obj = json.as_object().unwrap();
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(
            keys,
            ["__struct_id", "Gender", "TemplateResRef", "FirstName", "ClassList"]
        );

        assert_eq!(obj["__struct_id"], Value::from(u32::MAX));
        assert_eq!(obj["Gender"], Value::from(1));
        assert_eq!(obj["TemplateResRef"], Value::from("nw_chicken"));
        assert_eq!(obj["FirstName"]["strref"], Value::from(42));
        assert_eq!(obj["FirstName"]["strings"][0]["string"], Value::from("Chicken"));
        assert_eq!(obj["ClassList"][0]["Class"], Value::from(12));
        assert_eq!(obj["ClassList"][0]["__struct_id"], Value::from(2));
    }

    #[test]
    fn invalid_file_projects_to_none() {
        let g = Gff::from_bytes(b"garbage");
        assert!(gff_to_json(&g).is_none());
    }

    #[test]
    fn void_is_hex() {
        let mut b = GffBuilder::new("GFF");
        let root = b.root();
        b.add(root, "Blob", GffValue::Void(vec![0xDE, 0xAD]));
        let g = Gff::from_bytes(&b.to_bytes());
        let json = gff_to_json(&g).unwrap();
        assert_eq!(json["Blob"], Value::from("dead"));
    }
}
