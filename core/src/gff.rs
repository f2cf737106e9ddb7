//! The generic file format (GFF): the engine's self-describing structured
//! binary container.
//!
//! A GFF file is five shared tables (struct defs, field defs, labels, field
//! data, field/list indices) behind a 56-byte header. [`Gff`] is the reader
//! with a cursor API; [`GffBuilder`] writes the canonical layout:
//!
//! * structs emitted in first-visit order
//! * labels interned once, ordered by first use
//! * field data packed in field-creation order
//! * index arrays compacted
//! * single-element lists still go through the list-indices indirection

use std::fs;
use std::path::Path;

use crate::bytes::{ByteCursor, ByteWriter};
use crate::locstring::LocString;
use crate::resref::Resref;

pub const GFF_VERSION: &[u8; 4] = b"V3.2";
const HEADER_SIZE: usize = 56;

/// Field type codes as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GffFieldType {
    Byte = 0,
    Char = 1,
    Word = 2,
    Short = 3,
    Dword = 4,
    Int = 5,
    Dword64 = 6,
    Int64 = 7,
    Float = 8,
    Double = 9,
    String = 10,
    Resref = 11,
    LocString = 12,
    Void = 13,
    Struct = 14,
    List = 15,
}

impl GffFieldType {
    pub fn from_code(code: u32) -> Option<GffFieldType> {
        Some(match code {
            0 => GffFieldType::Byte,
            1 => GffFieldType::Char,
            2 => GffFieldType::Word,
            3 => GffFieldType::Short,
            4 => GffFieldType::Dword,
            5 => GffFieldType::Int,
            6 => GffFieldType::Dword64,
            7 => GffFieldType::Int64,
            8 => GffFieldType::Float,
            9 => GffFieldType::Double,
            10 => GffFieldType::String,
            11 => GffFieldType::Resref,
            12 => GffFieldType::LocString,
            13 => GffFieldType::Void,
            14 => GffFieldType::Struct,
            15 => GffFieldType::List,
            _ => return None,
        })
    }
}

/// Struct id of every top-level struct.
pub const STRUCT_ID_TOPLEVEL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy)]
struct StructEntry {
    struct_id: u32,
    data_or_offset: u32,
    field_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct FieldEntry {
    type_code: u32,
    label_index: u32,
    data_or_offset: u32,
}

/// A parsed GFF file. Structural damage yields `valid() == false`.
#[derive(Debug, Default)]
pub struct Gff {
    magic: [u8; 4],
    structs: Vec<StructEntry>,
    fields: Vec<FieldEntry>,
    labels: Vec<String>,
    field_data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
    valid: bool,
}

impl Gff {
    pub fn from_file(path: impl AsRef<Path>) -> Gff {
        match fs::read(path.as_ref()) {
            Ok(bytes) => Gff::from_bytes(&bytes),
            Err(err) => {
                log::error!("gff: failed to read {}: {}", path.as_ref().display(), err);
                Gff::default()
            }
        }
    }

    pub fn from_bytes(data: &[u8]) -> Gff {
        match Gff::parse(data) {
            Some(gff) => gff,
            None => {
                log::error!("gff: structurally invalid file");
                Gff::default()
            }
        }
    }

    fn parse(data: &[u8]) -> Option<Gff> {
        let mut c = ByteCursor::new(data);
        let magic: [u8; 4] = c.read_array()?;
        let version: [u8; 4] = c.read_array()?;
        if &version != GFF_VERSION {
            return None;
        }

        let mut header = [0u32; 12];
        for slot in &mut header {
            *slot = c.read_u32()?;
        }
        let [struct_offset, struct_count, field_offset, field_count, label_offset, label_count, field_data_offset, field_data_count, field_idx_offset, field_idx_count, list_idx_offset, list_idx_count] =
            header;

        if struct_count == 0 {
            return None;
        }

        let mut c = ByteCursor::new(data);
        c.seek(struct_offset as usize).then_some(())?;
        let mut structs = Vec::with_capacity(struct_count as usize);
        for _ in 0..struct_count {
            structs.push(StructEntry {
                struct_id: c.read_u32()?,
                data_or_offset: c.read_u32()?,
                field_count: c.read_u32()?,
            });
        }

        let mut c = ByteCursor::new(data);
        c.seek(field_offset as usize).then_some(())?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(FieldEntry {
                type_code: c.read_u32()?,
                label_index: c.read_u32()?,
                data_or_offset: c.read_u32()?,
            });
        }

        let mut c = ByteCursor::new(data);
        c.seek(label_offset as usize).then_some(())?;
        let mut labels = Vec::with_capacity(label_count as usize);
        for _ in 0..label_count {
            let raw: [u8; 16] = c.read_array()?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(16);
            labels.push(String::from_utf8_lossy(&raw[..end]).into_owned());
        }

        let fd_start = field_data_offset as usize;
        let field_data = data.get(fd_start..fd_start + field_data_count as usize)?.to_vec();

        let fi_start = field_idx_offset as usize;
        let fi_bytes = data.get(fi_start..fi_start + field_idx_count as usize)?;
        let field_indices = fi_bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let li_start = list_idx_offset as usize;
        let li_bytes = data.get(li_start..li_start + list_idx_count as usize)?;
        let list_indices = li_bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Some(Gff {
            magic,
            structs,
            fields,
            labels,
            field_data,
            field_indices,
            list_indices,
            valid: true,
        })
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Content type from the magic, e.g. `"UTC"`.
    pub fn content_type(&self) -> &str {
        std::str::from_utf8(&self.magic)
            .unwrap_or("")
            .trim_end_matches(' ')
    }

    /// The top-level struct.
    pub fn toplevel(&self) -> GffStruct<'_> {
        GffStruct {
            gff: self,
            index: 0,
        }
    }

    /// Field ids of a struct, resolving the one-field inline case.
    fn struct_field_ids(&self, index: usize) -> Vec<usize> {
        let Some(entry) = self.structs.get(index) else {
            return Vec::new();
        };
        match entry.field_count {
            0 => Vec::new(),
            1 => vec![entry.data_or_offset as usize],
            n => {
                let start = entry.data_or_offset as usize / 4;
                self.field_indices
                    .get(start..start + n as usize)
                    .map(|ids| ids.iter().map(|&i| i as usize).collect())
                    .unwrap_or_default()
            }
        }
    }
}

/// Cursor over one struct of a parsed GFF.
#[derive(Clone, Copy)]
pub struct GffStruct<'a> {
    gff: &'a Gff,
    index: usize,
}

impl<'a> GffStruct<'a> {
    pub fn struct_id(&self) -> u32 {
        self.gff
            .structs
            .get(self.index)
            .map(|s| s.struct_id)
            .unwrap_or(STRUCT_ID_TOPLEVEL)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.gff
            .structs
            .get(self.index)
            .map(|s| s.field_count as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field by position within this struct.
    pub fn field_at(&self, i: usize) -> Option<GffField<'a>> {
        let ids = self.gff.struct_field_ids(self.index);
        let index = *ids.get(i)?;
        (index < self.gff.fields.len()).then_some(GffField {
            gff: self.gff,
            index,
        })
    }

    /// Field by label.
    pub fn field(&self, label: &str) -> Option<GffField<'a>> {
        self.iter().find(|f| f.name() == label)
    }

    pub fn has_field(&self, label: &str) -> bool {
        self.field(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = GffField<'a>> + '_ {
        let gff = self.gff;
        self.gff
            .struct_field_ids(self.index)
            .into_iter()
            .filter(move |&i| i < gff.fields.len())
            .map(move |index| GffField { gff, index })
    }

    /// Decodes a leaf field into `out`; `false` on absence or type mismatch.
    pub fn get_to<T: FromGffField>(&self, label: &str, out: &mut T) -> bool {
        match self.field(label).and_then(|f| f.get::<T>()) {
            Some(v) => {
                *out = v;
                true
            }
            None => false,
        }
    }

    /// Decodes a leaf field by label.
    pub fn get<T: FromGffField>(&self, label: &str) -> Option<T> {
        self.field(label).and_then(|f| f.get::<T>())
    }
}

/// Cursor over one field of a parsed GFF.
#[derive(Clone, Copy)]
pub struct GffField<'a> {
    gff: &'a Gff,
    index: usize,
}

impl<'a> GffField<'a> {
    fn entry(&self) -> Option<&'a FieldEntry> {
        self.gff.fields.get(self.index)
    }

    pub fn name(&self) -> &'a str {
        self.entry()
            .and_then(|e| self.gff.labels.get(e.label_index as usize))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn field_type(&self) -> Option<GffFieldType> {
        self.entry().and_then(|e| GffFieldType::from_code(e.type_code))
    }

    fn data_cursor(&self) -> Option<ByteCursor<'a>> {
        let offset = self.entry()?.data_or_offset as usize;
        (offset <= self.gff.field_data.len())
            .then(|| ByteCursor::at(&self.gff.field_data, offset))
    }

    fn inline(&self) -> Option<u32> {
        self.entry().map(|e| e.data_or_offset)
    }

    fn typed_inline(&self, ty: GffFieldType) -> Option<u32> {
        (self.field_type()? == ty).then(|| self.inline()).flatten()
    }

    fn typed_data(&self, ty: GffFieldType) -> Option<ByteCursor<'a>> {
        (self.field_type()? == ty)
            .then(|| self.data_cursor())
            .flatten()
    }

    /// Exact-type leaf decode; mismatches are soft failures.
    pub fn get<T: FromGffField>(&self) -> Option<T> {
        T::from_field(self)
    }

    /// Decodes into `out`, leaving it untouched on failure.
    pub fn get_to<T: FromGffField>(&self, out: &mut T) -> bool {
        match self.get::<T>() {
            Some(v) => {
                *out = v;
                true
            }
            None => false,
        }
    }

    /// The nested struct of a STRUCT field.
    pub fn as_struct(&self) -> Option<GffStruct<'a>> {
        let index = self.typed_inline(GffFieldType::Struct)? as usize;
        (index < self.gff.structs.len()).then_some(GffStruct {
            gff: self.gff,
            index,
        })
    }

    fn list_struct_ids(&self) -> Option<&'a [u32]> {
        let offset = self.typed_inline(GffFieldType::List)? as usize / 4;
        let count = *self.gff.list_indices.get(offset)? as usize;
        self.gff.list_indices.get(offset + 1..offset + 1 + count)
    }

    /// Number of elements of a LIST field, zero for any other type.
    pub fn list_len(&self) -> usize {
        self.list_struct_ids().map(|ids| ids.len()).unwrap_or(0)
    }

    /// The `i`-th struct of a LIST field.
    pub fn list_item(&self, i: usize) -> Option<GffStruct<'a>> {
        let index = *self.list_struct_ids()?.get(i)? as usize;
        (index < self.gff.structs.len()).then_some(GffStruct {
            gff: self.gff,
            index,
        })
    }

    pub fn list_iter(&self) -> impl Iterator<Item = GffStruct<'a>> + '_ {
        (0..self.list_len()).filter_map(move |i| self.list_item(i))
    }
}

/// Exact-type decoding of GFF leaves.
pub trait FromGffField: Sized {
    fn from_field(field: &GffField<'_>) -> Option<Self>;
}

impl FromGffField for u8 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Byte).map(|v| v as u8)
    }
}

impl FromGffField for i8 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Char).map(|v| v as u8 as i8)
    }
}

impl FromGffField for u16 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Word).map(|v| v as u16)
    }
}

impl FromGffField for i16 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Short).map(|v| v as u16 as i16)
    }
}

impl FromGffField for u32 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Dword)
    }
}

impl FromGffField for i32 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Int).map(|v| v as i32)
    }
}

impl FromGffField for u64 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_data(GffFieldType::Dword64)?.read_u64()
    }
}

impl FromGffField for i64 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_data(GffFieldType::Int64)?.read_i64()
    }
}

impl FromGffField for f32 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_inline(GffFieldType::Float).map(f32::from_bits)
    }
}

impl FromGffField for f64 {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        f.typed_data(GffFieldType::Double)?.read_f64()
    }
}

impl FromGffField for String {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        let mut c = f.typed_data(GffFieldType::String)?;
        let len = c.read_u32()? as usize;
        let bytes = c.take(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl FromGffField for Resref {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        let mut c = f.typed_data(GffFieldType::Resref)?;
        let len = c.read_u8()? as usize;
        let bytes = c.take(len.min(crate::resref::RESREF_MAX))?;
        Some(Resref::from(
            std::str::from_utf8(bytes).unwrap_or_default(),
        ))
    }
}

impl FromGffField for LocString {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        let mut c = f.typed_data(GffFieldType::LocString)?;
        let _total = c.read_u32()?;
        let strref = c.read_u32()?;
        let count = c.read_u32()?;
        let mut out = LocString::new(strref);
        for _ in 0..count {
            let id = c.read_u32()?;
            let len = c.read_u32()? as usize;
            let bytes = c.take(len)?;
            out.add_by_id(id, String::from_utf8_lossy(bytes).into_owned());
        }
        Some(out)
    }
}

impl FromGffField for Vec<u8> {
    fn from_field(f: &GffField<'_>) -> Option<Self> {
        let mut c = f.typed_data(GffFieldType::Void)?;
        let len = c.read_u32()? as usize;
        Some(c.take(len)?.to_vec())
    }
}

/// A leaf value handed to [`GffBuilder::add`].
#[derive(Debug, Clone, PartialEq)]
pub enum GffValue {
    Byte(u8),
    Char(i8),
    Word(u16),
    Short(i16),
    Dword(u32),
    Int(i32),
    Dword64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Resref(Resref),
    LocString(LocString),
    Void(Vec<u8>),
}

#[derive(Debug, Clone, Copy)]
enum BuiltData {
    Inline(u32),
    Offset(u32),
    Struct(u32),
    List(u32),
}

#[derive(Debug, Clone)]
struct BuiltField {
    type_code: u32,
    label_index: u32,
    data: BuiltData,
}

#[derive(Debug, Clone)]
struct BuiltStruct {
    struct_id: u32,
    fields: Vec<u32>,
}

/// Handle to a struct under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructRef(u32);

/// Handle to a list under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRef(u32);

/// Canonical GFF writer. See the module docs for the determinism rules.
pub struct GffBuilder {
    magic: [u8; 4],
    structs: Vec<BuiltStruct>,
    fields: Vec<BuiltField>,
    labels: Vec<String>,
    field_data: ByteWriter,
    lists: Vec<Vec<u32>>,
}

impl GffBuilder {
    /// Starts a builder for the given content type (`"UTC"`, `"IFO"`, …).
    pub fn new(content_type: &str) -> GffBuilder {
        let mut magic = [b' '; 4];
        for (i, b) in content_type.bytes().take(4).enumerate() {
            magic[i] = b.to_ascii_uppercase();
        }
        GffBuilder {
            magic,
            structs: vec![BuiltStruct {
                struct_id: STRUCT_ID_TOPLEVEL,
                fields: Vec::new(),
            }],
            fields: Vec::new(),
            labels: Vec::new(),
            field_data: ByteWriter::new(),
            lists: Vec::new(),
        }
    }

    /// The top-level struct.
    pub fn root(&self) -> StructRef {
        StructRef(0)
    }

    fn label_index(&mut self, label: &str) -> u32 {
        if let Some(i) = self.labels.iter().position(|l| l == label) {
            return i as u32;
        }
        let mut trimmed: String = label.chars().filter(|c| c.is_ascii()).collect();
        trimmed.truncate(16);
        self.labels.push(trimmed);
        (self.labels.len() - 1) as u32
    }

    fn push_field(&mut self, parent: StructRef, label: &str, type_code: u32, data: BuiltData) -> u32 {
        let label_index = self.label_index(label);
        self.fields.push(BuiltField {
            type_code,
            label_index,
            data,
        });
        let field_id = (self.fields.len() - 1) as u32;
        self.structs[parent.0 as usize].fields.push(field_id);
        field_id
    }

    /// Appends a leaf field.
    pub fn add(&mut self, parent: StructRef, label: &str, value: GffValue) {
        let (type_code, data) = match value {
            GffValue::Byte(v) => (GffFieldType::Byte as u32, BuiltData::Inline(v as u32)),
            GffValue::Char(v) => (GffFieldType::Char as u32, BuiltData::Inline(v as u8 as u32)),
            GffValue::Word(v) => (GffFieldType::Word as u32, BuiltData::Inline(v as u32)),
            GffValue::Short(v) => (
                GffFieldType::Short as u32,
                BuiltData::Inline(v as u16 as u32),
            ),
            GffValue::Dword(v) => (GffFieldType::Dword as u32, BuiltData::Inline(v)),
            GffValue::Int(v) => (GffFieldType::Int as u32, BuiltData::Inline(v as u32)),
            GffValue::Float(v) => (GffFieldType::Float as u32, BuiltData::Inline(v.to_bits())),
            GffValue::Dword64(v) => {
                let offset = self.field_data.len() as u32;
                self.field_data.write_u64(v);
                (GffFieldType::Dword64 as u32, BuiltData::Offset(offset))
            }
            GffValue::Int64(v) => {
                let offset = self.field_data.len() as u32;
                self.field_data.write_i64(v);
                (GffFieldType::Int64 as u32, BuiltData::Offset(offset))
            }
            GffValue::Double(v) => {
                let offset = self.field_data.len() as u32;
                self.field_data.write_f64(v);
                (GffFieldType::Double as u32, BuiltData::Offset(offset))
            }
            GffValue::String(s) => {
                let offset = self.field_data.len() as u32;
                self.field_data.write_u32(s.len() as u32);
                self.field_data.write_bytes(s.as_bytes());
                (GffFieldType::String as u32, BuiltData::Offset(offset))
            }
            GffValue::Resref(r) => {
                let offset = self.field_data.len() as u32;
                let view = r.view();
                self.field_data.write_u8(view.len() as u8);
                self.field_data.write_bytes(view.as_bytes());
                (GffFieldType::Resref as u32, BuiltData::Offset(offset))
            }
            GffValue::LocString(l) => {
                let offset = self.field_data.len() as u32;
                let total: usize = 8 + l.iter().map(|(_, s)| 8 + s.len()).sum::<usize>();
                self.field_data.write_u32(total as u32);
                self.field_data.write_u32(l.strref());
                self.field_data.write_u32(l.len() as u32);
                for (id, s) in l.iter() {
                    self.field_data.write_u32(id);
                    self.field_data.write_u32(s.len() as u32);
                    self.field_data.write_bytes(s.as_bytes());
                }
                (GffFieldType::LocString as u32, BuiltData::Offset(offset))
            }
            GffValue::Void(v) => {
                let offset = self.field_data.len() as u32;
                self.field_data.write_u32(v.len() as u32);
                self.field_data.write_bytes(&v);
                (GffFieldType::Void as u32, BuiltData::Offset(offset))
            }
        };
        self.push_field(parent, label, type_code, data);
    }

    /// Appends a nested STRUCT field and returns the new struct.
    pub fn add_struct(&mut self, parent: StructRef, label: &str, struct_id: u32) -> StructRef {
        self.structs.push(BuiltStruct {
            struct_id,
            fields: Vec::new(),
        });
        let index = (self.structs.len() - 1) as u32;
        self.push_field(parent, label, GffFieldType::Struct as u32, BuiltData::Struct(index));
        StructRef(index)
    }

    /// Appends an empty LIST field.
    pub fn add_list(&mut self, parent: StructRef, label: &str) -> ListRef {
        self.lists.push(Vec::new());
        let index = (self.lists.len() - 1) as u32;
        self.push_field(parent, label, GffFieldType::List as u32, BuiltData::List(index));
        ListRef(index)
    }

    /// Appends a struct element to a list and returns it.
    pub fn list_append(&mut self, list: ListRef, struct_id: u32) -> StructRef {
        self.structs.push(BuiltStruct {
            struct_id,
            fields: Vec::new(),
        });
        let index = (self.structs.len() - 1) as u32;
        self.lists[list.0 as usize].push(index);
        StructRef(index)
    }

    /// Serializes the canonical byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Compact field-indices: multi-field structs only, in struct order.
        let mut field_indices = ByteWriter::new();
        let mut struct_data = Vec::with_capacity(self.structs.len());
        for s in &self.structs {
            match s.fields.len() {
                0 => struct_data.push(0u32),
                1 => struct_data.push(s.fields[0]),
                _ => {
                    struct_data.push(field_indices.len() as u32);
                    for &f in &s.fields {
                        field_indices.write_u32(f);
                    }
                }
            }
        }

        // List-indices in list-creation order; every list is indirected.
        let mut list_indices = ByteWriter::new();
        let mut list_offsets = Vec::with_capacity(self.lists.len());
        for l in &self.lists {
            list_offsets.push(list_indices.len() as u32);
            list_indices.write_u32(l.len() as u32);
            for &s in l {
                list_indices.write_u32(s);
            }
        }

        let struct_offset = HEADER_SIZE;
        let field_offset = struct_offset + self.structs.len() * 12;
        let label_offset = field_offset + self.fields.len() * 12;
        let field_data_offset = label_offset + self.labels.len() * 16;
        let field_idx_offset = field_data_offset + self.field_data.len();
        let list_idx_offset = field_idx_offset + field_indices.len();

        let mut w = ByteWriter::new();
        w.write_bytes(&self.magic);
        w.write_bytes(GFF_VERSION);
        w.write_u32(struct_offset as u32);
        w.write_u32(self.structs.len() as u32);
        w.write_u32(field_offset as u32);
        w.write_u32(self.fields.len() as u32);
        w.write_u32(label_offset as u32);
        w.write_u32(self.labels.len() as u32);
        w.write_u32(field_data_offset as u32);
        w.write_u32(self.field_data.len() as u32);
        w.write_u32(field_idx_offset as u32);
        w.write_u32(field_indices.len() as u32);
        w.write_u32(list_idx_offset as u32);
        w.write_u32(list_indices.len() as u32);

        for (s, &data) in self.structs.iter().zip(&struct_data) {
            w.write_u32(s.struct_id);
            w.write_u32(data);
            w.write_u32(s.fields.len() as u32);
        }

        for f in &self.fields {
            w.write_u32(f.type_code);
            w.write_u32(f.label_index);
            let raw = match f.data {
                BuiltData::Inline(v) | BuiltData::Offset(v) => v,
                BuiltData::Struct(i) => i,
                BuiltData::List(i) => list_offsets[i as usize],
            };
            w.write_u32(raw);
        }

        for label in &self.labels {
            let mut raw = [0u8; 16];
            raw[..label.len()].copy_from_slice(label.as_bytes());
            w.write_bytes(&raw);
        }

        w.write_bytes(self.field_data.as_slice());
        w.write_bytes(field_indices.as_slice());
        w.write_bytes(list_indices.as_slice());
        w.into_vec()
    }

    /// Rebuilds a builder from a parsed file, visiting structs depth-first.
    ///
    /// For files produced by this writer the result serializes byte-identical.
    pub fn from_gff(gff: &Gff) -> Option<GffBuilder> {
        if !gff.valid() {
            return None;
        }
        let mut builder = GffBuilder::new(gff.content_type());
        let root = builder.root();
        copy_struct(&mut builder, root, &gff.toplevel())?;
        Some(builder)
    }
}

fn copy_struct(builder: &mut GffBuilder, dest: StructRef, src: &GffStruct<'_>) -> Option<()> {
    for field in src.iter() {
        let label = field.name().to_string();
        match field.field_type()? {
            GffFieldType::Byte => builder.add(dest, &label, GffValue::Byte(field.get()?)),
            GffFieldType::Char => builder.add(dest, &label, GffValue::Char(field.get()?)),
            GffFieldType::Word => builder.add(dest, &label, GffValue::Word(field.get()?)),
            GffFieldType::Short => builder.add(dest, &label, GffValue::Short(field.get()?)),
            GffFieldType::Dword => builder.add(dest, &label, GffValue::Dword(field.get()?)),
            GffFieldType::Int => builder.add(dest, &label, GffValue::Int(field.get()?)),
            GffFieldType::Dword64 => builder.add(dest, &label, GffValue::Dword64(field.get()?)),
            GffFieldType::Int64 => builder.add(dest, &label, GffValue::Int64(field.get()?)),
            GffFieldType::Float => builder.add(dest, &label, GffValue::Float(field.get()?)),
            GffFieldType::Double => builder.add(dest, &label, GffValue::Double(field.get()?)),
            GffFieldType::String => builder.add(dest, &label, GffValue::String(field.get()?)),
            GffFieldType::Resref => builder.add(dest, &label, GffValue::Resref(field.get()?)),
            GffFieldType::LocString => {
                builder.add(dest, &label, GffValue::LocString(field.get()?))
            }
            GffFieldType::Void => builder.add(dest, &label, GffValue::Void(field.get()?)),
            GffFieldType::Struct => {
                let nested = field.as_struct()?;
                let child = builder.add_struct(dest, &label, nested.struct_id());
                copy_struct(builder, child, &nested)?;
            }
            GffFieldType::List => {
                let list = builder.add_list(dest, &label);
                for item in field.list_iter() {
                    let child = builder.list_append(list, item.struct_id());
                    copy_struct(builder, child, &item)?;
                }
            }
        }
    }
    Some(())
}
