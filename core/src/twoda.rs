//! 2DA tabular data: `2DA V2.0` textual sheets with typed cell access.
//!
//! Empty cells (`****`) are a first-class value distinct from zero. Cells are
//! typed on access; writes override the cell's type.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// One cell value for writes and defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i32),
    Float(f32),
    Str(String),
}

impl Cell {
    fn render(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Int(v) => Some(v.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Str(s) => Some(s.clone()),
        }
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Int(v)
    }
}

impl From<f32> for Cell {
    fn from(v: f32) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Str(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Str(v)
    }
}

/// Typed decoding of a raw cell.
pub trait FromCell: Sized {
    fn from_cell(raw: &str) -> Option<Self>;
}

impl FromCell for i32 {
    fn from_cell(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16).ok().map(|v| v as i32);
        }
        raw.parse().ok()
    }
}

impl FromCell for f32 {
    fn from_cell(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl FromCell for String {
    fn from_cell(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

/// Column reference: position or name (names compare case-insensitively).
pub trait ColumnRef {
    fn resolve(&self, columns: &[String]) -> Option<usize>;
}

impl ColumnRef for usize {
    fn resolve(&self, columns: &[String]) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }
}

impl ColumnRef for &str {
    fn resolve(&self, columns: &[String]) -> Option<usize> {
        columns.iter().position(|c| c.eq_ignore_ascii_case(self))
    }
}

/// A mutable 2DA sheet.
#[derive(Debug, Clone, Default)]
pub struct TwoDA {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    default_value: Option<String>,
    column_defaults: HashMap<usize, String>,
    valid: bool,
}

fn tokenize(line: &str) -> Vec<Option<String>> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };
        let token = if first == '"' {
            chars.next();
            let mut tok = String::new();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                tok.push(c);
            }
            tok
        } else {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                tok.push(c);
                chars.next();
            }
            tok
        };
        out.push(if token == "****" { None } else { Some(token) });
    }
    out
}

impl TwoDA {
    pub fn from_file(path: impl AsRef<Path>) -> TwoDA {
        match fs::read_to_string(path.as_ref()) {
            Ok(text) => TwoDA::from_str_data(&text),
            Err(err) => {
                log::error!("2da: failed to read {}: {}", path.as_ref().display(), err);
                TwoDA::default()
            }
        }
    }

    pub fn from_str_data(text: &str) -> TwoDA {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let Some(sig) = lines.next() else {
            return TwoDA::default();
        };
        let mut sig_parts = sig.split_whitespace();
        if sig_parts.next() != Some("2DA") || sig_parts.next() != Some("V2.0") {
            log::error!("2da: bad signature line");
            return TwoDA::default();
        }

        // Optional DEFAULT line, then the column header line.
        let mut default_value = None;
        let mut header = None;
        for line in lines.by_ref() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("DEFAULT:") {
                default_value = Some(rest.trim().to_string());
                continue;
            }
            header = Some(line);
            break;
        }
        let Some(header) = header else {
            return TwoDA::default();
        };
        let columns: Vec<String> = tokenize(header).into_iter().flatten().collect();
        if columns.is_empty() {
            return TwoDA::default();
        }

        let mut rows = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let mut cells = tokenize(line);
            if cells.is_empty() {
                continue;
            }
            // First token is the row label; it is positional, not data.
            cells.remove(0);
            cells.resize(columns.len(), None);
            rows.push(cells);
        }

        TwoDA {
            columns,
            rows,
            default_value,
            column_defaults: HashMap::new(),
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// The sheet-wide `DEFAULT:` value, if any.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Installs a default consulted when a cell in `col` is empty.
    pub fn set_column_default(&mut self, col: impl ColumnRef, value: impl Into<Cell>) {
        if let Some(ci) = col.resolve(&self.columns) {
            match value.into().render() {
                Some(v) => {
                    self.column_defaults.insert(ci, v);
                }
                None => {
                    self.column_defaults.remove(&ci);
                }
            }
        }
    }

    fn raw(&self, row: usize, col: usize) -> Option<&str> {
        match self.rows.get(row)?.get(col)? {
            Some(cell) => Some(cell.as_str()),
            None => self
                .column_defaults
                .get(&col)
                .map(String::as_str)
                .or(self.default_value.as_deref()),
        }
    }

    /// Typed cell access; `None` for empty cells and parse failures.
    pub fn get<T: FromCell>(&self, row: usize, col: impl ColumnRef) -> Option<T> {
        let ci = col.resolve(&self.columns)?;
        T::from_cell(self.raw(row, ci)?)
    }

    /// Overwrites a cell, overriding its previous type.
    pub fn set(&mut self, row: usize, col: impl ColumnRef, value: impl Into<Cell>) {
        let Some(ci) = col.resolve(&self.columns) else {
            log::warn!("2da: set on unknown column");
            return;
        };
        let Some(r) = self.rows.get_mut(row) else {
            log::warn!("2da: set on out-of-range row {row}");
            return;
        };
        r[ci] = value.into().render();
    }

    /// Appends an empty row and returns its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(vec![None; self.columns.len()]);
        self.rows.len() - 1
    }

    /// A sheet with the given columns and no rows.
    pub fn with_columns(columns: &[&str]) -> TwoDA {
        TwoDA {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            default_value: None,
            column_defaults: HashMap::new(),
            valid: true,
        }
    }
}

fn quote(cell: &str) -> String {
    if cell.is_empty() || cell.contains(char::is_whitespace) {
        format!("\"{cell}\"")
    } else {
        cell.to_string()
    }
}

impl fmt::Display for TwoDA {
    /// Canonical serialization: each column as wide as its widest cell plus
    /// one space.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "2DA V2.0")?;
        match &self.default_value {
            Some(v) => writeln!(f, "DEFAULT: {v}")?,
            None => writeln!(f)?,
        }

        let label_width = self.rows.len().saturating_sub(1).to_string().len();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| quote(c).len()).collect();
        for row in &self.rows {
            for (ci, cell) in row.iter().enumerate() {
                let len = match cell {
                    Some(c) => quote(c).len(),
                    None => 4,
                };
                if len > widths[ci] {
                    widths[ci] = len;
                }
            }
        }

        write!(f, "{:label_width$}", "")?;
        for (ci, col) in self.columns.iter().enumerate() {
            write!(f, " {:width$}", quote(col), width = widths[ci])?;
        }
        writeln!(f)?;

        for (ri, row) in self.rows.iter().enumerate() {
            write!(f, "{ri:<label_width$}")?;
            for (ci, cell) in row.iter().enumerate() {
                let rendered = match cell {
                    Some(c) => quote(c),
                    None => "****".to_string(),
                };
                write!(f, " {:width$}", rendered, width = widths[ci])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Read-only 2DA over a single backing buffer, with cells stored as spans so
/// parsing allocates nothing per cell.
#[derive(Debug, Default)]
pub struct StaticTwoDA {
    source: String,
    columns: Vec<(usize, usize)>,
    rows: Vec<Vec<Option<(usize, usize)>>>,
    valid: bool,
}

fn tokenize_spans(source: &str, start: usize, end: usize) -> Vec<Option<(usize, usize)>> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut i = start;
    while i < end {
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= end {
            break;
        }
        let span = if bytes[i] == b'"' {
            i += 1;
            let s = i;
            while i < end && bytes[i] != b'"' {
                i += 1;
            }
            let span = (s, i);
            i += 1;
            span
        } else {
            let s = i;
            while i < end && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            (s, i)
        };
        out.push(if &source[span.0..span.1] == "****" {
            None
        } else {
            Some(span)
        });
    }
    out
}

impl StaticTwoDA {
    pub fn from_string(source: String) -> StaticTwoDA {
        let mut line_ranges = Vec::new();
        let mut start = 0;
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                let mut end = i;
                if end > start && source.as_bytes()[end - 1] == b'\r' {
                    end -= 1;
                }
                line_ranges.push((start, end));
                start = i + 1;
            }
        }
        if start < source.len() {
            line_ranges.push((start, source.len()));
        }

        let mut iter = line_ranges.into_iter();
        let Some((s, e)) = iter.next() else {
            return StaticTwoDA::default();
        };
        let mut sig = source[s..e].split_whitespace();
        if sig.next() != Some("2DA") || sig.next() != Some("V2.0") {
            return StaticTwoDA::default();
        }

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        for (s, e) in iter {
            let line = source[s..e].trim();
            if line.is_empty() || line.starts_with("DEFAULT:") {
                continue;
            }
            if columns.is_empty() {
                columns = tokenize_spans(&source, s, e).into_iter().flatten().collect();
                continue;
            }
            let mut cells = tokenize_spans(&source, s, e);
            if cells.is_empty() {
                continue;
            }
            cells.remove(0);
            cells.resize(columns.len(), None);
            rows.push(cells);
        }

        if columns.is_empty() {
            return StaticTwoDA::default();
        }
        StaticTwoDA {
            source,
            columns,
            rows,
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|&(s, e)| self.source[s..e].eq_ignore_ascii_case(name))
    }

    /// Borrowing cell access.
    pub fn get_str(&self, row: usize, col: &str) -> Option<&str> {
        let ci = self.column_index(col)?;
        let (s, e) = (*self.rows.get(row)?.get(ci)?)?;
        Some(&self.source[s..e])
    }

    pub fn get<T: FromCell>(&self, row: usize, col: &str) -> Option<T> {
        T::from_cell(self.get_str(row, col)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEAT_SHEET: &str = "2DA V2.0\n\
\n\
   LABEL        FEAT  MINSTR  DESC\n\
0  Alertness    289   ****    \"Extra awareness\"\n\
1  ArmProfLight 290   ****    ****\n\
2  ArmProfMed   291   13      armor\n";

    #[test]
    fn parse_and_typed_access() {
        let sheet = TwoDA::from_str_data(FEAT_SHEET);
        assert!(sheet.is_valid());
        assert_eq!(sheet.rows(), 3);
        assert_eq!(sheet.columns(), 4);
        assert_eq!(sheet.get::<String>(2, 0), Some("ArmProfMed".to_string()));
        assert_eq!(sheet.get::<i32>(0, "FEAT"), Some(289));
        assert_eq!(sheet.get::<i32>(2, "MINSTR"), Some(13));
        assert_eq!(
            sheet.get::<String>(0, "DESC"),
            Some("Extra awareness".to_string())
        );
    }

    #[test]
    fn empty_cells_are_not_zero() {
        let sheet = TwoDA::from_str_data(FEAT_SHEET);
        assert_eq!(sheet.get::<i32>(0, "MINSTR"), None);
        assert_eq!(sheet.get::<String>(1, "DESC"), None);
        // Out of range is also a soft miss.
        assert_eq!(sheet.get::<i32>(99, "FEAT"), None);
        assert_eq!(sheet.get::<i32>(0, "NOPE"), None);
    }

    #[test]
    fn set_overrides_cell_type() {
        let mut sheet = TwoDA::from_str_data(FEAT_SHEET);
        sheet.set(0, 1, 10);
        assert_eq!(sheet.get::<i32>(0, 1), Some(10));
        sheet.set(0, 1, 10.5f32);
        assert_eq!(sheet.get::<f32>(0, 1), Some(10.5));
        sheet.set(0, 1, "test");
        assert_eq!(sheet.get::<String>(0, 1), Some("test".to_string()));
    }

    #[test]
    fn defaults() {
        let text = "2DA V2.0\nDEFAULT: 7\n L  A\n0 ****\n";
        let sheet = TwoDA::from_str_data(text);
        assert!(sheet.is_valid());
        assert_eq!(sheet.default_value(), Some("7"));
        assert_eq!(sheet.get::<i32>(0, "A"), Some(7));

        let mut sheet = TwoDA::from_str_data(FEAT_SHEET);
        assert_eq!(sheet.get::<i32>(0, "MINSTR"), None);
        sheet.set_column_default("MINSTR", 3);
        assert_eq!(sheet.get::<i32>(0, "MINSTR"), Some(3));
        assert_eq!(sheet.get::<i32>(2, "MINSTR"), Some(13));
    }

    #[test]
    fn serialize_reparses() {
        let sheet = TwoDA::from_str_data(FEAT_SHEET);
        let text = sheet.to_string();
        let again = TwoDA::from_str_data(&text);
        assert!(again.is_valid());
        assert_eq!(again.rows(), sheet.rows());
        assert_eq!(again.get::<i32>(0, "FEAT"), Some(289));
        assert_eq!(again.get::<String>(0, "DESC"), Some("Extra awareness".into()));
        assert_eq!(again.get::<i32>(1, "MINSTR"), None);

        // Canonical output is a fixed point.
        assert_eq!(again.to_string(), text);
    }

    #[test]
    fn rejects_bad_signature() {
        assert!(!TwoDA::from_str_data("3DA V9\n").is_valid());
        assert!(!TwoDA::from_str_data("").is_valid());
    }

    #[test]
    fn static_variant() {
        let sheet = StaticTwoDA::from_string(FEAT_SHEET.to_string());
        assert!(sheet.is_valid());
        assert_eq!(sheet.rows(), 3);
        assert_eq!(sheet.get_str(2, "LABEL"), Some("ArmProfMed"));
        assert_eq!(sheet.get::<i32>(0, "FEAT"), Some(289));
        assert_eq!(sheet.get_str(0, "MINSTR"), None);
        assert!(!StaticTwoDA::from_string("nope".into()).is_valid());
    }
}
