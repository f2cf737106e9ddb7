//! Little-endian byte cursor and writer shared by every binary format reader.
//!
//! All reads are bounds-checked and return `None` on truncation so corrupt
//! files surface as invalid parses rather than panics.

/// Forward-only (but seekable) reader over a byte slice.
#[derive(Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Option<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.take(N)?;
            let mut buf = [0u8; N];
            buf.copy_from_slice(bytes);
            Some(<$ty>::from_le_bytes(buf))
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Moves the cursor to an absolute offset. Fails when out of bounds.
    pub fn seek(&mut self, pos: usize) -> bool {
        if pos <= self.data.len() {
            self.pos = pos;
            true
        } else {
            false
        }
    }

    /// Takes the next `n` bytes, advancing the cursor.
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    pub fn read_i8(&mut self) -> Option<i8> {
        self.read_u8().map(|b| b as i8)
    }

    read_le!(read_u16, u16);
    read_le!(read_i16, i16);
    read_le!(read_u32, u32);
    read_le!(read_i32, i32);
    read_le!(read_u64, u64);
    read_le!(read_i64, i64);
    read_le!(read_f32, f32);
    read_le!(read_f64, f64);

    /// Reads a fixed-size array, e.g. a 16-byte resref or 4-byte magic.
    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }
}

/// Growable little-endian writer, the inverse of [`ByteCursor`].
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

macro_rules! write_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    };
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    write_le!(write_u16, u16);
    write_le!(write_i16, i16);
    write_le!(write_u32, u32);
    write_le!(write_i32, i32);
    write_le!(write_u64, u64);
    write_le!(write_i64, i64);
    write_le!(write_f32, f32);
    write_le!(write_f64, f64);

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrites a previously written u32, used to backpatch header offsets.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_little_endian() {
        let bytes = [0x2A, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_u8(), Some(0x2A));
        assert_eq!(c.read_u16(), Some(1));
        assert_eq!(c.read_i32(), Some(-1));
        assert_eq!(c.pos(), 7);
        assert_eq!(c.read_u8(), None);
    }

    #[test]
    fn cursor_take_rejects_overrun() {
        let bytes = [1u8, 2, 3];
        let mut c = ByteCursor::new(&bytes);
        assert!(c.take(4).is_none());
        assert_eq!(c.take(3), Some(&bytes[..]));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn cursor_seek_bounds() {
        let bytes = [0u8; 4];
        let mut c = ByteCursor::new(&bytes);
        assert!(c.seek(4));
        assert!(!c.seek(5));
        assert_eq!(c.pos(), 4);
    }

    #[test]
    fn writer_round_trips_through_cursor() {
        let mut w = ByteWriter::new();
        w.write_u32(0xDEAD_BEEF);
        w.write_f32(1.5);
        w.write_i64(-9);
        let buf = w.into_vec();

        let mut c = ByteCursor::new(&buf);
        assert_eq!(c.read_u32(), Some(0xDEAD_BEEF));
        assert_eq!(c.read_f32(), Some(1.5));
        assert_eq!(c.read_i64(), Some(-9));
    }

    #[test]
    fn writer_patch_u32() {
        let mut w = ByteWriter::new();
        w.write_u32(0);
        w.write_u8(7);
        w.patch_u32(0, 42);
        let mut c = ByteCursor::new(w.as_slice());
        assert_eq!(c.read_u32(), Some(42));
    }
}
