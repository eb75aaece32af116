//! Bounds-checked little-endian reader over an immutable byte buffer
//!
//! This is the only place that indexes into the raw file. It knows nothing
//! about the MDL layout; every read either succeeds completely or returns
//! [`MdlError::OutOfBounds`] without moving the cursor.

use glam::Vec3;

use crate::error::{MdlError, Result};

/// Read position over a borrowed buffer.
///
/// One cursor is owned by one parse call. Nested reads that jump elsewhere in
/// the file go through [`ByteCursor::scoped`], which restores the position on
/// every exit path.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whole underlying buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to `offset`, which must lie in `[0, len)`.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset >= self.data.len() {
            return Err(MdlError::InvalidOffset {
                field: "seek",
                offset: offset as i64,
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Run `f`, then put the position back where it was, whatever `f` returned.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.pos;
        let out = f(self);
        self.pos = saved;
        out
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(MdlError::OutOfBounds {
                offset: self.pos,
                len,
                buffer_len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Three consecutive `f32`s
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let bytes: [u8; 12] = self.take_array()?;
        let mut v = [0.0f32; 3];
        for (out, chunk) in v.iter_mut().zip(bytes.chunks_exact(4)) {
            *out = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Vec3::from_array(v))
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Read `len` bytes and decode them as text up to the first NUL.
    ///
    /// Bytes after the terminator are consumed but ignored. Invalid UTF-8
    /// is replaced rather than rejected.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        Ok(fixed_str(bytes))
    }
}

/// Text up to the first NUL byte (or the whole slice).
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Convert a file-declared offset into a buffer index, rejecting negatives.
pub(crate) fn to_offset(field: &'static str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| MdlError::InvalidOffset {
        field,
        offset: value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [
            0x78, 0x56, 0x34, 0x12, // i32
            0xFE, 0xFF, // i16 -2
            0x34, 0x12, // u16
            0x7F, // u8
            0x00, 0x00, 0x80, 0x3F, // f32 1.0
        ];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_i32().unwrap(), 0x1234_5678);
        assert_eq!(c.read_i16().unwrap(), -2);
        assert_eq!(c.read_u16().unwrap(), 0x1234);
        assert_eq!(c.read_u8().unwrap(), 0x7F);
        assert_eq!(c.read_f32().unwrap(), 1.0);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_read_up_to_boundary_succeeds() {
        let data = [0u8; 8];
        let mut c = ByteCursor::new(&data);
        c.seek(4).unwrap();
        assert!(c.read_u32().is_ok());
        assert_eq!(c.position(), 8);
    }

    #[test]
    fn test_read_past_boundary_fails() {
        let data = [0u8; 8];
        for k in [1usize, 2, 4] {
            let mut c = ByteCursor::new(&data);
            c.read_bytes(8 - k + 1).unwrap();
            let result = match k {
                1 => c.read_u8().map(|_| ()),
                2 => c.read_u16().map(|_| ()),
                _ => c.read_i32().map(|_| ()),
            };
            assert!(
                matches!(result, Err(MdlError::OutOfBounds { buffer_len: 8, .. })),
                "k = {k}"
            );
        }
    }

    #[test]
    fn test_failed_read_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut c = ByteCursor::new(&data);
        c.seek(1).unwrap();
        let err = c.read_i32().unwrap_err();
        assert_eq!(
            err,
            MdlError::OutOfBounds {
                offset: 1,
                len: 4,
                buffer_len: 3
            }
        );
        assert_eq!(c.position(), 1);
        assert_eq!(c.read_u16().unwrap(), 0x0302);
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 4];
        let mut c = ByteCursor::new(&data);
        assert!(c.seek(0).is_ok());
        assert!(c.seek(3).is_ok());
        assert!(matches!(
            c.seek(4),
            Err(MdlError::InvalidOffset { offset: 4, .. })
        ));
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn test_fixed_string() {
        let mut data = b"bone01\0garbage".to_vec();
        data.extend_from_slice(b"next");
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_fixed_string(14).unwrap(), "bone01");
        assert_eq!(c.read_fixed_string(4).unwrap(), "next");
        assert_eq!(fixed_str(b""), "");
        assert_eq!(fixed_str(b"\0abc"), "");
    }

    #[test]
    fn test_vec3_and_bytes() {
        let mut data = Vec::new();
        for v in [1.5f32, -2.0, 0.25] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[9, 8, 7]);
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_vec3().unwrap(), Vec3::new(1.5, -2.0, 0.25));
        assert_eq!(c.read_bytes(3).unwrap(), &[9, 8, 7]);
        assert!(c.read_bytes(1).is_err());
    }

    #[test]
    fn test_scoped_restores_position_on_error() {
        let data = [0u8; 16];
        let mut c = ByteCursor::new(&data);
        c.seek(2).unwrap();
        let result = c.scoped(|inner| -> Result<u32> {
            inner.seek(14)?;
            inner.read_u32()
        });
        assert!(result.is_err());
        assert_eq!(c.position(), 2);

        let ok = c.scoped(|inner| {
            inner.seek(8)?;
            inner.read_u32()
        });
        assert_eq!(ok, Ok(0));
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_to_offset() {
        assert_eq!(to_offset("bone", 12).unwrap(), 12);
        assert!(matches!(
            to_offset("bone", -1),
            Err(MdlError::InvalidOffset {
                field: "bone",
                offset: -1
            })
        ));
    }
}
