//! Bounds-checked reader over a capture buffer

use super::{ByteOrder, CaptureError, Result};

pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

macro_rules! read_scalar {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self, field: &'static str) -> Result<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes: [u8; N] = self.array(field)?;
            Ok(match self.order {
                ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                ByteOrder::Little => <$ty>::from_le_bytes(bytes),
            })
        }
    };
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Move to an absolute section offset
    pub(crate) fn seek(&mut self, offset: i32, section: &'static str) -> Result<()> {
        let target = usize::try_from(offset).ok().filter(|&o| o <= self.buf.len());
        match target {
            Some(target) => {
                self.pos = target;
                Ok(())
            }
            None => Err(CaptureError::BadOffset {
                section,
                offset,
                len: self.buf.len(),
            }),
        }
    }

    pub(crate) fn bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(CaptureError::Truncated {
                field,
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, field)?);
        Ok(out)
    }

    read_scalar!(i16, i16);
    read_scalar!(i32, i32);
    read_scalar!(f32, f32);
    read_scalar!(f64, f64);

    /// i32 that must not be negative (counts and lengths)
    pub(crate) fn count(&mut self, field: &'static str) -> Result<usize> {
        let offset = self.pos;
        let value = self.i32(field)?;
        usize::try_from(value).map_err(|_| CaptureError::NegativeLength {
            field,
            value,
            offset,
        })
    }

    /// Length-prefixed text; trailing NUL padding is dropped
    pub(crate) fn string(&mut self, field: &'static str) -> Result<String> {
        let len = self.count(field)?;
        let raw = self.bytes(len, field)?;
        Ok(text_from(raw))
    }

    /// Fixed-width text field
    pub(crate) fn fixed_string(&mut self, len: usize, field: &'static str) -> Result<String> {
        let raw = self.bytes(len, field)?;
        Ok(text_from(raw))
    }

    pub(crate) fn i32_array<const N: usize>(&mut self, field: &'static str) -> Result<[i32; N]> {
        let mut out = [0i32; N];
        for slot in out.iter_mut() {
            *slot = self.i32(field)?;
        }
        Ok(out)
    }
}

fn text_from(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
