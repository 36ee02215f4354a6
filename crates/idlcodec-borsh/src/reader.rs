//! Bounds-checked cursor over untrusted input.

use borsh::BorshDeserialize;
use idlcodec_core::CodecError;

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// The next `n` bytes, or `Truncated` without moving.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        let data = self.data;
        let out = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// A `size`-byte Borsh primitive.
    pub fn read<T: BorshDeserialize>(&mut self, size: usize) -> Result<T, CodecError> {
        let at = self.pos;
        let bytes = self.take(size)?;
        T::try_from_slice(bytes).map_err(|e| CodecError::FieldDecode {
            field: String::new(),
            reason: format!("offset {at}: {e}"),
        })
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.read::<u8>(1)
    }

    /// A u32 length prefix.
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read::<u32>(4)?;
        usize::try_from(len).map_err(|_| CodecError::FieldDecode {
            field: String::new(),
            reason: format!("length {len} exceeds address space"),
        })
    }

    /// Reject a count of `count` items of at least `min_each` bytes that
    /// the rest of the input cannot hold.
    pub fn ensure_room(&self, count: usize, min_each: usize) -> Result<(), CodecError> {
        let needed = count.saturating_mul(min_each);
        if needed > self.remaining() {
            return Err(self.truncated(needed));
        }
        Ok(())
    }

    pub fn read_uint(&mut self, bits: u16) -> Result<u128, CodecError> {
        Ok(match bits {
            8 => u128::from(self.read::<u8>(1)?),
            16 => u128::from(self.read::<u16>(2)?),
            32 => u128::from(self.read::<u32>(4)?),
            64 => u128::from(self.read::<u64>(8)?),
            128 => self.read::<u128>(16)?,
            other => return Err(unsupported_width(other)),
        })
    }

    pub fn read_int(&mut self, bits: u16) -> Result<i128, CodecError> {
        Ok(match bits {
            8 => i128::from(self.read::<i8>(1)?),
            16 => i128::from(self.read::<i16>(2)?),
            32 => i128::from(self.read::<i32>(4)?),
            64 => i128::from(self.read::<i64>(8)?),
            128 => self.read::<i128>(16)?,
            other => return Err(unsupported_width(other)),
        })
    }

    fn truncated(&self, needed: usize) -> CodecError {
        CodecError::Truncated {
            field: String::new(),
            offset: self.pos,
            needed,
            available: self.remaining(),
        }
    }
}

fn unsupported_width(bits: u16) -> CodecError {
    CodecError::FieldDecode {
        field: String::new(),
        reason: format!("unsupported integer width {bits}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_bounded() {
        let mut r = Reader::new(&[1, 2, 3], 1);
        assert_eq!(r.take(2).unwrap(), &[2, 3]);
        match r.take(1).unwrap_err() {
            CodecError::Truncated {
                offset,
                needed,
                available,
                ..
            } => {
                assert_eq!((offset, needed, available), (3, 1, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn little_endian_integers() {
        let mut r = Reader::new(&[0x34, 0x12, 0xff, 0xff, 0xff, 0xff], 0);
        assert_eq!(r.read_uint(16).unwrap(), 0x1234);
        assert_eq!(r.read_int(32).unwrap(), -1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn room_check_saturates() {
        let r = Reader::new(&[0; 8], 0);
        assert!(r.ensure_room(2, 4).is_ok());
        assert!(r.ensure_room(usize::MAX, 2).is_err());
    }

    #[test]
    fn borsh_rejects_bad_bool() {
        let mut r = Reader::new(&[2], 0);
        assert!(matches!(
            r.read::<bool>(1),
            Err(CodecError::FieldDecode { .. })
        ));
    }
}
