// Little-endian cursor over a byte slice, and the matching writer helpers.

use crate::WfstError;

/// Read cursor; every accessor fails with [`WfstError::Truncated`] instead of
/// panicking when the input runs out.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], WfstError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(WfstError::Truncated {
                expected: self.pos.saturating_add(len),
                actual: self.data.len(),
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WfstError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, WfstError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, WfstError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, WfstError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, WfstError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub(crate) fn f32(&mut self) -> Result<f32, WfstError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Length-prefixed UTF-8 string with an `i32` length.
    pub(crate) fn string_i32(&mut self) -> Result<String, WfstError> {
        let len = self.i32()?;
        let len = usize::try_from(len)
            .map_err(|_| WfstError::Format(format!("negative string length {len}")))?;
        self.utf8(len)
    }

    /// Length-prefixed UTF-8 string with a `u32` length.
    pub(crate) fn string_u32(&mut self) -> Result<String, WfstError> {
        let len = self.u32()? as usize;
        self.utf8(len)
    }

    fn utf8(&mut self, len: usize) -> Result<String, WfstError> {
        let at = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| WfstError::Format(format!("invalid UTF-8 string at offset {at}")))
    }

    /// Skip to the next multiple of `align`.
    pub(crate) fn align(&mut self, align: usize) -> Result<(), WfstError> {
        let pad = padding(self.pos, align);
        self.take(pad).map(|_| ())
    }
}

/// Bytes needed to bring `offset` up to a multiple of `align`.
pub(crate) fn padding(offset: usize, align: usize) -> usize {
    (align - offset % align) % align
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_f32_bits(out: &mut Vec<u8>, bits: u32) {
    out.extend_from_slice(&bits.to_le_bytes());
}

pub(crate) fn put_string_i32(out: &mut Vec<u8>, s: &str) {
    put_i32(out, s.len() as i32);
    out.extend_from_slice(s.as_bytes());
}

pub(crate) fn put_string_u32(out: &mut Vec<u8>, s: &str) {
    put_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

pub(crate) fn pad_to(out: &mut Vec<u8>, align: usize) {
    let pad = padding(out.len(), align);
    out.resize(out.len() + pad, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 0xDEAD_BEEF);
        put_i64(&mut buf, -2);
        put_string_i32(&mut buf, "vector");
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.i64().unwrap(), -2);
        assert_eq!(r.string_i32().unwrap(), "vector");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_input_is_truncated_error() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        let err = r.u32().unwrap_err();
        assert!(matches!(
            err,
            WfstError::Truncated {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn negative_string_length_is_format_error() {
        let mut buf = Vec::new();
        put_i32(&mut buf, -5);
        let err = ByteReader::new(&buf).string_i32().unwrap_err();
        assert!(matches!(err, WfstError::Format(_)));
    }

    #[test]
    fn alignment_padding() {
        assert_eq!(padding(0, 16), 0);
        assert_eq!(padding(5, 16), 11);
        assert_eq!(padding(16, 16), 0);
        let mut buf = vec![0u8; 5];
        pad_to(&mut buf, 16);
        assert_eq!(buf.len(), 16);
    }
}
