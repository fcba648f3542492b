//! Binary codec for the transaction wire format
//!
//! Multi-byte integers are little-endian. Variable length sequences ("compact
//! arrays") carry a compact-u16 length prefix: 7 bits per byte, low group
//! first, high bit set on every byte but the last, at most three bytes.
//!
//! Decoding goes through [`ByteReader`], which never hands back a partially
//! decoded value: every read either succeeds completely or returns
//! [`TxnError::MalformedEncoding`].

use crate::error::{Result, TxnError};

/// Largest value a compact-u16 prefix can carry
pub const MAX_COMPACT_LEN: usize = u16::MAX as usize;

/// Maximum number of bytes in a compact-u16 prefix
pub const MAX_ENCODING_LENGTH: usize = 3;

/// Append a compact-u16 length prefix to `out`
pub fn encode_length(out: &mut Vec<u8>, len: u16) {
    let mut rem = len;
    loop {
        let mut elem = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(elem);
            break;
        }
        elem |= 0x80;
        out.push(elem);
    }
}

/// Append a compact-u16 length prefix, rejecting lengths that do not fit
pub fn encode_len_checked(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u16::try_from(len).map_err(|_| {
        TxnError::malformed(format!(
            "length {} exceeds compact-u16 maximum {}",
            len, MAX_COMPACT_LEN
        ))
    })?;
    encode_length(out, len);
    Ok(())
}

/// Decode a compact-u16 prefix from the front of `bytes`
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let mut value: usize = 0;
    for i in 0..MAX_ENCODING_LENGTH {
        let byte = *bytes
            .get(i)
            .ok_or_else(|| TxnError::malformed("truncated compact-u16 length"))?;
        value |= ((byte & 0x7f) as usize) << (i * 7);
        if byte & 0x80 == 0 {
            // a zero group after the first byte is an alias of a shorter encoding
            if i > 0 && byte == 0 {
                return Err(TxnError::malformed("non-canonical compact-u16 length"));
            }
            if value > MAX_COMPACT_LEN {
                return Err(TxnError::malformed("compact-u16 length overflow"));
            }
            return Ok((value, i + 1));
        }
    }
    Err(TxnError::malformed("compact-u16 length longer than 3 bytes"))
}

/// Append a compact array of raw bytes
pub fn write_compact_bytes(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    encode_len_checked(out, data.len())?;
    out.extend_from_slice(data);
    Ok(())
}

/// Append a compact array, encoding each element with `write`
pub fn write_compact_array<T, F>(out: &mut Vec<u8>, items: &[T], mut write: F) -> Result<()>
where
    F: FnMut(&mut Vec<u8>, &T) -> Result<()>,
{
    encode_len_checked(out, items.len())?;
    for item in items {
        write(out, item)?;
    }
    Ok(())
}

/// Forward-only cursor over an encoded buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of bytes left to read
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Bytes not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(TxnError::malformed(format!(
                "expected {} bytes at offset {}, only {} remaining",
                len,
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a compact-u16 length prefix
    pub fn read_compact_len(&mut self) -> Result<usize> {
        let (len, consumed) = decode_length(self.rest())?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read a compact-u16 prefixed byte string
    pub fn read_compact_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_compact_len()?;
        self.read_bytes(len)
    }

    /// Read a compact array whose elements occupy at least `min_elem_size` bytes
    ///
    /// The declared count is checked against the remaining buffer before
    /// anything is allocated.
    pub fn read_compact_array<T, F>(&mut self, min_elem_size: usize, mut read: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_compact_len()?;
        let needed = count.saturating_mul(min_elem_size);
        if needed > self.remaining() {
            return Err(TxnError::malformed(format!(
                "compact array declares {} elements ({} bytes) but only {} bytes remain",
                count,
                needed,
                self.remaining()
            )));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// Consume the reader, rejecting any trailing bytes
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(TxnError::malformed(format!(
                "trailing bytes: expected {} bytes, found {}",
                self.offset,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}
