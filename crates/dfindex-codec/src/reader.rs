//! Cursor over a DfTx payload.
//!
//! All integers are little-endian. Counts and byte-string lengths use
//! Bitcoin's CompactSize; token ids use Bitcoin's `VARINT` (MSB base-128
//! with the "+1 per continuation" offset).

use rust_decimal::Decimal;

use crate::error::{DecodeError, DecodeResult};

/// Satoshis per coin; amounts are fixed at 8 decimal places.
pub const COIN_SCALE: u32 = 8;

pub struct BufferReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        let offset = self.pos;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidBool { offset, value }),
        }
    }

    pub fn read_compact_size(&mut self) -> DecodeResult<u64> {
        Ok(match self.read_u8()? {
            0xfd => u64::from(self.read_u16()?),
            0xfe => u64::from(self.read_u32()?),
            0xff => self.read_u64()?,
            n => u64::from(n),
        })
    }

    /// Bitcoin `VARINT` as used for token and pool ids.
    pub fn read_varint(&mut self) -> DecodeResult<u32> {
        let offset = self.pos;
        let mut n: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            n = (n << 7) | u64::from(byte & 0x7f);
            if n > u64::from(u32::MAX) {
                return Err(DecodeError::VarIntOverflow { offset });
            }
            if byte & 0x80 == 0 {
                break;
            }
            n += 1;
        }
        u32::try_from(n).map_err(|_| DecodeError::VarIntOverflow { offset })
    }

    /// CompactSize count, bounded by the remaining bytes so a corrupt
    /// length can never trigger a huge allocation.
    pub fn read_len(&mut self) -> DecodeResult<usize> {
        let offset = self.pos;
        let length = self.read_compact_size()?;
        match usize::try_from(length) {
            Ok(len) if len <= self.remaining() => Ok(len),
            _ => Err(DecodeError::InvalidLength { offset, length }),
        }
    }

    /// CompactSize-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let len = self.read_len()?;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    /// CompactSize-prefixed script, rendered as hex.
    pub fn read_script(&mut self) -> DecodeResult<String> {
        let len = self.read_len()?;
        Ok(hex::encode(self.read_bytes(len)?))
    }

    /// 32-byte hash, stored reversed, rendered as hex (txid order).
    pub fn read_hash(&mut self) -> DecodeResult<String> {
        let mut bytes = self.read_array::<32>()?;
        bytes.reverse();
        Ok(hex::encode(bytes))
    }

    /// Signed satoshi amount as an 8-decimal `Decimal`.
    pub fn read_amount(&mut self) -> DecodeResult<Decimal> {
        Ok(Decimal::new(self.read_i64()?, COIN_SCALE))
    }

    /// CompactSize-prefixed vector.
    pub fn read_vec<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let offset = self.pos;
        let count = self.read_compact_size()?;
        // every element takes at least one byte
        if count > self.remaining() as u64 {
            return Err(DecodeError::InvalidLength { offset, length: count });
        }
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(item(self)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_matches_bitcoin_encoding() {
        // 0 -> 00, 127 -> 7f, 128 -> 80 00, 255 -> 80 7f, 16511 -> ff 7f
        let cases: [(&[u8], u32); 5] = [
            (&[0x00], 0),
            (&[0x7f], 127),
            (&[0x80, 0x00], 128),
            (&[0x80, 0x7f], 255),
            (&[0xff, 0x7f], 16511),
        ];
        for (bytes, expected) in cases {
            assert_eq!(BufferReader::new(bytes).read_varint().unwrap(), expected);
        }
    }

    #[test]
    fn compact_size_widths() {
        assert_eq!(BufferReader::new(&[0xfc]).read_compact_size().unwrap(), 0xfc);
        assert_eq!(BufferReader::new(&[0xfd, 0x00, 0x01]).read_compact_size().unwrap(), 256);
        assert_eq!(
            BufferReader::new(&[0xfe, 0x00, 0x00, 0x01, 0x00]).read_compact_size().unwrap(),
            65536
        );
    }

    #[test]
    fn amount_is_eight_decimals() {
        let bytes = 150_000_000i64.to_le_bytes();
        let amount = BufferReader::new(&bytes).read_amount().unwrap();
        assert_eq!(amount.to_string(), "1.50000000");
    }

    #[test]
    fn hash_is_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let hash = BufferReader::new(&bytes).read_hash().unwrap();
        assert!(hash.ends_with("ab"));
        assert!(hash.starts_with("00"));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let err = BufferReader::new(&[0x01, 0x02]).read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedEnd { offset: 0, needed: 4, remaining: 2 }
        );
    }

    #[test]
    fn oversized_length_is_rejected() {
        let err = BufferReader::new(&[0x05, b'a']).read_string().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLength { length: 5, .. }));
    }

    #[test]
    fn bool_rejects_other_bytes() {
        assert!(BufferReader::new(&[0x01]).read_bool().unwrap());
        assert!(matches!(
            BufferReader::new(&[0x02]).read_bool(),
            Err(DecodeError::InvalidBool { value: 2, .. })
        ));
    }
}
