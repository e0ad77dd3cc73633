//! Encoder mirroring [`BufferReader`](crate::reader::BufferReader).

use rust_decimal::Decimal;

use crate::reader::COIN_SCALE;

#[derive(Debug, Default)]
pub struct BufferWriter {
    buf: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_compact_size(&mut self, n: u64) {
        match n {
            0..=0xfc => self.write_u8(n as u8),
            0xfd..=0xffff => {
                self.write_u8(0xfd);
                self.write_u16(n as u16);
            }
            0x1_0000..=0xffff_ffff => {
                self.write_u8(0xfe);
                self.write_u32(n as u32);
            }
            _ => {
                self.write_u8(0xff);
                self.write_u64(n);
            }
        }
    }

    pub fn write_varint(&mut self, v: u32) {
        let mut n = u64::from(v);
        let mut tmp = Vec::with_capacity(5);
        loop {
            let continuation = if tmp.is_empty() { 0x00 } else { 0x80 };
            tmp.push((n & 0x7f) as u8 | continuation);
            if n <= 0x7f {
                break;
            }
            n = (n >> 7) - 1;
        }
        tmp.reverse();
        self.write_bytes(&tmp);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_compact_size(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    /// Hex script with a CompactSize length. Invalid hex encodes as empty.
    pub fn write_script(&mut self, script_hex: &str) {
        let bytes = hex::decode(script_hex).unwrap_or_default();
        self.write_compact_size(bytes.len() as u64);
        self.write_bytes(&bytes);
    }

    /// Hex txid written back in internal (reversed) byte order.
    pub fn write_hash(&mut self, hash_hex: &str) {
        let mut bytes = [0u8; 32];
        if let Ok(decoded) = hex::decode(hash_hex) {
            let n = decoded.len().min(32);
            bytes[..n].copy_from_slice(&decoded[..n]);
        }
        bytes.reverse();
        self.write_bytes(&bytes);
    }

    /// Amount in satoshis. Values outside the `i64` satoshi range saturate.
    pub fn write_amount(&mut self, amount: &Decimal) {
        let mut scaled = amount.round_dp(COIN_SCALE);
        scaled.rescale(COIN_SCALE);
        let sats = i64::try_from(scaled.mantissa()).unwrap_or(if scaled.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        self.write_i64(sats);
    }

    pub fn write_vec<T>(&mut self, items: &[T], mut item: impl FnMut(&mut Self, &T)) {
        self.write_compact_size(items.len() as u64);
        for value in items {
            item(self, value);
        }
    }
}
