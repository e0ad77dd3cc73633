//! Order-preserving key encoding.
//!
//! Every partition and sort key is reduced to bytes whose lexicographic
//! order equals the logical order of the key:
//! - integers are big-endian and fixed width,
//! - strings are raw UTF-8 at the top level,
//! - tuples concatenate their components, terminating strings with `0x00`
//!   so that `("a", "bc")` and `("ab", "c")` never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical partition or sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    U32(u32),
    U64(u64),
    Str(String),
    Tuple(Vec<Key>),
}

impl Key {
    /// Shorthand for a block-height component.
    pub fn height(height: u32) -> Self {
        Self::U32(height)
    }

    /// Encode this key into its order-preserving byte form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out, false);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>, nested: bool) {
        match self {
            Self::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::U64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Str(s) => {
                out.extend_from_slice(s.as_bytes());
                if nested {
                    out.push(0x00);
                }
            }
            Self::Tuple(parts) => {
                for part in parts {
                    part.encode_into(out, true);
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Tuple(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "-")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&String> for Key {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

/// Smallest byte string strictly greater than every string starting with `prefix`.
///
/// Returns `None` when the prefix is empty or consists only of `0xFF` bytes.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_sort_numerically() {
        let mut keys: Vec<Vec<u8>> = [300u32, 2, 1_000_000, 45]
            .iter()
            .map(|h| Key::U32(*h).encode())
            .collect();
        keys.sort();
        let expected: Vec<Vec<u8>> = [2u32, 45, 300, 1_000_000]
            .iter()
            .map(|h| Key::U32(*h).encode())
            .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn tuple_strings_do_not_collide() {
        let a = Key::Tuple(vec!["a".into(), "bc".into()]).encode();
        let b = Key::Tuple(vec!["ab".into(), "c".into()]).encode();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn tuple_height_prefix_bounds_its_members() {
        let lower = Key::Tuple(vec![Key::U32(10)]).encode();
        let upper = Key::Tuple(vec![Key::U32(11)]).encode();
        let member = Key::Tuple(vec![Key::U32(10), "scheme".into()]).encode();
        assert!(lower < member && member < upper);
    }

    #[test]
    fn successor_of_prefix() {
        assert_eq!(prefix_successor(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_successor(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn display_joins_tuple_parts() {
        let key = Key::Tuple(vec!["DFI".into(), "USD".into(), Key::U32(7)]);
        assert_eq!(key.to_string(), "DFI-USD-7");
    }
}
