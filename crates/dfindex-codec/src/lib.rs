//! dfindex-codec: decoder and encoder for DfTx custom transactions.
//!
//! A DfTx lives in an `OP_RETURN` output: the pushed data starts with the
//! magic `DfTx`, then one opcode byte selects the payload layout.
//!
//! ```text
//! decode_script(bytes) ─┬─ Decoded::Unrecognized        (plain output)
//!                       └─ Decoded::Operation(DfTx)     (typed payload or Unmapped)
//! ```

pub mod dftx;
pub mod error;
pub mod ops;
pub mod reader;
pub mod types;
pub mod writer;

pub use dftx::{decode_script, decode_script_hex, opcodes, Decoded, DfTx, DFTX_MAGIC, OP_RETURN};
pub use error::{DecodeError, DecodeResult};
pub use reader::BufferReader;
pub use types::{CurrencyAmount, CurrencyPair, Payload, ScriptBalances, TokenAmount, TokenBalance, TokenPrice};
pub use writer::BufferWriter;
