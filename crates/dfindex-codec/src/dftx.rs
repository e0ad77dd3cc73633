//! The DfTx marker and the opcode → payload table.
//!
//! ```text
//! OP_RETURN <push: "DfTx" opcode payload...>
//! ```
//!
//! The push may use a direct length byte or `PUSHDATA1/2/4`. Bytes left in
//! the push after the payload is decoded are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::ops::*;
use crate::reader::BufferReader;
use crate::types::Payload;
use crate::writer::BufferWriter;

pub const OP_RETURN: u8 = 0x6a;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

/// `DfTx` in ASCII.
pub const DFTX_MAGIC: [u8; 4] = [0x44, 0x66, 0x54, 0x78];

macro_rules! dftx_table {
    ($( $byte:literal => $konst:ident, $variant:ident($payload:ty); )*) => {
        /// Opcode bytes, one per operation.
        pub mod opcodes {
            $( pub const $konst: u8 = $byte; )*
        }

        /// A decoded operation.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "data")]
        pub enum DfTx {
            $( $variant($payload), )*
            /// Valid marker with an opcode outside the table. The raw
            /// payload serializes as hex.
            Unmapped {
                opcode: u8,
                #[serde(with = "hex::serde")]
                data: Vec<u8>,
            },
        }

        impl DfTx {
            pub fn opcode(&self) -> u8 {
                match self {
                    $( Self::$variant(_) => $byte, )*
                    Self::Unmapped { opcode, .. } => *opcode,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => stringify!($variant), )*
                    Self::Unmapped { .. } => "Unmapped",
                }
            }

            fn decode_payload(opcode: u8, r: &mut BufferReader<'_>) -> DecodeResult<Self> {
                Ok(match opcode {
                    $( $byte => Self::$variant(<$payload>::decode(r)?), )*
                    _ => {
                        let rest = r.remaining();
                        Self::Unmapped {
                            opcode,
                            data: r.read_bytes(rest)?.to_vec(),
                        }
                    }
                })
            }

            fn encode_payload(&self, w: &mut BufferWriter) {
                match self {
                    $( Self::$variant(payload) => payload.encode(w), )*
                    Self::Unmapped { data, .. } => w.write_bytes(data),
                }
            }
        }
    };
}

dftx_table! {
    b'T' => CREATE_TOKEN, CreateToken(CreateToken);
    b'N' => UPDATE_TOKEN, UpdateToken(UpdateToken);
    b'n' => UPDATE_TOKEN_ANY, UpdateTokenAny(UpdateTokenAny);
    b'M' => MINT_TOKEN, MintToken(MintToken);
    b'C' => CREATE_MASTERNODE, CreateMasternode(CreateMasternode);
    b'R' => RESIGN_MASTERNODE, ResignMasternode(ResignMasternode);
    b'o' => APPOINT_ORACLE, AppointOracle(AppointOracle);
    b'h' => REMOVE_ORACLE, RemoveOracle(RemoveOracle);
    b't' => UPDATE_ORACLE, UpdateOracle(UpdateOracle);
    b'y' => SET_ORACLE_DATA, SetOracleData(SetOracleData);
    b'p' => CREATE_POOL_PAIR, CreatePoolPair(CreatePoolPair);
    b'u' => UPDATE_POOL_PAIR, UpdatePoolPair(UpdatePoolPair);
    b's' => POOL_SWAP, PoolSwap(PoolSwap);
    b'i' => COMPOSITE_SWAP, CompositeSwap(CompositeSwap);
    b'l' => POOL_ADD_LIQUIDITY, PoolAddLiquidity(PoolAddLiquidity);
    b'r' => POOL_REMOVE_LIQUIDITY, PoolRemoveLiquidity(PoolRemoveLiquidity);
    b'U' => UTXOS_TO_ACCOUNT, UtxosToAccount(UtxosToAccount);
    b'b' => ACCOUNT_TO_UTXOS, AccountToUtxos(AccountToUtxos);
    b'B' => ACCOUNT_TO_ACCOUNT, AccountToAccount(AccountToAccount);
    b'a' => ANY_ACCOUNTS_TO_ACCOUNTS, AnyAccountsToAccounts(AnyAccountsToAccounts);
    b'G' => SET_GOVERNANCE, SetGovernance(SetGovernance);
    b'L' => SET_LOAN_SCHEME, SetLoanScheme(SetLoanScheme);
    b'd' => SET_DEFAULT_LOAN_SCHEME, SetDefaultLoanScheme(SetDefaultLoanScheme);
    b'D' => DESTROY_LOAN_SCHEME, DestroyLoanScheme(DestroyLoanScheme);
    b'c' => SET_COLLATERAL_TOKEN, SetCollateralToken(SetCollateralToken);
    b'g' => SET_LOAN_TOKEN, SetLoanToken(SetLoanToken);
    b'x' => UPDATE_LOAN_TOKEN, UpdateLoanToken(UpdateLoanToken);
    b'V' => CREATE_VAULT, CreateVault(CreateVault);
    b'v' => UPDATE_VAULT, UpdateVault(UpdateVault);
    b'e' => CLOSE_VAULT, CloseVault(CloseVault);
    b'S' => DEPOSIT_TO_VAULT, DepositToVault(DepositToVault);
    b'J' => WITHDRAW_FROM_VAULT, WithdrawFromVault(WithdrawFromVault);
    b'X' => TAKE_LOAN, TakeLoan(TakeLoan);
    b'H' => PAYBACK_LOAN, PaybackLoan(PaybackLoan);
    b'I' => PLACE_AUCTION_BID, PlaceAuctionBid(PlaceAuctionBid);
}

impl DfTx {
    /// Full output script: `OP_RETURN`, a minimal push, magic, opcode, payload.
    pub fn to_script(&self) -> Vec<u8> {
        let mut body = BufferWriter::new();
        body.write_bytes(&DFTX_MAGIC);
        body.write_u8(self.opcode());
        self.encode_payload(&mut body);
        let body = body.into_inner();

        let mut script = BufferWriter::new();
        script.write_u8(OP_RETURN);
        match body.len() {
            len @ 0..=0x4b => script.write_u8(len as u8),
            len @ 0x4c..=0xff => {
                script.write_u8(OP_PUSHDATA1);
                script.write_u8(len as u8);
            }
            len @ 0x100..=0xffff => {
                script.write_u8(OP_PUSHDATA2);
                script.write_u16(len as u16);
            }
            len => {
                script.write_u8(OP_PUSHDATA4);
                script.write_u32(len as u32);
            }
        }
        script.write_bytes(&body);
        script.into_inner()
    }

    pub fn to_script_hex(&self) -> String {
        hex::encode(self.to_script())
    }
}

/// Outcome of inspecting an output script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decoded {
    /// Not a DfTx marker; ignored by every indexer.
    Unrecognized,
    Operation(DfTx),
}

impl Decoded {
    pub fn operation(self) -> Option<DfTx> {
        match self {
            Self::Operation(tx) => Some(tx),
            Self::Unrecognized => None,
        }
    }
}

/// The pushed data of an `OP_RETURN <push>` script, if it is well formed.
fn op_return_push(script: &[u8]) -> Option<&[u8]> {
    let (&first, rest) = script.split_first()?;
    if first != OP_RETURN {
        return None;
    }
    let (&op, rest) = rest.split_first()?;
    let (len, rest) = match op {
        0x01..=0x4b => (op as usize, rest),
        OP_PUSHDATA1 => {
            let (&n, rest) = rest.split_first()?;
            (n as usize, rest)
        }
        OP_PUSHDATA2 => {
            let bytes = rest.get(..2)?;
            (u16::from_le_bytes([bytes[0], bytes[1]]) as usize, &rest[2..])
        }
        OP_PUSHDATA4 => {
            let bytes = rest.get(..4)?;
            let n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (usize::try_from(n).ok()?, &rest[4..])
        }
        _ => return None,
    };
    rest.get(..len)
}

/// Decode an output script.
///
/// Scripts without the marker are `Ok(Decoded::Unrecognized)`. A marker with
/// a known opcode whose payload is malformed is an error.
pub fn decode_script(script: &[u8]) -> DecodeResult<Decoded> {
    let Some(data) = op_return_push(script) else {
        return Ok(Decoded::Unrecognized);
    };
    let Some(body) = data.strip_prefix(&DFTX_MAGIC) else {
        return Ok(Decoded::Unrecognized);
    };
    let Some((&opcode, payload)) = body.split_first() else {
        return Ok(Decoded::Unrecognized);
    };

    let mut reader = BufferReader::new(payload);
    let tx = DfTx::decode_payload(opcode, &mut reader).map_err(|err| {
        DecodeError::InvalidPayload {
            opcode: opcode as char,
            reason: err.to_string(),
        }
    })?;
    if !reader.is_empty() {
        tracing::trace!(
            opcode = %(opcode as char),
            trailing = reader.remaining(),
            "ignoring trailing payload bytes"
        );
    }
    Ok(Decoded::Operation(tx))
}

/// Decode a hex script as found in `scriptPubKey.hex`. Invalid hex is
/// not a marker and therefore `Unrecognized`.
pub fn decode_script_hex(script_hex: &str) -> DecodeResult<Decoded> {
    match hex::decode(script_hex) {
        Ok(bytes) => decode_script(&bytes),
        Err(_) => Ok(Decoded::Unrecognized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyPair;
    use rust_decimal::Decimal;

    fn scheme() -> DfTx {
        DfTx::SetLoanScheme(SetLoanScheme {
            ratio: 150,
            rate: Decimal::new(5, 0),
            identifier: "MIN150".into(),
            update: 110,
        })
    }

    #[test]
    fn non_marker_scripts_are_unrecognized() {
        // P2PKH
        let p2pkh = hex::decode("76a914000000000000000000000000000000000000000088ac").unwrap();
        assert_eq!(decode_script(&p2pkh).unwrap(), Decoded::Unrecognized);
        // OP_RETURN with other data
        assert_eq!(decode_script(&[0x6a, 0x02, 0xbe, 0xef]).unwrap(), Decoded::Unrecognized);
        // bare marker without opcode
        let mut bare = vec![0x6a, 0x04];
        bare.extend_from_slice(&DFTX_MAGIC);
        assert_eq!(decode_script(&bare).unwrap(), Decoded::Unrecognized);
        assert_eq!(decode_script(&[]).unwrap(), Decoded::Unrecognized);
        assert_eq!(decode_script_hex("zz").unwrap(), Decoded::Unrecognized);
    }

    #[test]
    fn decodes_set_loan_scheme() {
        let script = scheme().to_script();
        assert_eq!(script[0], OP_RETURN);
        assert_eq!(&script[2..6], b"DfTx");
        assert_eq!(script[6], b'L');
        assert_eq!(decode_script(&script).unwrap(), Decoded::Operation(scheme()));
    }

    #[test]
    fn unknown_opcode_is_unmapped() {
        let mut script = vec![0x6a, 0x07];
        script.extend_from_slice(&DFTX_MAGIC);
        script.extend_from_slice(&[b'Z', 0x01, 0x02]);
        let decoded = decode_script(&script).unwrap().operation().unwrap();
        assert_eq!(decoded, DfTx::Unmapped { opcode: b'Z', data: vec![0x01, 0x02] });
        assert_eq!(decoded.to_script(), script);
    }

    #[test]
    fn unmapped_payload_is_hex_in_json() {
        let unmapped = DfTx::Unmapped { opcode: b'Z', data: vec![0xab, 0x01] };
        let json = serde_json::to_value(&unmapped).unwrap();
        assert_eq!(json["data"]["data"], "ab01");

        let bad = serde_json::json!({ "type": "Unmapped", "data": { "opcode": 90, "data": "zz" } });
        assert!(serde_json::from_value::<DfTx>(bad).is_err());
    }

    #[test]
    fn malformed_known_payload_is_an_error() {
        let mut script = vec![0x6a, 0x07];
        script.extend_from_slice(&DFTX_MAGIC);
        script.extend_from_slice(&[b'L', 0x96, 0x00]);
        let err = decode_script(&script).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { opcode: 'L', .. }));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let tx = DfTx::DestroyLoanScheme(DestroyLoanScheme {
            identifier: "MIN150".into(),
            height: 0,
        });
        let mut body = tx.to_script()[2..].to_vec();
        body.extend_from_slice(&[0xde, 0xad]);
        let mut script = vec![OP_RETURN, body.len() as u8];
        script.extend_from_slice(&body);
        assert_eq!(decode_script(&script).unwrap(), Decoded::Operation(tx));
    }

    #[test]
    fn long_payloads_use_pushdata() {
        let tx = DfTx::AppointOracle(AppointOracle {
            script: "00".repeat(30),
            weightage: 10,
            price_feeds: (0..5)
                .map(|i| CurrencyPair::new(format!("TOKEN{i}"), "USD"))
                .collect(),
        });
        let script = tx.to_script();
        assert_eq!(script[1], OP_PUSHDATA1);
        assert_eq!(decode_script(&script).unwrap(), Decoded::Operation(tx));
    }

    #[test]
    fn opcode_table_is_consistent() {
        assert_eq!(scheme().opcode(), opcodes::SET_LOAN_SCHEME);
        assert_eq!(scheme().name(), "SetLoanScheme");
    }
}
