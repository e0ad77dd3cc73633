//! Chain network selection and per-network constants.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Devnet,
    Regtest,
}

impl Network {
    pub const ALL: [Network; 4] = [Self::Mainnet, Self::Testnet, Self::Devnet, Self::Regtest];

    /// Blocks between two active-price evaluations.
    pub fn price_interval(&self) -> u32 {
        match self {
            Self::Regtest => 6,
            Self::Mainnet | Self::Testnet | Self::Devnet => 120,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Regtest => "regtest",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "regtest" => Ok(Self::Regtest),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_intervals() {
        assert_eq!(Network::Regtest.price_interval(), 6);
        assert_eq!(Network::Mainnet.price_interval(), 120);
        assert_eq!(Network::Testnet.price_interval(), 120);
    }

    #[test]
    fn parses_names() {
        assert_eq!("RegTest".parse::<Network>().unwrap(), Network::Regtest);
        assert!("moon".parse::<Network>().is_err());
    }
}
