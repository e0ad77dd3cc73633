//! Typed payloads, one module per operation family.

pub mod account;
pub mod loan;
pub mod masternode;
pub mod oracle;
pub mod pool;
pub mod token;
pub mod vault;

pub use account::{
    AccountToAccount, AccountToUtxos, AnyAccountsToAccounts, SetGovernance, UtxosToAccount,
};
pub use loan::{
    DestroyLoanScheme, SetCollateralToken, SetDefaultLoanScheme, SetLoanScheme, SetLoanToken,
    UpdateLoanToken, ACTIVATE_NOW,
};
pub use masternode::{CreateMasternode, ResignMasternode};
pub use oracle::{AppointOracle, RemoveOracle, SetOracleData, UpdateOracle};
pub use pool::{
    CompositeSwap, CreatePoolPair, PoolAddLiquidity, PoolRemoveLiquidity, PoolSwap, UpdatePoolPair,
};
pub use token::{CreateToken, MintToken, UpdateToken, UpdateTokenAny};
pub use vault::{
    CloseVault, CreateVault, DepositToVault, PaybackLoan, PlaceAuctionBid, TakeLoan,
    UpdateVault, WithdrawFromVault,
};
