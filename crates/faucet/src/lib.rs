//! Token faucet for the æternity testnet
//!
//! A single endpoint tops up an account with a fixed amount from one
//! custodial key. Addresses that were served recently are graylisted for a
//! cooldown window so they cannot drain the faucet:
//! - Address validation (`ak_` base58check)
//! - In-memory graylist with TTL and bounded size
//! - Spend transactions built, signed and posted to a node over HTTP
//! - Landing page, metrics and optional Telegram notifications

pub mod account;
pub mod api;
pub mod config;
pub mod encoding;
pub mod error;
pub mod graylist;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod notify;
pub mod service;

pub use account::FaucetAccount;
pub use config::{FaucetConfig, GraylistConfig};
pub use encoding::AccountId;
pub use error::{FaucetError, FaucetResult, NodeError};
pub use graylist::{Admission, Clock, Graylist, ManualClock, SystemClock};
pub use node::AeternityNode;
pub use service::{FaucetService, SpendReceipt, TopUpResult, TopUpSettings, TransferService};
