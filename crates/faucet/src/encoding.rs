//! æternity identifier encodings and spend transaction serialisation.
//!
//! Accounts travel as `ak_` + base58check of the 32-byte ed25519 public key,
//! signed transactions as `tx_` + base64check and transaction hashes as
//! `th_` + base58check. The checksum is the first four bytes of a double
//! SHA-256 over the payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blake2::{digest::consts::U32, Blake2b, Digest};
use rlp::RlpStream;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ACCOUNT_PREFIX: &str = "ak_";
pub const TX_PREFIX: &str = "tx_";
pub const TX_HASH_PREFIX: &str = "th_";

const ACCOUNT_ID_TAG: u8 = 1;
const SPEND_TX_TAG: u8 = 12;
const SIGNED_TX_TAG: u8 = 11;
const OBJECT_VERSION: u8 = 1;

const BASE_GAS: u128 = 15_000;
const GAS_PER_BYTE: u128 = 20;
pub const MIN_GAS_PRICE: u128 = 1_000_000_000;

/// 1 AE expressed in aettos.
pub const AETTOS_PER_AE: u128 = 1_000_000_000_000_000_000;
const AE_DECIMALS: usize = 18;

type Blake2b256 = Blake2b<U32>;

/// Reasons an `ak_` string is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing `ak_` prefix")]
    MissingPrefix,

    #[error("not valid base58: {0}")]
    Base58(String),

    #[error("checksum mismatch")]
    Checksum,

    #[error("expected a 32-byte public key, got {0} bytes")]
    Length(usize),
}

/// Reasons a human AE amount is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("not a decimal number: {0}")]
    NotANumber(String),

    #[error("more than 18 decimal places")]
    TooPrecise,

    #[error("amount does not fit in 128 bits")]
    Overflow,
}

/// An account public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Serialised id as embedded in transactions: tag byte followed by the key.
    fn id_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(33);
        bytes.push(ACCOUNT_ID_TAG);
        bytes.extend_from_slice(&self.0);
        bytes
    }
}

impl FromStr for AccountId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s.strip_prefix(ACCOUNT_PREFIX).ok_or(AddressError::MissingPrefix)?;
        let payload = base58check_decode(encoded)?;
        let key: [u8; 32] = payload
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::Length(payload.len()))?;
        Ok(AccountId(key))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ACCOUNT_PREFIX, base58check_encode(&self.0))
    }
}

pub fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

pub fn base58check_encode(data: &[u8]) -> String {
    let mut buf = data.to_vec();
    buf.extend_from_slice(&checksum(data));
    bs58::encode(buf).into_string()
}

pub fn base58check_decode(encoded: &str) -> Result<Vec<u8>, AddressError> {
    let mut buf = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;
    if buf.len() < 4 {
        return Err(AddressError::Length(0));
    }
    let sum = buf.split_off(buf.len() - 4);
    if sum != checksum(&buf) {
        return Err(AddressError::Checksum);
    }
    Ok(buf)
}

pub fn base64check_encode(data: &[u8]) -> String {
    let mut buf = data.to_vec();
    buf.extend_from_slice(&checksum(data));
    STANDARD.encode(buf)
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// Minimal big-endian representation. Zero is the single byte `0x00`,
/// matching the node's unsigned integer encoding.
fn int_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Unsigned spend transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendTx {
    pub sender: AccountId,
    pub recipient: AccountId,
    pub amount: u128,
    pub fee: u128,
    pub ttl: u64,
    pub nonce: u64,
    pub payload: Vec<u8>,
}

impl SpendTx {
    pub fn rlp_bytes(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        stream.append(&SPEND_TX_TAG);
        stream.append(&OBJECT_VERSION);
        stream.append(&self.sender.id_bytes());
        stream.append(&self.recipient.id_bytes());
        stream.append(&int_bytes(self.amount));
        stream.append(&int_bytes(self.fee));
        stream.append(&int_bytes(self.ttl as u128));
        stream.append(&int_bytes(self.nonce as u128));
        stream.append(&self.payload);
        stream.out().to_vec()
    }

    /// Minimum fee the node accepts for this transaction at its current size.
    pub fn min_fee(&self) -> u128 {
        let size = self.rlp_bytes().len() as u128;
        (BASE_GAS + GAS_PER_BYTE * size) * MIN_GAS_PRICE
    }

    /// Sets the fee to the minimum. The fee is part of the encoding, so this
    /// repeats until the size settles.
    pub fn with_min_fee(mut self) -> Self {
        loop {
            let fee = self.min_fee();
            if fee == self.fee {
                return self;
            }
            self.fee = fee;
        }
    }
}

/// Bytes covered by the signature: network id followed by the transaction hash.
pub fn signing_payload(network_id: &str, tx: &[u8]) -> Vec<u8> {
    let mut data = network_id.as_bytes().to_vec();
    data.extend_from_slice(&blake2b_256(tx));
    data
}

pub fn signed_tx_bytes(signature: &[u8; 64], tx: &[u8]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(4);
    stream.append(&SIGNED_TX_TAG);
    stream.append(&OBJECT_VERSION);
    stream.begin_list(1).append(&signature.to_vec());
    stream.append(&tx.to_vec());
    stream.out().to_vec()
}

pub fn encode_tx(signed_tx: &[u8]) -> String {
    format!("{}{}", TX_PREFIX, base64check_encode(signed_tx))
}

pub fn tx_hash(signed_tx: &[u8]) -> String {
    format!("{}{}", TX_HASH_PREFIX, base58check_encode(&blake2b_256(signed_tx)))
}

/// Parses a human amount such as `5`, `0.25` or `5AE` into aettos.
pub fn parse_ae(amount: &str) -> Result<u128, AmountError> {
    let trimmed = amount.trim();
    let trimmed = trimmed
        .strip_suffix("AE")
        .or_else(|| trimmed.strip_suffix("ae"))
        .unwrap_or(trimmed)
        .trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return Err(AmountError::NotANumber(amount.to_string()));
    }
    if fraction.len() > AE_DECIMALS {
        return Err(AmountError::TooPrecise);
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = AE_DECIMALS);
        padded.parse().map_err(|_| AmountError::Overflow)?
    };

    whole
        .checked_mul(AETTOS_PER_AE)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Formats aettos as AE without trailing zeros, e.g. `5` or `0.25`.
pub fn format_ae(aettos: u128) -> String {
    let whole = aettos / AETTOS_PER_AE;
    let fraction = aettos % AETTOS_PER_AE;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction, width = AE_DECIMALS);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}
