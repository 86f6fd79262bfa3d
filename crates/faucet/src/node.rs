//! HTTP client for an æternity node.

use crate::account::FaucetAccount;
use crate::encoding::{self, AccountId, SpendTx};
use crate::error::NodeError;
use crate::service::{SpendReceipt, TransferService};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct StatusResponse {
    network_id: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balance: u128,
}

#[derive(Debug, Deserialize)]
struct NextNonceResponse {
    next_nonce: u64,
}

#[derive(Debug, Deserialize)]
struct PostTxResponse {
    tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    reason: String,
}

/// Sends spend transactions from the faucet account through a node.
pub struct AeternityNode {
    base_url: String,
    client: reqwest::Client,
    account: FaucetAccount,
    ttl: u64,
    network_id: OnceCell<String>,
    /// Serialises nonce lookup and submission so concurrent spends get distinct nonces.
    submit_lock: Mutex<()>,
}

impl AeternityNode {
    pub fn new(base_url: &str, account: FaucetAccount, ttl: u64, timeout: Duration) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            account,
            ttl,
            network_id: OnceCell::new(),
            submit_lock: Mutex::new(()),
        })
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id()
    }

    pub async fn network_id(&self) -> Result<&str, NodeError> {
        let id = self
            .network_id
            .get_or_try_init(|| async {
                let status: StatusResponse = self.get("/v3/status").await?;
                info!("Connected to node network: {}", status.network_id);
                Ok::<_, NodeError>(status.network_id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn next_nonce(&self) -> Result<u64, NodeError> {
        let path = format!("/v3/accounts/{}/next-nonce?strategy=max", self.account.id());
        let response: NextNonceResponse = self.get(&path).await?;
        Ok(response.next_nonce)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NodeError> {
        let response = self.client.get(format!("{}{}", self.base_url, path)).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, NodeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(NodeError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| NodeError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TransferService for AeternityNode {
    async fn spend(&self, amount: u128, recipient: &AccountId, memo: &str) -> Result<SpendReceipt, NodeError> {
        let network_id = self.network_id().await?.to_string();

        let _guard = self.submit_lock.lock().await;
        let nonce = self.next_nonce().await?;

        let tx = SpendTx {
            sender: self.account.id(),
            recipient: *recipient,
            amount,
            fee: 0,
            ttl: self.ttl,
            nonce,
            payload: memo.as_bytes().to_vec(),
        }
        .with_min_fee();
        let tx_bytes = tx.rlp_bytes();

        let signature = self.account.sign(&encoding::signing_payload(&network_id, &tx_bytes));
        let signed = encoding::signed_tx_bytes(&signature, &tx_bytes);
        let local_hash = encoding::tx_hash(&signed);
        debug!("Posting spend tx {} (nonce {}, fee {})", local_hash, nonce, tx.fee);

        let response = self
            .client
            .post(format!("{}/v3/transactions", self.base_url))
            .json(&serde_json::json!({ "tx": encoding::encode_tx(&signed) }))
            .send()
            .await?;
        let posted: PostTxResponse = Self::decode(response).await?;

        Ok(SpendReceipt {
            tx_hash: posted.tx_hash.unwrap_or(local_hash),
        })
    }

    async fn balance(&self, account: &AccountId) -> Result<u128, NodeError> {
        let response = self
            .client
            .get(format!("{}/v3/accounts/{}", self.base_url, account))
            .send()
            .await?;
        // accounts the chain has never seen are reported as missing
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let account: AccountResponse = Self::decode(response).await?;
        Ok(account.balance)
    }
}
