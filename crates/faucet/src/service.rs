//! Faucet service core logic

use crate::encoding::AccountId;
use crate::error::{FaucetError, FaucetResult, NodeError};
use crate::graylist::{Admission, Clock, Graylist};
use crate::metrics;
use crate::notify::Notifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Outbound side of a top-up: whatever can move funds and read balances.
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Send `amount` aettos from the faucet account to `recipient`.
    async fn spend(&self, amount: u128, recipient: &AccountId, memo: &str) -> Result<SpendReceipt, NodeError>;

    /// Current balance of `account` in aettos.
    async fn balance(&self, account: &AccountId) -> Result<u128, NodeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendReceipt {
    pub tx_hash: String,
}

/// Successful top-up as returned to the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpResult {
    pub tx_hash: String,
    pub balance: u128,
}

/// Fixed parameters of every top-up
#[derive(Debug, Clone)]
pub struct TopUpSettings {
    /// Amount in aettos
    pub amount: u128,
    /// Amount as shown to users, e.g. `5 AE`
    pub display_amount: String,
    pub memo: String,
    /// Node host, used in notifications
    pub node_host: String,
}

/// Faucet service
pub struct FaucetService {
    settings: TopUpSettings,
    graylist: Arc<Graylist>,
    transfer: Arc<dyn TransferService>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl FaucetService {
    pub fn new(
        settings: TopUpSettings,
        graylist: Arc<Graylist>,
        transfer: Arc<dyn TransferService>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            graylist,
            transfer,
            notifier,
            clock,
        }
    }

    pub fn settings(&self) -> &TopUpSettings {
        &self.settings
    }

    pub fn graylist(&self) -> &Arc<Graylist> {
        &self.graylist
    }

    /// Top up `address`, recording the outcome in logs, metrics and notifications.
    pub async fn top_up(&self, address: &str) -> FaucetResult<TopUpResult> {
        info!("Top up request for {}", address);

        let outcome = self.dispense(address).await;
        self.report(address, &outcome);
        outcome
    }

    /// validate → check and admit → transfer → balance
    async fn dispense(&self, address: &str) -> FaucetResult<TopUpResult> {
        let recipient: AccountId = address.parse().map_err(|reason| FaucetError::InvalidAddress {
            address: address.to_string(),
            reason,
        })?;

        // The address is graylisted before the transfer starts, so a slow
        // transfer still blocks concurrent retries. Failures do not roll it back.
        let now = self.clock.now();
        if let Admission::Graylisted { remaining, .. } = self.graylist.try_admit(address, now) {
            return Err(FaucetError::Graylisted {
                address: address.to_string(),
                remaining,
            });
        }

        let started = Instant::now();
        let receipt = self
            .transfer
            .spend(self.settings.amount, &recipient, &self.settings.memo)
            .await?;
        metrics::TRANSFER_DURATION.observe(started.elapsed().as_secs_f64());
        info!(
            "Top up address {} with {} tx_hash: {} completed.",
            address, self.settings.display_amount, receipt.tx_hash
        );
        debug!("Spend receipt: {:?}", receipt);

        let balance = self.transfer.balance(&recipient).await?;

        Ok(TopUpResult {
            tx_hash: receipt.tx_hash,
            balance,
        })
    }

    fn report(&self, address: &str, outcome: &FaucetResult<TopUpResult>) {
        let message = match outcome {
            Ok(result) => {
                metrics::TOPUP_TOTAL.with_label_values(&["granted"]).inc();
                format!(
                    "Account `{}` credited with {} tokens on `{}`. (tx hash: `{}`)",
                    address, self.settings.display_amount, self.settings.node_host, result.tx_hash
                )
            }
            Err(err @ FaucetError::InvalidAddress { .. }) => {
                metrics::TOPUP_TOTAL.with_label_values(&["invalid"]).inc();
                error!("{}", err);
                err.to_string()
            }
            Err(err @ FaucetError::Graylisted { .. }) => {
                metrics::TOPUP_TOTAL.with_label_values(&["graylisted"]).inc();
                warn!("{}", err);
                err.to_string()
            }
            Err(err) => {
                metrics::TOPUP_TOTAL.with_label_values(&["failed"]).inc();
                error!(
                    "Generic error: top up account {} of {} on {} failed with error: {:?}",
                    address, self.settings.display_amount, self.settings.node_host, err
                );
                format!(
                    "API error: top up account {} of {} on {} failed with error {}",
                    address, self.settings.display_amount, self.settings.node_host, err
                )
            }
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&message).await {
                warn!("Error delivering notification: {}", e);
            }
        });
    }
}
