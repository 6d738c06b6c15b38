use crate::abi::{IVault, IERC20};
use crate::error::{LedgerError, LedgerResult, Result, SdkError};
use crate::ledger::{EventQuery, EventSource, TargetVault};
use crate::types::*;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionReceipt};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// JSON-RPC client bound to one vault contract
#[derive(Clone)]
pub struct VaultClient {
    /// Endpoint URL
    pub rpc_url: String,
    /// Vault contract address
    pub vault: Address,
    provider: DynProvider,
    signer: Option<Address>,
    poll_interval: Duration,
}

impl VaultClient {
    /// Create a client that can only read
    pub fn read_only(rpc_url: impl Into<String>, vault: Address) -> Result<Self> {
        let rpc_url = normalize_url(rpc_url.into());
        let provider = ProviderBuilder::new().connect_http(parse_url(&rpc_url)?).erased();

        Ok(Self::from_provider(rpc_url, vault, provider, None))
    }

    /// Create a client that signs transactions with `signer`
    pub fn with_signer(
        rpc_url: impl Into<String>,
        vault: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self> {
        let rpc_url = normalize_url(rpc_url.into());
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parse_url(&rpc_url)?)
            .erased();

        Ok(Self::from_provider(rpc_url, vault, provider, Some(address)))
    }

    /// Wrap an already connected provider
    pub fn from_provider(
        rpc_url: impl Into<String>,
        vault: Address,
        provider: DynProvider,
        signer: Option<Address>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            vault,
            provider,
            signer,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Same endpoint and signer, different contract
    pub fn at(&self, vault: Address) -> Self {
        Self {
            vault,
            ..self.clone()
        }
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    fn contract(&self) -> IVault::IVaultInstance<DynProvider> {
        IVault::new(self.vault, self.provider.clone())
    }

    /// Check the endpoint answers
    pub async fn health_check(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }

    pub async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    pub async fn total_deposits(&self) -> LedgerResult<U256> {
        Ok(self.contract().totalDeposits().call().await?)
    }

    pub async fn depositor_count(&self) -> LedgerResult<U256> {
        Ok(self.contract().getDepositorCount().call().await?)
    }

    pub async fn user_deposit(&self, user: Address) -> LedgerResult<UserDeposit> {
        let record = self.contract().getUserDeposit(user).call().await?;

        Ok(UserDeposit {
            amount: record.amount,
            timestamp: record.timestamp,
            refunded: record.refunded,
            migrated: record.migrated,
        })
    }

    pub async fn withdraw_allowed(&self) -> LedgerResult<bool> {
        Ok(self.contract().withdrawAllowed().call().await?)
    }

    pub async fn current_price(&self) -> LedgerResult<U256> {
        Ok(self.contract().getCurrentPrice().call().await?)
    }

    pub async fn target_price(&self) -> LedgerResult<U256> {
        Ok(self.contract().TARGET_PRICE().call().await?)
    }

    /// Address of the deposit token
    pub async fn token_address(&self) -> LedgerResult<Address> {
        Ok(self.contract().TOKEN().call().await?)
    }

    /// Submit `deposit(amount)`; returns once the node accepted the transaction
    pub async fn deposit(&self, amount: U256) -> Result<TxHash> {
        self.require_signer()?;
        let pending = self
            .contract()
            .deposit(amount)
            .send()
            .await
            .map_err(LedgerError::from)?;
        Ok(*pending.tx_hash())
    }

    /// Submit `withdrawRefund()`
    pub async fn withdraw_refund(&self) -> Result<TxHash> {
        self.require_signer()?;
        let pending = self
            .contract()
            .withdrawRefund()
            .send()
            .await
            .map_err(LedgerError::from)?;
        Ok(*pending.tx_hash())
    }

    /// Submit ERC-20 `approve(spender, amount)` on `token`
    pub async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        self.require_signer()?;
        let erc20 = IERC20::new(token, self.provider.clone());
        let pending = erc20
            .approve(spender, amount)
            .send()
            .await
            .map_err(LedgerError::from)?;
        Ok(*pending.tx_hash())
    }

    /// Poll for the receipt of `tx_hash` until it is available.
    ///
    /// The transaction is already sent, so a failed poll is logged and retried
    /// on the next tick. Callers bound the wait with their own deadline.
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> LedgerResult<Confirmation> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(confirmation_from(&receipt)),
                Ok(None) => debug!("Receipt for {} not available yet", tx_hash),
                Err(e) => warn!("Receipt poll for {} failed, retrying: {}", tx_hash, e),
            }
        }
    }

    fn require_signer(&self) -> Result<Address> {
        self.signer.ok_or(SdkError::InvalidSigningKey)
    }
}

#[async_trait]
impl EventSource for VaultClient {
    async fn latest_block(&self) -> LedgerResult<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn fetch_range(&self, query: &EventQuery) -> LedgerResult<Vec<MigrationEvent>> {
        let filter = Filter::new()
            .address(query.contract)
            .event_signature(query.event_signature)
            .from_block(query.from_block)
            .to_block(query.to_block);

        let mut logs = self.provider.get_logs(&filter).await?;
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let block_number = log.block_number;
            let tx_hash = log.transaction_hash;

            let decoded = match log.log_decode::<IVault::UserDepositMigrated>() {
                Ok(decoded) => decoded.inner.data,
                Err(e) => {
                    warn!("Skipping undecodable log in tx {:?}: {}", tx_hash, e);
                    continue;
                }
            };

            let Ok(timestamp) = u64::try_from(decoded.timestamp) else {
                warn!(
                    "Skipping event for {} in tx {:?}: timestamp {} out of range",
                    decoded.user, tx_hash, decoded.timestamp
                );
                continue;
            };

            events.push(MigrationEvent {
                user: decoded.user,
                amount: decoded.amount,
                timestamp,
                block_number,
            });
        }

        Ok(events)
    }
}

#[async_trait]
impl TargetVault for VaultClient {
    async fn send_import(&self, columns: &ImportColumns) -> LedgerResult<TxHash> {
        let pending = self
            .contract()
            .importUserDepositsBatch(
                columns.users.clone(),
                columns.amounts.clone(),
                columns.timestamps.clone(),
                columns.refunded.clone(),
            )
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> LedgerResult<Confirmation> {
        self.wait_for_receipt(tx_hash).await
    }

    async fn total_deposits(&self) -> LedgerResult<U256> {
        VaultClient::total_deposits(self).await
    }

    async fn depositor_count(&self) -> LedgerResult<U256> {
        VaultClient::depositor_count(self).await
    }
}

fn confirmation_from(receipt: &TransactionReceipt) -> Confirmation {
    Confirmation {
        tx_hash: receipt.transaction_hash,
        gas_used: receipt.gas_used,
        block: BlockReference {
            number: receipt.block_number.unwrap_or_default(),
            hash: receipt.block_hash,
        },
        success: receipt.status(),
    }
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_url(url: &str) -> Result<Url> {
    url.parse()
        .map_err(|e| SdkError::InvalidConfig(format!("invalid RPC URL {}: {}", url, e)))
}
