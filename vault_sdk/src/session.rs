use crate::client::VaultClient;
use crate::error::{Result, SdkError};
use crate::types::{Confirmation, VaultSnapshot};
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A connected account on one vault.
///
/// Created on connect and dropped on disconnect; every client operation goes
/// through it instead of shared global handles.
pub struct VaultSession {
    client: VaultClient,
    account: Address,
}

impl VaultSession {
    /// Connect with a signing key; the session account is the key's address.
    pub fn connect(rpc_url: &str, vault: Address, signer: PrivateKeySigner) -> Result<Self> {
        let account = signer.address();
        let client = VaultClient::with_signer(rpc_url, vault, signer)?;
        info!("Session connected: {} on vault {}", account, vault);
        Ok(Self { client, account })
    }

    /// Watch an account without being able to send transactions.
    pub fn observe(rpc_url: &str, vault: Address, account: Address) -> Result<Self> {
        let client = VaultClient::read_only(rpc_url, vault)?;
        Ok(Self { client, account })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn client(&self) -> &VaultClient {
        &self.client
    }

    /// Read aggregate and account state in one round of concurrent calls.
    pub async fn snapshot(&self) -> Result<VaultSnapshot> {
        let (total_deposits, depositor_count, target_price, current_price, user_deposit, withdraw_allowed) =
            tokio::try_join!(
                self.client.total_deposits(),
                self.client.depositor_count(),
                self.client.target_price(),
                self.client.current_price(),
                self.client.user_deposit(self.account),
                self.client.withdraw_allowed(),
            )?;

        Ok(VaultSnapshot {
            account: self.account,
            total_deposits,
            depositor_count,
            target_price,
            current_price,
            user_deposit,
            withdraw_allowed,
        })
    }

    /// Allow the vault to pull `amount` of the deposit token.
    pub async fn approve(&self, amount: U256) -> Result<Confirmation> {
        require_positive(amount)?;
        let token = self.client.token_address().await?;
        let tx_hash = self.client.approve(token, self.client.vault, amount).await?;
        info!("Approve sent: {}", tx_hash);
        self.confirm(tx_hash).await
    }

    pub async fn deposit(&self, amount: U256) -> Result<Confirmation> {
        require_positive(amount)?;
        let tx_hash = self.client.deposit(amount).await?;
        info!("Deposit sent: {}", tx_hash);
        self.confirm(tx_hash).await
    }

    /// Withdraw the account's refund, checking the vault allows it first.
    pub async fn withdraw(&self) -> Result<Confirmation> {
        if !self.client.withdraw_allowed().await? {
            return Err(SdkError::WithdrawDisabled);
        }
        let deposit = self.client.user_deposit(self.account).await?;
        if deposit.amount.is_zero() || deposit.refunded {
            return Err(SdkError::NothingToWithdraw);
        }

        let tx_hash = self.client.withdraw_refund().await?;
        info!("Withdraw sent: {}", tx_hash);
        self.confirm(tx_hash).await
    }

    async fn confirm(&self, tx_hash: alloy::primitives::TxHash) -> Result<Confirmation> {
        let confirmation = self.client.wait_for_receipt(tx_hash).await?;
        if !confirmation.success {
            return Err(crate::error::LedgerError::Reverted(tx_hash).into());
        }
        Ok(confirmation)
    }
}

/// Parse a decimal token amount (18 decimals), rejecting zero.
pub fn parse_token_amount(input: &str) -> Result<U256> {
    let amount = parse_ether(input.trim())
        .map_err(|e| SdkError::InvalidAmount(format!("{}: {}", input, e)))?;
    require_positive(amount)?;
    Ok(amount)
}

fn require_positive(amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Err(SdkError::InvalidAmount("amount must be greater than zero".into()));
    }
    Ok(())
}

/// Refresh the snapshot every `every` until `cancel` fires.
pub fn spawn_refresh<F>(
    session: Arc<VaultSession>,
    every: Duration,
    cancel: CancellationToken,
    on_snapshot: F,
) -> JoinHandle<()>
where
    F: Fn(Result<VaultSnapshot>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Refresh task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = session.snapshot().await;
                    if let Err(e) = &snapshot {
                        warn!("Snapshot refresh failed: {}", e);
                    }
                    on_snapshot(snapshot);
                }
            }
        }
    })
}
