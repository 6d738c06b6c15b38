//! Seams between the migration pipeline and the ledgers it talks to.
//!
//! `client::VaultClient` implements both traits against a JSON-RPC endpoint;
//! `memory` provides in-process implementations used for dry runs and tests.

use crate::error::LedgerError;
use crate::types::{Confirmation, ImportColumns, MigrationEvent};
use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;

/// Resolved log query over an inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    pub contract: Address,
    pub event_signature: B256,
    pub from_block: u64,
    pub to_block: u64,
}

/// Read-only access to a ledger's historical event log.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Current head block number.
    async fn latest_block(&self) -> Result<u64, LedgerError>;

    /// Decoded migration events in `query`'s range, in emission order.
    /// Logs that do not decode as migration events are skipped.
    async fn fetch_range(&self, query: &EventQuery) -> Result<Vec<MigrationEvent>, LedgerError>;
}

/// Target vault: the batch import mutation plus the aggregate counters used for reconciliation.
#[async_trait]
pub trait TargetVault: Send + Sync {
    /// Send one `importUserDepositsBatch` transaction and return its hash without waiting.
    async fn send_import(&self, columns: &ImportColumns) -> Result<TxHash, LedgerError>;

    /// Block until the transaction is recorded. A mined-but-reverted
    /// transaction is returned with `success == false`.
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, LedgerError>;

    async fn total_deposits(&self) -> Result<U256, LedgerError>;

    async fn depositor_count(&self) -> Result<U256, LedgerError>;
}
