//! In-process ledgers implementing [`EventSource`] and [`TargetVault`].
//!
//! `MemoryVault` behaves like a vault whose import skips users that were
//! already migrated, earlier in the same batch or in a previous one, so
//! replaying a batch never double-counts. It backs the
//! CLI's `--dry-run` mode and the pipeline tests.

use crate::abi::IVault;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{EventQuery, EventSource, TargetVault};
use crate::types::*;
use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Scripted event log of one contract.
pub struct MemorySource {
    contract: Address,
    /// (block, event) in emission order
    log: Vec<(u64, MigrationEvent)>,
    head: u64,
    unavailable: bool,
}

impl MemorySource {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            log: Vec::new(),
            head: 0,
            unavailable: false,
        }
    }

    pub fn migration_topic() -> B256 {
        IVault::UserDepositMigrated::SIGNATURE_HASH
    }

    /// Append an event emitted at `block`.
    pub fn push(&mut self, block: u64, event: MigrationEvent) {
        self.head = self.head.max(block);
        self.log.push((block, event.at_block(block)));
    }

    /// Append events one per block, starting after the current head.
    pub fn extend(&mut self, events: impl IntoIterator<Item = MigrationEvent>) {
        for event in events {
            let block = self.head + 1;
            self.push(block, event);
        }
    }

    /// Every query fails as if the endpoint were down.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl EventSource for MemorySource {
    async fn latest_block(&self) -> LedgerResult<u64> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("connection refused".into()));
        }
        Ok(self.head)
    }

    async fn fetch_range(&self, query: &EventQuery) -> LedgerResult<Vec<MigrationEvent>> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("connection refused".into()));
        }
        if query.event_signature != Self::migration_topic() {
            return Err(LedgerError::Rejected {
                reason: format!("unknown event topic {}", query.event_signature),
                code: Some(-32602),
            });
        }
        if query.contract != self.contract {
            return Ok(Vec::new());
        }

        let mut events: Vec<_> = self
            .log
            .iter()
            .filter(|(block, _)| (query.from_block..=query.to_block).contains(block))
            .cloned()
            .collect();
        events.sort_by_key(|(block, _)| *block);
        Ok(events.into_iter().map(|(_, event)| event).collect())
    }
}

/// Scripted behaviour for one import call (1-based call number).
#[derive(Debug, Clone, PartialEq)]
pub enum ImportFault {
    /// Endpoint refuses the transaction
    Reject { reason: String, code: Option<i64> },
    /// Mined but reverted
    Revert,
    /// Sent but never confirmed
    Stall,
}

#[derive(Default)]
struct VaultState {
    deposits: HashMap<Address, UserDeposit>,
    depositors: Vec<Address>,
    total: U256,
    block: u64,
    import_calls: usize,
    /// tx hash -> (confirmation, stalled)
    pending: HashMap<TxHash, (Confirmation, bool)>,
    faults: HashMap<usize, ImportFault>,
}

/// Idempotent in-memory target vault.
#[derive(Default)]
pub struct MemoryVault {
    state: Mutex<VaultState>,
    reads_fail: AtomicBool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a fault for the `call`-th import (1-based).
    pub fn fail_import(&self, call: usize, fault: ImportFault) {
        self.state.lock().faults.insert(call, fault);
    }

    /// Make the aggregate counter reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of times the import mutation was invoked.
    pub fn import_calls(&self) -> usize {
        self.state.lock().import_calls
    }

    pub fn deposit_of(&self, user: &Address) -> Option<UserDeposit> {
        self.state.lock().deposits.get(user).copied()
    }

    pub fn depositors(&self) -> Vec<Address> {
        self.state.lock().depositors.clone()
    }

    fn apply(state: &mut VaultState, columns: &ImportColumns) {
        for i in 0..columns.len() {
            let user = columns.users[i];
            if state.deposits.get(&user).is_some_and(|d| d.migrated) {
                continue;
            }
            state.deposits.insert(
                user,
                UserDeposit {
                    amount: columns.amounts[i],
                    timestamp: columns.timestamps[i],
                    refunded: columns.refunded[i],
                    migrated: true,
                },
            );
            state.depositors.push(user);
            state.total = state.total.saturating_add(columns.amounts[i]);
        }
    }

    fn check_reads(&self) -> LedgerResult<()> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("read timed out".into()));
        }
        Ok(())
    }
}

/// Deterministic hash for the n-th import.
fn import_hash(call: usize) -> TxHash {
    keccak256(format!("memory-import-{}", call))
}

#[async_trait]
impl TargetVault for MemoryVault {
    async fn send_import(&self, columns: &ImportColumns) -> LedgerResult<TxHash> {
        let mut state = self.state.lock();
        state.import_calls += 1;
        let call = state.import_calls;
        let fault = state.faults.get(&call).cloned();

        if let Some(ImportFault::Reject { reason, code }) = &fault {
            return Err(LedgerError::Rejected {
                reason: reason.clone(),
                code: *code,
            });
        }

        if columns.users.contains(&Address::ZERO) {
            return Err(LedgerError::Rejected {
                reason: "execution reverted: invalid user list".into(),
                code: Some(3),
            });
        }

        state.block += 1;
        let tx_hash = import_hash(call);
        let reverted = fault == Some(ImportFault::Revert);
        let stalled = fault == Some(ImportFault::Stall);
        if !reverted && !stalled {
            Self::apply(&mut state, columns);
        }

        let confirmation = Confirmation {
            tx_hash,
            gas_used: 21_000 + 45_000 * columns.len() as u64,
            block: BlockReference {
                number: state.block,
                hash: Some(keccak256(state.block.to_be_bytes())),
            },
            success: !reverted,
        };
        state.pending.insert(tx_hash, (confirmation, stalled));
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> LedgerResult<Confirmation> {
        let entry = self.state.lock().pending.get(&tx_hash).cloned();
        match entry {
            Some((confirmation, false)) => Ok(confirmation),
            Some((_, true)) => std::future::pending().await,
            None => Err(LedgerError::Rejected {
                reason: format!("unknown transaction {}", tx_hash),
                code: None,
            }),
        }
    }

    async fn total_deposits(&self) -> LedgerResult<U256> {
        self.check_reads()?;
        Ok(self.state.lock().total)
    }

    async fn depositor_count(&self) -> LedgerResult<U256> {
        self.check_reads()?;
        Ok(U256::from(self.state.lock().depositors.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(users: &[u8]) -> ImportColumns {
        Batch {
            index: 1,
            events: users
                .iter()
                .map(|u| MigrationEvent::new(Address::repeat_byte(*u), U256::from(100u64), 5))
                .collect(),
        }
        .columns()
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let vault = MemoryVault::new();

        let tx = vault.send_import(&columns(&[1, 2])).await.unwrap();
        assert!(vault.wait_for_confirmation(tx).await.unwrap().success);
        let tx = vault.send_import(&columns(&[2, 3])).await.unwrap();
        vault.wait_for_confirmation(tx).await.unwrap();

        assert_eq!(vault.depositor_count().await.unwrap(), U256::from(3u64));
        assert_eq!(vault.total_deposits().await.unwrap(), U256::from(300u64));
        assert!(vault.deposit_of(&Address::repeat_byte(2)).unwrap().migrated);
        assert_eq!(vault.import_calls(), 2);
    }

    #[tokio::test]
    async fn test_repeat_within_batch_is_skipped() {
        let vault = MemoryVault::new();

        let tx = vault.send_import(&columns(&[1, 2, 1])).await.unwrap();
        assert!(vault.wait_for_confirmation(tx).await.unwrap().success);

        assert_eq!(vault.depositors(), vec![Address::repeat_byte(1), Address::repeat_byte(2)]);
        assert_eq!(vault.total_deposits().await.unwrap(), U256::from(200u64));
    }

    #[tokio::test]
    async fn test_scripted_faults() {
        let vault = MemoryVault::new();
        vault.fail_import(
            1,
            ImportFault::Reject {
                reason: "not owner".into(),
                code: Some(-32000),
            },
        );
        vault.fail_import(2, ImportFault::Revert);

        let err = vault.send_import(&columns(&[1])).await.unwrap_err();
        assert_eq!(err.code().as_deref(), Some("-32000"));

        let tx = vault.send_import(&columns(&[1])).await.unwrap();
        let confirmation = vault.wait_for_confirmation(tx).await.unwrap();
        assert!(!confirmation.success);
        assert_eq!(vault.depositor_count().await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_failed_reads() {
        let vault = MemoryVault::new();
        vault.fail_reads(true);
        assert!(vault.total_deposits().await.is_err());
        vault.fail_reads(false);
        assert_eq!(vault.total_deposits().await.unwrap(), U256::ZERO);
    }
}
