use crate::error::{LedgerError, SdkError};
use crate::ledger::TargetVault;
use crate::types::{Batch, FailureKind, SubmissionResult};
use crate::validation::is_valid;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Sends batches to the target vault one transaction at a time.
///
/// A submission never retries: the outcome is reported once and the caller
/// decides what to do with failed batches.
pub struct BatchSubmitter {
    target: Arc<dyn TargetVault>,
    confirmation_timeout: Option<Duration>,
}

impl BatchSubmitter {
    pub fn new(target: Arc<dyn TargetVault>) -> Self {
        Self {
            target,
            confirmation_timeout: None,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Import one batch and wait for its confirmation.
    ///
    /// The import is all-or-nothing on chain, so a single invalid member
    /// rejects the batch before anything is sent.
    pub async fn submit(&self, batch: &Batch) -> SubmissionResult {
        if let Some(bad) = batch.events.iter().find(|e| !is_valid(e)) {
            warn!(
                "Batch {} contains invalid member (user={} amount={}), skipping batch",
                batch.index, bad.user, bad.amount
            );
            return SubmissionResult::failed(batch, FailureKind::InvalidMember, "invalid member");
        }

        let columns = batch.columns();
        info!("Sending import for batch {} ({} users)", batch.index, columns.len());

        let tx_hash = match self.target.send_import(&columns).await {
            Ok(hash) => hash,
            Err(e) => {
                let rejected = SdkError::BatchRejected {
                    batch_index: batch.index,
                    reason: e.to_string(),
                    code: e.code(),
                };
                error!("{}", rejected);
                return SubmissionResult::failed(batch, FailureKind::Rejected, rejected.to_string())
                    .with_code(e.code());
            }
        };
        info!("Batch {} sent: {}, waiting for confirmation", batch.index, tx_hash);

        let wait = self.target.wait_for_confirmation(tx_hash);
        let outcome = match self.confirmation_timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let timeout = SdkError::SubmissionTimeout {
                        batch_index: batch.index,
                        waited: limit,
                    };
                    warn!("{} (tx {}), outcome unknown", timeout, tx_hash);
                    return SubmissionResult::failed(batch, FailureKind::Timeout, timeout.to_string())
                        .with_tx_hash(tx_hash);
                }
            },
            None => wait.await,
        };

        match outcome {
            Ok(confirmation) if confirmation.success => {
                info!(
                    "Batch {} confirmed in block {} (gas used {})",
                    batch.index, confirmation.block.number, confirmation.gas_used
                );
                SubmissionResult::confirmed(batch, &confirmation)
            }
            Ok(confirmation) => {
                let reverted = LedgerError::Reverted(tx_hash);
                error!("Batch {} {}", batch.index, reverted);
                let mut result =
                    SubmissionResult::failed(batch, FailureKind::Reverted, reverted.to_string())
                        .with_code(reverted.code())
                        .with_tx_hash(tx_hash);
                result.resource_cost = confirmation.gas_used;
                result.confirmed_at = Some(confirmation.block);
                result
            }
            // sent but never confirmed: the outcome on chain is unknown
            Err(e) => {
                warn!("Batch {} confirmation failed (tx {}), outcome unknown: {}", batch.index, tx_hash, e);
                SubmissionResult::failed(batch, FailureKind::Timeout, e.to_string())
                    .with_code(e.code())
                    .with_tx_hash(tx_hash)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerResult;
    use crate::memory::{ImportFault, MemoryVault};
    use crate::types::{Confirmation, ImportColumns, MigrationEvent};
    use alloy::primitives::{Address, TxHash, U256};

    fn batch(users: &[u8]) -> Batch {
        Batch {
            index: 4,
            events: users
                .iter()
                .map(|u| MigrationEvent::new(Address::repeat_byte(*u), U256::from(50u64), 9))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_confirmed_batch() {
        let vault = Arc::new(MemoryVault::new());
        let submitter = BatchSubmitter::new(vault.clone());

        let input = batch(&[1, 2, 3]);
        let result = submitter.submit(&input).await;

        assert!(result.success);
        assert_eq!(result.batch_index, 4);
        assert!(result.resource_cost > 0);
        assert!(result.confirmed_at.is_some());
        assert_eq!(result.users.len(), 3);
        assert_eq!(vault.depositors().len(), 3);
        // input not consumed or reordered
        assert_eq!(input, batch(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_invalid_member_blocks_whole_batch() {
        let vault = Arc::new(MemoryVault::new());
        let submitter = BatchSubmitter::new(vault.clone());

        let mut input = batch(&[1, 2, 3]);
        input.events[1].amount = U256::ZERO;
        let result = submitter.submit(&input).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::InvalidMember));
        assert_eq!(result.error_detail.as_deref(), Some("invalid member"));
        assert_eq!(vault.import_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_keeps_reason_and_code() {
        let vault = Arc::new(MemoryVault::new());
        vault.fail_import(
            1,
            ImportFault::Reject {
                reason: "OwnableUnauthorizedAccount".into(),
                code: Some(3),
            },
        );
        let submitter = BatchSubmitter::new(vault.clone());
        let result = submitter.submit(&batch(&[7])).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Rejected));
        assert_eq!(result.error_code.as_deref(), Some("3"));
        assert!(result.error_detail.unwrap().contains("OwnableUnauthorizedAccount"));
        assert_eq!(result.users, vec![Address::repeat_byte(7)]);
    }

    #[tokio::test]
    async fn test_revert_reported_with_receipt() {
        let vault = Arc::new(MemoryVault::new());
        vault.fail_import(1, ImportFault::Revert);
        let result = BatchSubmitter::new(vault.clone()).submit(&batch(&[1])).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Reverted));
        assert!(result.tx_hash.is_some());
        assert!(result.confirmed_at.is_some());
        assert!(vault.depositors().is_empty());
    }

    /// Accepts every import but cannot report its receipt
    struct LostReceipts;

    #[async_trait::async_trait]
    impl TargetVault for LostReceipts {
        async fn send_import(&self, _columns: &ImportColumns) -> LedgerResult<TxHash> {
            Ok(TxHash::repeat_byte(9))
        }

        async fn wait_for_confirmation(&self, _tx_hash: TxHash) -> LedgerResult<Confirmation> {
            Err(LedgerError::Unavailable("connection reset".into()))
        }

        async fn total_deposits(&self) -> LedgerResult<U256> {
            Ok(U256::ZERO)
        }

        async fn depositor_count(&self) -> LedgerResult<U256> {
            Ok(U256::ZERO)
        }
    }

    #[tokio::test]
    async fn test_failed_wait_is_not_a_rejection() {
        let result = BatchSubmitter::new(Arc::new(LostReceipts))
            .submit(&batch(&[1, 2]))
            .await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert_eq!(result.tx_hash, Some(TxHash::repeat_byte(9)));
        assert_eq!(result.users.len(), 2);
    }

    #[tokio::test]
    async fn test_confirmation_deadline() {
        let vault = Arc::new(MemoryVault::new());
        vault.fail_import(1, ImportFault::Stall);
        let submitter = BatchSubmitter::new(vault.clone())
            .with_confirmation_timeout(Some(Duration::from_millis(50)));

        let result = submitter.submit(&batch(&[1, 2])).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert!(result.tx_hash.is_some());
        assert_eq!(vault.import_calls(), 1);
    }
}
