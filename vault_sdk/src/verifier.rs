use crate::error::{Result, SdkError};
use crate::ledger::TargetVault;
use crate::types::{ReconciliationFinding, VerificationOutcome};
use alloy::primitives::U256;
use log::{info, warn};

/// Read the target's aggregate counters and grade them against the number of
/// users the run expected to import. Only a failed read is an error.
pub async fn verify(target: &dyn TargetVault, expected_user_count: u64) -> Result<VerificationOutcome> {
    let total_deposits = target
        .total_deposits()
        .await
        .map_err(|e| SdkError::VerificationRead(e.to_string()))?;
    let depositor_count = target
        .depositor_count()
        .await
        .map_err(|e| SdkError::VerificationRead(e.to_string()))?;

    let finding = classify(depositor_count, expected_user_count);
    match finding {
        ReconciliationFinding::Complete => info!(
            "Verification passed: {} depositors, total deposits {}",
            depositor_count, total_deposits
        ),
        ReconciliationFinding::Partial => warn!(
            "Verification partial: {} depositors on target, expected {}",
            depositor_count, expected_user_count
        ),
        ReconciliationFinding::NoDepositors => {
            warn!("Verification: target has no depositors, migration may not have succeeded")
        }
    }

    Ok(VerificationOutcome {
        total_deposits,
        depositor_count,
        expected_user_count,
        finding,
    })
}

pub fn classify(depositor_count: U256, expected_user_count: u64) -> ReconciliationFinding {
    if depositor_count.is_zero() {
        ReconciliationFinding::NoDepositors
    } else if depositor_count == U256::from(expected_user_count) {
        ReconciliationFinding::Complete
    } else {
        ReconciliationFinding::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;
    use crate::types::{Batch, MigrationEvent};
    use alloy::primitives::Address;

    #[test]
    fn test_classify() {
        assert_eq!(classify(U256::ZERO, 0), ReconciliationFinding::NoDepositors);
        assert_eq!(classify(U256::ZERO, 5), ReconciliationFinding::NoDepositors);
        assert_eq!(classify(U256::from(5u64), 5), ReconciliationFinding::Complete);
        assert_eq!(classify(U256::from(3u64), 5), ReconciliationFinding::Partial);
        assert_eq!(classify(U256::from(8u64), 5), ReconciliationFinding::Partial);
    }

    #[tokio::test]
    async fn test_verify_reads_counters() {
        let vault = MemoryVault::new();
        let columns = Batch {
            index: 1,
            events: vec![
                MigrationEvent::new(Address::repeat_byte(1), U256::from(10u64), 1),
                MigrationEvent::new(Address::repeat_byte(2), U256::from(15u64), 1),
            ],
        }
        .columns();
        let tx = vault.send_import(&columns).await.unwrap();
        vault.wait_for_confirmation(tx).await.unwrap();

        let outcome = verify(&vault, 2).await.unwrap();
        assert_eq!(outcome.total_deposits, U256::from(25u64));
        assert_eq!(outcome.depositor_count, U256::from(2u64));
        assert_eq!(outcome.finding, ReconciliationFinding::Complete);
    }

    #[tokio::test]
    async fn test_read_failure() {
        let vault = MemoryVault::new();
        vault.fail_reads(true);
        let err = verify(&vault, 1).await.unwrap_err();
        assert!(matches!(err, SdkError::VerificationRead(_)));
        assert!(!err.is_fatal());
    }
}
