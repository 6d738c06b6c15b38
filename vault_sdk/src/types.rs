use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, TxHash, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One historical deposit record read from the source vault's
/// `UserDepositMigrated` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationEvent {
    pub user: Address,
    pub amount: U256,
    pub timestamp: u64,

    /// Block the log was emitted in (audit output only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl MigrationEvent {
    pub fn new(user: Address, amount: U256, timestamp: u64) -> Self {
        Self {
            user,
            amount,
            timestamp,
            block_number: None,
        }
    }

    pub fn at_block(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }
}

/// Ordered group of events submitted as a single import transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position in the migration run
    pub index: usize,
    pub events: Vec<MigrationEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn users(&self) -> Vec<Address> {
        self.events.iter().map(|e| e.user).collect()
    }

    /// Parallel column arrays for `importUserDepositsBatch`.
    pub fn columns(&self) -> ImportColumns {
        ImportColumns {
            users: self.users(),
            amounts: self.events.iter().map(|e| e.amount).collect(),
            timestamps: self.events.iter().map(|e| U256::from(e.timestamp)).collect(),
            refunded: vec![false; self.events.len()],
        }
    }
}

/// Arguments of one `importUserDepositsBatch` call. All four columns have equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportColumns {
    pub users: Vec<Address>,
    pub amounts: Vec<U256>,
    pub timestamps: Vec<U256>,
    pub refunded: Vec<bool>,
}

impl ImportColumns {
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Block a transaction was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReference {
    pub number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
}

/// Receipt data for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub gas_used: u64,
    pub block: BlockReference,
    /// false when the transaction was mined but reverted
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A member failed validation; nothing was sent
    InvalidMember,
    /// The endpoint refused the transaction
    Rejected,
    /// Mined, but execution reverted
    Reverted,
    /// Sent but no confirmation obtained (deadline or lost receipt); outcome unknown
    Timeout,
}

/// Outcome of submitting one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub batch_index: usize,
    pub success: bool,
    pub resource_cost: u64,
    pub confirmed_at: Option<BlockReference>,
    pub tx_hash: Option<TxHash>,
    pub error_detail: Option<String>,
    pub error_code: Option<String>,
    pub failure: Option<FailureKind>,
    /// Addresses carried by the batch, for manual replay
    pub users: Vec<Address>,
}

impl SubmissionResult {
    pub fn confirmed(batch: &Batch, confirmation: &Confirmation) -> Self {
        Self {
            batch_index: batch.index,
            success: true,
            resource_cost: confirmation.gas_used,
            confirmed_at: Some(confirmation.block),
            tx_hash: Some(confirmation.tx_hash),
            error_detail: None,
            error_code: None,
            failure: None,
            users: batch.users(),
        }
    }

    pub fn failed(batch: &Batch, failure: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            batch_index: batch.index,
            success: false,
            resource_cost: 0,
            confirmed_at: None,
            tx_hash: None,
            error_detail: Some(detail.into()),
            error_code: None,
            failure: Some(failure),
            users: batch.users(),
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.error_code = code;
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }
}

/// How strongly the target's counters support a completed migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationFinding {
    /// depositor count equals the expected user count
    Complete,
    /// some depositors exist, but not the expected number
    Partial,
    /// target has no depositors at all
    NoDepositors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub total_deposits: U256,
    pub depositor_count: U256,
    pub expected_user_count: u64,
    pub finding: ReconciliationFinding,
}

/// Stage of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Fetching,
    Validating,
    Batching,
    Submitting { batch: usize, of: usize },
    Verifying,
    Done,
    Failed { reason: String },
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed { .. })
    }
}

/// Final statistics of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_source_events: usize,
    pub valid_events: usize,
    pub batches_planned: usize,
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub users_imported: usize,
    pub total_resource_cost: u64,
    pub final_target_user_count: Option<U256>,
    pub final_target_total_amount: Option<U256>,
    pub verification: Option<VerificationOutcome>,
    pub cancelled: bool,
    pub results: Vec<SubmissionResult>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            total_source_events: 0,
            valid_events: 0,
            batches_planned: 0,
            batches_attempted: 0,
            batches_succeeded: 0,
            users_imported: 0,
            total_resource_cost: 0,
            final_target_user_count: None,
            final_target_total_amount: None,
            verification: None,
            cancelled: false,
            results: Vec::new(),
        }
    }

    /// Fold one batch outcome into the running totals.
    pub fn record(&mut self, result: SubmissionResult) {
        self.batches_attempted += 1;
        if result.success {
            self.batches_succeeded += 1;
            self.users_imported += result.users.len();
            self.total_resource_cost = self.total_resource_cost.saturating_add(result.resource_cost);
        }
        self.results.push(result);
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &SubmissionResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn apply_verification(&mut self, outcome: VerificationOutcome) {
        self.final_target_user_count = Some(outcome.depositor_count);
        self.final_target_total_amount = Some(outcome.total_deposits);
        self.verification = Some(outcome);
    }
}

impl Default for MigrationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user record as returned by `getUserDeposit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserDeposit {
    pub amount: U256,
    pub timestamp: U256,
    pub refunded: bool,
    pub migrated: bool,
}

impl UserDeposit {
    /// Refunded takes precedence over migrated.
    pub fn status_label(&self) -> Option<&'static str> {
        if self.refunded {
            Some("refunded")
        } else if self.migrated {
            Some("migrated")
        } else {
            None
        }
    }
}

/// Aggregate and per-account view of the vault, refreshed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub account: Address,
    pub total_deposits: U256,
    pub depositor_count: U256,
    pub target_price: U256,
    pub current_price: U256,
    pub user_deposit: UserDeposit,
    pub withdraw_allowed: bool,
}

impl VaultSnapshot {
    /// Value of all deposits at the current price (both 18-decimal).
    pub fn total_value(&self) -> U256 {
        self.total_deposits
            .saturating_mul(self.current_price)
            / U256::from(10u64).pow(U256::from(18u64))
    }

    pub fn total_value_display(&self) -> String {
        format_ether(self.total_value())
    }
}
