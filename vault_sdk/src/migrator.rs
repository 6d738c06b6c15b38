use crate::abi::IVault;
use crate::batcher::make_batches;
use crate::config::MigrationConfig;
use crate::error::{Result, SdkError};
use crate::ledger::{EventSource, TargetVault};
use crate::source::fetch_events;
use crate::submitter::BatchSubmitter;
use crate::types::*;
use crate::validation::filter_valid;
use crate::verifier::verify;
use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use chrono::Utc;
use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Progress notifications emitted while a migration runs.
#[derive(Debug)]
pub enum Progress<'a> {
    Fetched { events: usize },
    Validated { valid: usize, total: usize },
    Batched { batches: usize },
    BatchStarted { index: usize, of: usize, size: usize },
    BatchFinished(&'a SubmissionResult),
    Cancelled { remaining: usize },
    Verified(&'a VerificationOutcome),
}

pub type ProgressFn = Box<dyn Fn(Progress<'_>) + Send + Sync>;

/// Drains migration events from a source vault and replays them into a target vault.
pub struct Migrator {
    source: Arc<dyn EventSource>,
    target: Arc<dyn TargetVault>,
    config: MigrationConfig,
    event_signature: B256,
    stage: PipelineStage,
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
}

impl Migrator {
    pub fn new(
        source: Arc<dyn EventSource>,
        target: Arc<dyn TargetVault>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
            event_signature: IVault::UserDepositMigrated::SIGNATURE_HASH,
            stage: PipelineStage::Idle,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Stop between batches once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(Progress<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// Read a different event than `UserDepositMigrated` (same field layout).
    pub fn with_event_signature(mut self, signature: B256) -> Self {
        self.event_signature = signature;
        self
    }

    pub fn stage(&self) -> &PipelineStage {
        &self.stage
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn emit(&self, progress: Progress<'_>) {
        if let Some(f) = &self.progress {
            f(progress);
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!("Migration stage: {:?}", stage);
        self.stage = stage;
    }

    /// Run the full pipeline against `source_contract`.
    ///
    /// Fatal errors leave the migrator in `Failed` and are returned; batch
    /// failures are recorded in the report and the run continues.
    pub async fn run(&mut self, source_contract: Address) -> Result<MigrationReport> {
        match self.run_stages(source_contract).await {
            Ok(report) => {
                self.enter(PipelineStage::Done);
                Ok(report)
            }
            Err(e) => {
                error!("Migration failed during {:?}: {}", self.stage, e);
                self.enter(PipelineStage::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self, source_contract: Address) -> Result<MigrationReport> {
        self.config.validate()?;
        let mut report = MigrationReport::new();

        self.enter(PipelineStage::Fetching);
        let events = fetch_events(
            self.source.as_ref(),
            source_contract,
            self.event_signature,
            self.config.from_block,
            self.config.to_block,
            self.config.block_chunk_size,
        )
        .await?;
        report.total_source_events = events.len();
        info!("Found {} historical migration events", events.len());
        self.emit(Progress::Fetched { events: events.len() });

        self.enter(PipelineStage::Validating);
        let valid = filter_valid(&events);
        report.valid_events = valid.len();
        info!("Valid events: {}/{}", valid.len(), events.len());
        self.emit(Progress::Validated {
            valid: valid.len(),
            total: events.len(),
        });

        self.enter(PipelineStage::Batching);
        let batches = make_batches(&valid, self.config.batch_size)?;
        report.batches_planned = batches.len();
        self.emit(Progress::Batched {
            batches: batches.len(),
        });

        let submitter = BatchSubmitter::new(self.target.clone())
            .with_confirmation_timeout(self.config.confirmation_timeout());
        let total = batches.len();
        for (position, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Cancellation requested, stopping before batch {}/{}",
                    batch.index, total
                );
                report.cancelled = true;
                self.emit(Progress::Cancelled {
                    remaining: total - position,
                });
                break;
            }

            self.enter(PipelineStage::Submitting {
                batch: batch.index,
                of: total,
            });
            self.emit(Progress::BatchStarted {
                index: batch.index,
                of: total,
                size: batch.len(),
            });

            let result = submitter.submit(batch).await;
            self.emit(Progress::BatchFinished(&result));
            report.record(result);
        }
        info!(
            "Import statistics: {}/{} users imported, {}/{} batches succeeded",
            report.users_imported, report.valid_events, report.batches_succeeded, total
        );

        self.enter(PipelineStage::Verifying);
        let expected_users = valid.iter().map(|e| e.user).collect::<HashSet<_>>().len() as u64;
        match verify(self.target.as_ref(), expected_users).await {
            Ok(outcome) => {
                self.emit(Progress::Verified(&outcome));
                report.apply_verification(outcome);
            }
            Err(e @ SdkError::VerificationRead(_)) => {
                warn!("{}; report omits verification", e);
            }
            Err(e) => return Err(e),
        }

        report.finished_at = Some(Utc::now());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySource, MemoryVault};
    use alloy::primitives::{address, U256};

    const SOURCE: Address = address!("5151515151515151515151515151515151515151");

    #[tokio::test]
    async fn test_stage_transitions() {
        let mut source = MemorySource::new(SOURCE);
        source.extend([MigrationEvent::new(Address::repeat_byte(1), U256::from(1u64), 1)]);

        let mut migrator = Migrator::new(
            Arc::new(source),
            Arc::new(MemoryVault::new()),
            MigrationConfig::default(),
        );
        assert_eq!(migrator.stage(), &PipelineStage::Idle);

        let report = migrator.run(SOURCE).await.unwrap();
        assert_eq!(migrator.stage(), &PipelineStage::Done);
        assert_eq!(report.users_imported, 1);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let mut migrator = Migrator::new(
            Arc::new(MemorySource::new(SOURCE).unavailable()),
            Arc::new(MemoryVault::new()),
            MigrationConfig::default(),
        );

        let err = migrator.run(SOURCE).await.unwrap_err();
        assert!(matches!(err, SdkError::SourceUnavailable(_)));
        assert!(matches!(migrator.stage(), PipelineStage::Failed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let vault = Arc::new(MemoryVault::new());
        let mut migrator = Migrator::new(
            Arc::new(MemorySource::new(SOURCE)),
            vault.clone(),
            MigrationConfig::default().with_batch_size(0),
        );

        let err = migrator.run(SOURCE).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidConfig(_)));
        assert_eq!(vault.import_calls(), 0);
    }
}
