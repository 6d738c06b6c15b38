pub mod abi;
pub mod batcher;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod migrator;
pub mod session;
pub mod source;
pub mod submitter;
pub mod types;
pub mod validation;
pub mod verifier;

pub use batcher::{make_batches, DEFAULT_BATCH_SIZE};
pub use client::VaultClient;
pub use config::MigrationConfig;
pub use error::{LedgerError, Result, SdkError};
pub use ledger::{EventQuery, EventSource, TargetVault};
pub use memory::{MemorySource, MemoryVault};
pub use migrator::{Migrator, Progress};
pub use session::{parse_token_amount, spawn_refresh, VaultSession};
pub use submitter::BatchSubmitter;
pub use types::{MigrationEvent, MigrationReport, PipelineStage, SubmissionResult, VaultSnapshot};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::VaultClient;
    pub use crate::config::MigrationConfig;
    pub use crate::error::{Result, SdkError};
    pub use crate::ledger::{EventSource, TargetVault};
    pub use crate::migrator::{Migrator, Progress};
    pub use crate::session::VaultSession;
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
