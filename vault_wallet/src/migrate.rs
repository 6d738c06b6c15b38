use crate::display;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vault_sdk::{MemoryVault, MigrationConfig, MigrationReport, Migrator, TargetVault, VaultClient};

/// Everything one migration run needs from the command line
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub old_vault: Address,
    pub new_vault: Address,
    pub rpc_url: String,
    pub config: MigrationConfig,
    pub dry_run: bool,
    pub json: bool,
}

/// Run the migration pipeline and print its progress and summary.
///
/// Ctrl-C stops the run at the next batch boundary; the batch in flight is
/// still waited out.
pub async fn run(options: MigrateOptions, signer: PrivateKeySigner) -> Result<MigrationReport> {
    let signer_address = signer.address();
    let client = VaultClient::with_signer(&options.rpc_url, options.new_vault, signer)
        .context("Failed to create ledger client")?
        .with_poll_interval(options.config.poll_interval());

    if !options.json {
        display::print_banner(
            signer_address,
            &client.rpc_url,
            options.old_vault,
            options.new_vault,
            options.dry_run,
        );
    }

    let source = Arc::new(client.at(options.old_vault));
    let target: Arc<dyn TargetVault> = if options.dry_run {
        Arc::new(MemoryVault::new())
    } else {
        Arc::new(client)
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current batch");
            interrupt.cancel();
        }
    });

    let quiet = options.json;
    let mut migrator = Migrator::new(source, target, options.config)
        .with_cancellation(cancel)
        .with_progress(move |progress| {
            if !quiet {
                display::print_progress(&progress);
            }
        });

    info!("Starting migration from {} to {}", options.old_vault, options.new_vault);
    let outcome = migrator.run(options.old_vault).await;
    watcher.abort();
    let report = outcome.context("Migration aborted")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report);
        if report.batches_succeeded == report.batches_planned && !report.cancelled {
            println!("\n{}", "Migration finished".green().bold());
        } else {
            println!("\n{}", "Migration finished with skipped batches".yellow().bold());
        }
    }

    Ok(report)
}

/// Parse a contract address, naming the argument on failure
pub fn parse_address(label: &str, input: &str) -> Result<Address> {
    input
        .trim()
        .parse::<Address>()
        .map_err(|_| anyhow::anyhow!("Invalid {} address: {}", label, input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let parsed = parse_address("old vault", "0x00000000000000000000000000000000000000aa").unwrap();
        assert_eq!(parsed, Address::with_last_byte(0xaa));

        let err = parse_address("new vault", "0x1234").unwrap_err();
        assert!(err.to_string().contains("new vault"));
    }
}
