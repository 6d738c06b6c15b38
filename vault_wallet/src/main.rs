use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vault_sdk::{parse_token_amount, spawn_refresh, MigrationConfig, SdkError, VaultSession};
use vault_wallet::migrate::{self, parse_address, MigrateOptions};
use vault_wallet::{display, signer};

#[derive(Parser)]
#[command(name = "vault-wallet")]
#[command(about = "Vault Wallet - CLI client for the deposit vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON-RPC endpoint URL
    #[arg(long, global = true, env = "VAULT_RPC_URL", default_value = "http://localhost:8545")]
    rpc_url: String,

    /// Vault contract address
    #[arg(long, global = true, env = "VAULT_ADDRESS")]
    vault: Option<String>,

    /// Signing key (hex); prompted for when absent
    #[arg(long, global = true)]
    private_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show vault and account state
    Status {
        /// Account to inspect without loading a key
        #[arg(long)]
        account: Option<String>,
    },

    /// Approve the vault to spend deposit tokens
    Approve {
        /// Amount in tokens (18 decimals), e.g. 12.5
        amount: String,
    },

    /// Deposit tokens into the vault
    Deposit {
        /// Amount in tokens (18 decimals), e.g. 12.5
        amount: String,
    },

    /// Withdraw your refund
    Withdraw,

    /// Refresh vault state on an interval until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,

        /// Account to inspect without loading a key
        #[arg(long)]
        account: Option<String>,
    },

    /// Import deposits recorded by an old vault into --vault
    Migrate {
        /// Old vault contract address
        old_vault: String,

        /// Users per import transaction
        #[arg(long)]
        batch_size: Option<usize>,

        /// First block to scan
        #[arg(long)]
        from_block: Option<u64>,

        /// Last block to scan (default: latest)
        #[arg(long)]
        to_block: Option<u64>,

        /// Query the log in windows of this many blocks
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Confirmation deadline per batch, 0 waits indefinitely
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Import into an in-memory vault instead of sending transactions
        #[arg(long)]
        dry_run: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn vault_address(cli: &Cli) -> Result<Address> {
    let vault = cli
        .vault
        .as_deref()
        .ok_or_else(|| anyhow!("No vault address: pass --vault or set VAULT_ADDRESS"))?;
    parse_address("vault", vault)
}

fn connect(cli: &Cli) -> Result<VaultSession> {
    let vault = vault_address(cli)?;
    let signer = signer::load_signer(cli.private_key.clone())?;
    Ok(VaultSession::connect(&cli.rpc_url, vault, signer)?)
}

/// Read-only session when an account is given, otherwise a signing one
fn open(cli: &Cli, account: Option<&str>) -> Result<VaultSession> {
    match account {
        Some(account) => {
            let account = parse_address("account", account)?;
            Ok(VaultSession::observe(&cli.rpc_url, vault_address(cli)?, account)?)
        }
        None => connect(cli),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Status { account } => {
            let session = open(&cli, account.as_deref())?;
            println!("{}", "Fetching vault state...".cyan());

            if !session.client().health_check().await {
                println!("{}", "Endpoint is offline or unreachable".red());
                println!("{}", format!("Trying to connect to: {}", cli.rpc_url).yellow());
                return Ok(());
            }
            let snapshot = session.snapshot().await?;
            display::print_snapshot(&snapshot);
        }

        Commands::Approve { amount } => {
            let amount = parse_token_amount(amount)?;
            let session = connect(&cli)?;
            println!("{}", "Approving vault to spend tokens...".cyan());

            let confirmation = session.approve(amount).await?;
            println!("\n{}", "Approval confirmed".green().bold());
            println!("{}: {}", "Tx".bright_white(), confirmation.tx_hash.to_string().cyan());
            println!("{}: {}", "Block".bright_white(), confirmation.block.number);
        }

        Commands::Deposit { amount } => {
            let amount = parse_token_amount(amount)?;
            let session = connect(&cli)?;
            println!("{}", "Submitting deposit...".cyan());

            match session.deposit(amount).await {
                Ok(confirmation) => {
                    println!("\n{}", "Deposit confirmed".green().bold());
                    println!("{}: {}", "Tx".bright_white(), confirmation.tx_hash.to_string().cyan());
                    println!("{}: {}", "Gas used".bright_white(), confirmation.gas_used);
                }
                Err(e) => {
                    println!("{}", format!("Deposit failed: {}", e).red());
                    println!("{}", "Check the token allowance with 'vault-wallet approve'".yellow());
                }
            }
        }

        Commands::Withdraw => {
            let session = connect(&cli)?;
            println!("{}", "Requesting refund...".cyan());

            match session.withdraw().await {
                Ok(confirmation) => {
                    println!("\n{}", "Withdrawal confirmed".green().bold());
                    println!("{}: {}", "Tx".bright_white(), confirmation.tx_hash.to_string().cyan());
                }
                Err(SdkError::WithdrawDisabled) => {
                    println!("{}", "Withdrawals are not open yet".yellow());
                }
                Err(SdkError::NothingToWithdraw) => {
                    println!("{}", "Nothing to withdraw for this account".yellow());
                }
                Err(e) => {
                    println!("{}", format!("Withdrawal failed: {}", e).red());
                }
            }
        }

        Commands::Watch {
            interval_secs,
            account,
        } => {
            let session = Arc::new(open(&cli, account.as_deref())?);
            let cancel = CancellationToken::new();
            println!(
                "{}",
                format!("Refreshing every {}s, Ctrl-C to stop", interval_secs).cyan()
            );

            let handle = spawn_refresh(
                session,
                Duration::from_secs((*interval_secs).max(1)),
                cancel.clone(),
                |snapshot| match snapshot {
                    Ok(snapshot) => display::print_snapshot(&snapshot),
                    Err(e) => println!("{}", format!("Refresh failed: {}", e).red()),
                },
            );

            tokio::signal::ctrl_c().await?;
            cancel.cancel();
            handle.await?;
        }

        Commands::Migrate {
            old_vault,
            batch_size,
            from_block,
            to_block,
            chunk_size,
            timeout_secs,
            dry_run,
            json,
        } => {
            let old_vault = parse_address("old vault", old_vault)?;
            let new_vault = vault_address(&cli)?;

            let mut config = MigrationConfig::from_env()?;
            if let Some(size) = batch_size {
                config = config.with_batch_size(*size);
            }
            if from_block.is_some() || to_block.is_some() {
                let from = from_block.unwrap_or(config.from_block);
                let to = to_block.or(config.to_block);
                config = config.with_block_range(from, to);
            }
            if chunk_size.is_some() {
                config = config.with_block_chunk_size(*chunk_size);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_confirmation_timeout((*secs > 0).then(|| Duration::from_secs(*secs)));
            }

            let signer = signer::load_signer(cli.private_key.clone())?;
            let options = MigrateOptions {
                old_vault,
                new_vault,
                rpc_url: cli.rpc_url.clone(),
                config,
                dry_run: *dry_run,
                json: *json,
            };
            migrate::run(options, signer).await?;
        }
    }

    Ok(())
}
