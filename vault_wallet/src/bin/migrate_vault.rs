// src/bin/migrate_vault.rs
// Replays UserDepositMigrated history from an old vault into a new one

use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use log::error;
use std::process;
use vault_sdk::MigrationConfig;
use vault_wallet::migrate::{self, parse_address, MigrateOptions};
use vault_wallet::signer::SecretKey;

#[derive(Parser)]
#[command(name = "migrate-vault")]
#[command(about = "Migrate historical deposits from an old vault into a new vault")]
struct Cli {
    /// Address of the old vault contract
    old_vault: String,

    /// Address of the new vault contract
    new_vault: String,

    /// Private key of the new vault's owner (hex)
    private_key: String,

    /// JSON-RPC endpoint URL
    rpc_url: String,
}

fn print_usage() {
    eprintln!("{}", "Error: all four arguments are required".red());
    eprintln!("\nUsage:");
    eprintln!("  migrate-vault <OLD_VAULT> <NEW_VAULT> <PRIVATE_KEY> <RPC_URL>");
    eprintln!("\nExample:");
    eprintln!("  migrate-vault 0x5FbDB2315678afecb367f032d93F642f64180aa3 \\");
    eprintln!("      0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512 \\");
    eprintln!("      0xac09...ff80 http://localhost:8545");
    eprintln!("\nArguments:");
    eprintln!("  OLD_VAULT    vault whose UserDepositMigrated events are replayed");
    eprintln!("  NEW_VAULT    vault receiving importUserDepositsBatch calls");
    eprintln!("  PRIVATE_KEY  owner key of the new vault");
    eprintln!("  RPC_URL      JSON-RPC endpoint of the network");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            print_usage();
            process::exit(1);
        }
    };

    let old_vault = match parse_address("old vault", &cli.old_vault) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    };
    let new_vault = match parse_address("new vault", &cli.new_vault) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    };
    let signer = match SecretKey::new(cli.private_key).signer() {
        Ok(signer) => signer,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    };

    let config = match MigrationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    };

    let options = MigrateOptions {
        old_vault,
        new_vault,
        rpc_url: cli.rpc_url,
        config,
        dry_run: false,
        json: false,
    };

    if let Err(e) = migrate::run(options, signer).await {
        error!("{:#}", e);
        eprintln!("{}", format!("Migration failed: {:#}", e).red().bold());
        process::exit(1);
    }
}
