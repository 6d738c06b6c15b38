use alloy::primitives::utils::format_ether;
use alloy::primitives::Address;
use colored::Colorize;
use vault_sdk::types::{ReconciliationFinding, VerificationOutcome};
use vault_sdk::{MigrationReport, Progress, SubmissionResult, VaultSnapshot};

pub fn print_banner(signer: Address, rpc_url: &str, old_vault: Address, new_vault: Address, dry_run: bool) {
    println!("\n{}", "Vault Migration".cyan().bold());
    println!("{}", "═".repeat(50).cyan());
    println!("{}: {}", "Signer".bright_white(), signer.to_string().yellow());
    println!("{}: {}", "RPC URL".bright_white(), rpc_url);
    println!("{}: {}", "Old vault".bright_white(), old_vault);
    println!("{}: {}", "New vault".bright_white(), new_vault.to_string().green());
    if dry_run {
        println!("{}", "Dry run: imports go to an in-memory vault".yellow());
    }
    println!("{}", "═".repeat(50).cyan());
}

pub fn print_progress(progress: &Progress<'_>) {
    match progress {
        Progress::Fetched { events } => {
            if *events == 0 {
                println!("{}", "No historical migration events found".yellow());
            } else {
                println!("{}", format!("Found {} historical migration events", events).green());
            }
        }
        Progress::Validated { valid, total } => {
            println!("Valid events: {}/{}", valid.to_string().cyan(), total);
        }
        Progress::Batched { batches } => {
            println!("{}", format!("Prepared {} batches", batches).bright_black());
        }
        Progress::BatchStarted { index, of, size } => {
            println!(
                "\n{}",
                format!("Processing batch {}/{} ({} users)", index, of, size).cyan()
            );
        }
        Progress::BatchFinished(result) => print_batch_result(result),
        Progress::Cancelled { remaining } => {
            println!(
                "\n{}",
                format!("Cancelled, {} batches not submitted", remaining).yellow().bold()
            );
        }
        Progress::Verified(outcome) => print_verification(outcome),
    }
}

fn print_batch_result(result: &SubmissionResult) {
    if result.success {
        println!("{}", format!("Batch {} imported", result.batch_index).green());
        if let Some(tx) = result.tx_hash {
            println!("   {}: {}", "Tx".bright_white(), tx.to_string().bright_black());
        }
        println!("   {}: {}", "Gas used".bright_white(), result.resource_cost);
        if let Some(block) = result.confirmed_at {
            println!("   {}: {}", "Block".bright_white(), block.number);
        }
        return;
    }

    println!("{}", format!("Batch {} failed", result.batch_index).red());
    if let Some(detail) = &result.error_detail {
        println!("   {}: {}", "Reason".bright_white(), detail);
    }
    if let Some(code) = &result.error_code {
        println!("   {}: {}", "Code".bright_white(), code);
    }
    if let Some(tx) = result.tx_hash {
        println!("   {}: {}", "Tx".bright_white(), tx.to_string().bright_black());
    }
}

fn print_verification(outcome: &VerificationOutcome) {
    println!("\n{}", "Verifying migration...".cyan());
    println!("{}:", "New vault state".bright_white());
    println!("   Total deposits: {}", format_ether(outcome.total_deposits));
    println!("   Depositors: {}", outcome.depositor_count);
    println!("   Expected depositors: {}", outcome.expected_user_count);

    match outcome.finding {
        ReconciliationFinding::Complete => println!("{}", "Migration verified".green().bold()),
        ReconciliationFinding::Partial => {
            println!("{}", "Depositor count differs from expected".yellow())
        }
        ReconciliationFinding::NoDepositors => {
            println!("{}", "Migration may not have succeeded: no depositors".yellow())
        }
    }
}

pub fn print_report(report: &MigrationReport) {
    println!("\n{}", "Migration Summary".cyan().bold());
    println!("{}", "═".repeat(50).cyan());
    println!("{}: {}", "Run".bright_white(), report.run_id);
    println!(
        "{}: {}/{}",
        "Users imported".bright_white(),
        report.users_imported.to_string().green(),
        report.valid_events
    );
    println!(
        "{}: {}/{} ({} planned)",
        "Batches succeeded".bright_white(),
        report.batches_succeeded,
        report.batches_attempted,
        report.batches_planned
    );
    println!("{}: {}", "Total gas used".bright_white(), report.total_resource_cost);
    if report.verification.is_none() {
        println!("{}", "Verification unavailable".yellow());
    }
    if report.cancelled {
        println!("{}", "Run was cancelled before all batches were sent".yellow());
    }

    let failed: Vec<_> = report.failed_batches().collect();
    if !failed.is_empty() {
        println!("\n{}", format!("Failed batches ({})", failed.len()).red().bold());
        println!("{}", "─".repeat(50).bright_black());
        for result in failed {
            println!(
                "{} {}: {}",
                "Batch".bright_white(),
                result.batch_index,
                result.error_detail.as_deref().unwrap_or("unknown error")
            );
            for user in &result.users {
                println!("   {}", user.to_string().bright_black());
            }
        }
    }
}

pub fn print_snapshot(snapshot: &VaultSnapshot) {
    println!("\n{}", "Vault Status".cyan().bold());
    println!("{}", "═".repeat(50).cyan());
    println!("{}: {}", "Account".bright_white(), snapshot.account.to_string().green());
    println!("{}: {}", "Total deposits".bright_white(), format_ether(snapshot.total_deposits));
    println!("{}: {}", "Depositors".bright_white(), snapshot.depositor_count);
    println!("{}: {}", "Target price".bright_white(), format_ether(snapshot.target_price));
    println!("{}: {}", "Current price".bright_white(), format_ether(snapshot.current_price));
    println!("{}: {}", "Total value".bright_white(), snapshot.total_value_display());

    let withdraw = if snapshot.withdraw_allowed {
        "open".green()
    } else {
        "closed".yellow()
    };
    println!("{}: {}", "Withdrawals".bright_white(), withdraw);

    println!("{}", "─".repeat(50).bright_black());
    let deposit = &snapshot.user_deposit;
    println!("{}: {}", "Your deposit".bright_white(), format_ether(deposit.amount));
    if let Some(label) = deposit.status_label() {
        println!("{}: {}", "Status".bright_white(), label.cyan());
    }
}
