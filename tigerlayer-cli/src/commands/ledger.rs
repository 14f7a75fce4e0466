//! Ledger commands - inspect or reset the processing ledger.

use clap::Subcommand;
use tigerlayer::ledger::Ledger;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Ledger subcommands.
#[derive(Debug, Subcommand)]
pub enum LedgerAction {
    /// Show attempt counts and processed files
    Status,
    /// Back up the ledger and start a fresh one
    ///
    /// Every file becomes eligible for processing again.
    Reset,
}

/// Run a ledger subcommand.
pub fn run(runner: &CliRunner, action: LedgerAction) -> Result<(), CliError> {
    runner.log_startup("ledger");
    let path = runner.config().processing.ledger_path();
    let mut ledger = Ledger::open(&path)?;

    if let Some(backup) = ledger.recovered_backup() {
        println!("Ledger was unreadable; backed up to {}", backup.display());
    }

    match action {
        LedgerAction::Status => {
            let summary = ledger.summary();
            println!("Ledger: {}", path.display());
            println!("  Attempts:        {}", summary.entries);
            println!("  Successes:       {}", summary.successes);
            println!("  Errors:          {}", summary.errors);
            println!("  Processed files: {}", summary.processed_files);
        }
        LedgerAction::Reset => {
            let backup = ledger.reset()?;
            println!("Ledger reset. Previous entries saved to {}", backup.display());
        }
    }
    Ok(())
}
