use clap::Subcommand;
use serde_json::Value;

use p2p_lending_core::ledger::LoanStatus;
use p2p_lending_core::LoanId;

use super::state::Context;

#[derive(Subcommand)]
pub enum LoansCommand {
    /// List loans, optionally filtered by status
    List {
        /// proposed, approved, invested, signed or disbursed
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one loan
    Get {
        /// Loan ID
        id: LoanId,
    },
}

pub fn run(cmd: LoansCommand, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    match cmd {
        LoansCommand::List { status } => {
            let filter = status.as_deref().map(str::parse::<LoanStatus>).transpose()?;
            let loans: Vec<_> = engine
                .list_loans()
                .into_iter()
                .filter(|loan| filter.map_or(true, |status| loan.status == status))
                .collect();
            Ok(serde_json::to_value(loans)?)
        }
        LoansCommand::Get { id } => Ok(serde_json::to_value(engine.get_loan(id)?)?),
    }
}
