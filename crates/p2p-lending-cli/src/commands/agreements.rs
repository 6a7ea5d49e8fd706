use clap::Subcommand;
use serde_json::{json, Value};

use p2p_lending_core::AgreementId;

use super::state::Context;

#[derive(Subcommand)]
pub enum AgreementsCommand {
    /// List agreements without their document bodies
    List {
        /// Only agreements owned by this user
        #[arg(long)]
        owner: Option<u64>,
    },
    /// Show one agreement, document hex-encoded
    Get {
        /// Agreement ID
        id: AgreementId,
    },
    /// Print an agreement's rendered document
    View {
        /// Agreement ID
        id: AgreementId,
    },
}

pub fn run(cmd: AgreementsCommand, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    match cmd {
        AgreementsCommand::List { owner } => {
            let rows: Vec<Value> = engine
                .list_agreements()
                .into_iter()
                .filter(|a| owner.map_or(true, |id| a.owner_id == id))
                .map(|a| {
                    json!({
                        "id": a.id,
                        "owner_id": a.owner_id,
                        "signed": a.signed,
                        "document_bytes": a.document.len(),
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        }
        AgreementsCommand::Get { id } => Ok(serde_json::to_value(engine.get_agreement(id)?)?),
        AgreementsCommand::View { id } => {
            let document = engine.view_agreement(id)?;
            Ok(json!({
                "result": {
                    "agreement_id": id,
                    "document": String::from_utf8_lossy(&document),
                }
            }))
        }
    }
}
