use clap::Subcommand;
use serde_json::Value;

use p2p_lending_core::UserId;

use super::state::Context;

#[derive(Subcommand)]
pub enum UsersCommand {
    /// List every user
    List,
    /// Show one user
    Get {
        /// User ID
        id: UserId,
    },
}

pub fn run(cmd: UsersCommand, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    match cmd {
        UsersCommand::List => Ok(serde_json::to_value(engine.list_users())?),
        UsersCommand::Get { id } => Ok(serde_json::to_value(engine.get_user(id)?)?),
    }
}
