use clap::Args;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use p2p_lending_core::config::PlatformConfig;
use p2p_lending_core::{LifecycleEngine, PlatformSnapshot};

use crate::input;

/// Where platform state lives and how the engine is configured for this run.
pub struct Context {
    state_path: String,
    config: PlatformConfig,
}

impl Context {
    pub fn load(state_path: &str, config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match config_path {
            Some(path) => input::file::read_json(path)?,
            None => PlatformConfig::default(),
        };
        Ok(Self {
            state_path: state_path.to_string(),
            config,
        })
    }

    /// Rebuild the engine from the state file.
    pub fn engine(&self) -> Result<LifecycleEngine, Box<dyn std::error::Error>> {
        if !Path::new(&self.state_path).exists() {
            return Err(format!(
                "State file '{}' not found; run `p2pl init` first",
                self.state_path
            )
            .into());
        }
        let snapshot: PlatformSnapshot = input::file::read_json(&self.state_path)?;
        debug!(
            path = %self.state_path,
            loans = snapshot.loans.len(),
            agreements = snapshot.agreements.len(),
            "state loaded"
        );
        Ok(LifecycleEngine::from_snapshot(snapshot).with_config(self.config.clone()))
    }

    pub fn save(&self, engine: &LifecycleEngine) -> Result<(), Box<dyn std::error::Error>> {
        self.write_snapshot(&engine.snapshot())
    }

    /// Stage in a sibling temp file, then rename it over the state file.
    fn write_snapshot(&self, snapshot: &PlatformSnapshot) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(snapshot)?;
        let staging = format!("{}.tmp.{}", self.state_path, std::process::id());
        fs::write(&staging, contents)
            .map_err(|e| format!("Failed to write '{}': {}", staging, e))?;
        if let Err(e) = fs::rename(&staging, &self.state_path) {
            let _ = fs::remove_file(&staging);
            return Err(format!("Failed to replace '{}': {}", self.state_path, e).into());
        }
        debug!(path = %self.state_path, "state saved");
        Ok(())
    }
}

/// Arguments for state initialisation
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing state file
    #[arg(long)]
    pub force: bool,
}

pub fn run_init(args: InitArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    if Path::new(&ctx.state_path).exists() && !args.force {
        return Err(format!(
            "State file '{}' already exists (use --force to overwrite)",
            ctx.state_path
        )
        .into());
    }

    let snapshot = PlatformSnapshot::seeded();
    ctx.write_snapshot(&snapshot)?;
    info!(path = %ctx.state_path, "state initialised");

    Ok(json!({
        "result": {
            "state_file": ctx.state_path,
            "users": snapshot.users.len(),
        }
    }))
}
