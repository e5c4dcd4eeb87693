//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use reclaim_config::{LayerStatus, PROJECT_CONFIG_FILE};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved configuration
    Show,

    /// Show each config layer, whether it applied, and the strategy it set
    Which,

    /// Write a commented starter config file
    Init {
        /// Write ./reclaim.toml instead of the user config file
        #[arg(long)]
        local: bool,
    },

    /// Print the file `init` would write
    Path {
        /// Print the project-local path instead
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Which => cmd_which(ctx).await,
        ConfigCommand::Init { local } => cmd_init(local).await,
        ConfigCommand::Path { local } => {
            println!("{}", target_file(local)?.display());
            Ok(())
        }
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;
    let config = &loaded.config;
    let sweep = config.sweep_config()?;
    let store = config.store_settings();

    if ctx.json_output {
        let value = serde_json::json!({
            "sweep": {
                "strategy": sweep.strategy,
                "workers": sweep.worker_count(),
                "batch_size": sweep.batch_size,
                "timeout_ms": sweep.timeout.map(|t| t.as_millis() as u64),
            },
            "store": store,
            "sources": loaded.applied_paths(),
            "warnings": loaded.warnings(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# Reclaim Configuration\n");

    let sources = loaded.applied_paths();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("Sweep:");
    println!("  strategy:   {}", sweep.strategy);
    match sweep.workers {
        Some(workers) => println!("  workers:    {}", workers),
        None => println!("  workers:    {} (available parallelism)", sweep.worker_count()),
    }
    println!("  batch_size: {}", sweep.batch_size);
    match sweep.timeout {
        Some(timeout) => println!("  timeout:    {} ms", timeout.as_millis()),
        None => println!("  timeout:    none"),
    }
    println!();

    println!("Store:");
    println!("  name:         {}", store.name);
    match store.max_inactive() {
        Some(max) => println!("  max_inactive: {} s", max.as_secs()),
        None => println!("  max_inactive: never expires"),
    }
    println!();

    let warnings = loaded.warnings();
    if !warnings.is_empty() {
        println!("Warnings:");
        for w in &warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

async fn cmd_which(ctx: &Context) -> Result<()> {
    let resolved = &ctx.config;

    if ctx.json_output {
        let layers: Vec<_> = resolved
            .layers
            .iter()
            .map(|layer| {
                let (status, detail) = match &layer.status {
                    LayerStatus::Missing => ("missing", None),
                    LayerStatus::Applied { .. } => ("applied", None),
                    LayerStatus::Rejected(reason) => ("rejected", Some(reason.as_str())),
                };
                serde_json::json!({
                    "layer": layer.kind.to_string(),
                    "path": layer.path,
                    "status": status,
                    "strategy": layer.strategy(),
                    "error": detail,
                })
            })
            .collect();
        let value = serde_json::json!({
            "layers": layers,
            "strategy": resolved.config.sweep_config()?.strategy,
            "strategy_from": resolved.strategy_origin().map(|l| l.kind.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Config layers (later overrides earlier):\n");
    for layer in &resolved.layers {
        let detail = match &layer.status {
            LayerStatus::Missing => "not found".to_string(),
            LayerStatus::Applied { strategy: Some(s) } => format!("applied, strategy = {s}"),
            LayerStatus::Applied { strategy: None } => "applied, strategy unset".to_string(),
            LayerStatus::Rejected(reason) => format!("rejected: {reason}"),
        };
        println!("  {:<8} {}  ({})", layer.kind, layer.path.display(), detail);
    }
    println!();

    let strategy = resolved.config.sweep_config()?.strategy;
    match resolved.strategy_origin() {
        Some(layer) => println!("Sweep strategy: {} (from {} config)", strategy, layer.kind),
        None => println!("Sweep strategy: {} (default)", strategy),
    }

    let applied = resolved.applied_paths().len();
    if applied == 0 {
        println!("No config files applied. Run 'reclaim config init' to create one.");
    } else {
        println!("{} config file(s) applied.", applied);
    }

    Ok(())
}

/// Where `init` writes and `path` points.
fn target_file(local: bool) -> Result<PathBuf> {
    if local {
        return Ok(PathBuf::from(PROJECT_CONFIG_FILE));
    }
    reclaim_config::user_config_file()
        .ok_or_else(|| anyhow::anyhow!("no user config directory on this platform; use --local"))
}

const STARTER_CONFIG: &str = r#"# Reclaim configuration

[sweep]
# "parallel" fans each pass out over a bounded worker pool,
# "sequential" runs it on the calling thread.
strategy = "parallel"
# workers = 8          # default: available parallelism
batch_size = 1024
# timeout_ms = 500     # soft timeout; unfinished sessions wait for the next pass

[store]
name = "ROOT"
max_inactive_secs = 1800

# [logging]
# directory = "/var/log/reclaim"
"#;

async fn cmd_init(local: bool) -> Result<()> {
    let path = target_file(local)?;
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, STARTER_CONFIG)?;
    println!("Created config file: {}", path.display());

    Ok(())
}
