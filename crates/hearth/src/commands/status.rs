//! Status command, checks the model server and the home backend.

use anyhow::Result;
use clap::Args;
use console::{style, Style};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// List the models installed on the server
    #[arg(short, long)]
    pub models: bool,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    ollama_reachable: bool,
    model: String,
    models_installed: Option<Vec<String>>,
    home_reachable: bool,
    devices: usize,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let home = ctx.home()?;

    let models = backend.list_models().await.ok();
    let devices = home.device_states().await.ok();

    if ctx.json_output {
        let output = StatusOutput {
            ollama_reachable: models.is_some(),
            model: ctx.config.model().to_string(),
            models_installed: args
                .models
                .then(|| {
                    models
                        .as_ref()
                        .map(|m| m.iter().map(|i| i.name.clone()).collect())
                })
                .flatten(),
            home_reachable: devices.is_some(),
            devices: devices.as_ref().map(Vec::len).unwrap_or(0),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let red = Style::new().red();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Hearth Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    match &models {
        Some(installed) => {
            println!("  {} {}", dim.apply_to("Ollama:"), green.apply_to("● reachable"));
            println!("  {} {}", dim.apply_to("Model:"), ctx.config.model());
            if args.models {
                for model in installed {
                    println!("    {} {}", dim.apply_to("-"), model.name);
                }
            }
        }
        None => {
            println!("  {} {}", dim.apply_to("Ollama:"), red.apply_to("● unreachable"));
        }
    }

    println!();
    match &devices {
        Some(devices) => {
            println!("  {} {}", dim.apply_to("Home:"), green.apply_to("● reachable"));
            println!("  {} {}", dim.apply_to("Devices:"), devices.len());
        }
        None => {
            println!("  {} {}", dim.apply_to("Home:"), red.apply_to("● unreachable"));
        }
    }
    println!();
    Ok(())
}
