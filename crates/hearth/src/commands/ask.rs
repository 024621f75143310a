//! Ask command, a one-shot request to the assistant.

use anyhow::Result;
use clap::Args;
use console::Style;
use hearth_agent::ConversationId;
use serde::Serialize;

use super::Context;

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The request to send, e.g. "turn off the desk lamp"
    #[arg(required = true)]
    pub prompt: String,

    /// Continue an existing conversation
    #[arg(short, long)]
    pub conversation: Option<String>,
}

/// Outcome for JSON output.
#[derive(Debug, Serialize)]
struct AskOutput {
    reply: String,
    conversation_id: String,
    tool_results: Vec<ToolResultOutput>,
}

#[derive(Debug, Serialize)]
struct ToolResultOutput {
    success: bool,
    content: String,
}

/// Run the ask command.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let conversation_id = args
        .conversation
        .as_deref()
        .map(str::parse::<ConversationId>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid conversation id: {}", e))?;

    let agent = ctx.agent()?;
    let outcome = agent.process(conversation_id, &args.prompt).await?;

    if ctx.json_output {
        let output = AskOutput {
            reply: outcome.reply,
            conversation_id: outcome.conversation_id.to_string(),
            tool_results: outcome
                .tool_results
                .iter()
                .map(|r| ToolResultOutput {
                    success: r.success,
                    content: r.content.clone(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if ctx.verbose {
        for result in &outcome.tool_results {
            let marker = if result.success { "done" } else { "failed" };
            println!("{}", dim.apply_to(format!("[{}] {}", marker, result.content)));
        }
    }
    println!("{}", outcome.reply);
    if ctx.verbose {
        println!(
            "{}",
            dim.apply_to(format!("conversation: {}", outcome.conversation_id))
        );
    }
    Ok(())
}
