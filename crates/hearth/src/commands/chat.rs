//! Chat command, an interactive REPL over one conversation.

use anyhow::Result;
use clap::Args;
use console::Style;
use hearth_agent::{Agent, ConversationId};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use super::Context;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Resume an existing conversation
    #[arg(short, long)]
    pub conversation: Option<String>,
}

/// Run the chat command (REPL).
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let conversation_id = args
        .conversation
        .as_deref()
        .map(str::parse::<ConversationId>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid conversation id: {}", e))?;

    let agent = ctx.agent()?;
    let mut repl = Repl::new(agent, conversation_id, ctx.verbose)?;
    repl.run().await
}

/// REPL state.
struct Repl {
    agent: Agent,
    conversation_id: Option<ConversationId>,
    editor: Editor<(), DefaultHistory>,
    verbose: bool,
}

impl Repl {
    fn new(agent: Agent, conversation_id: Option<ConversationId>, verbose: bool) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();
        let editor = Editor::with_config(config)?;
        Ok(Self {
            agent,
            conversation_id,
            editor,
            verbose,
        })
    }

    async fn run(&mut self) -> Result<()> {
        let dim = Style::new().dim();
        println!("{}", dim.apply_to("Hearth chat. /new starts over, /id shows the conversation id, /quit exits."));

        loop {
            match self.editor.readline("hearth> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line {
                        "/quit" | "/exit" => break,
                        "/new" => {
                            self.conversation_id = None;
                            println!("{}", dim.apply_to("Started a new conversation."));
                            continue;
                        }
                        "/id" => {
                            match self.conversation_id {
                                Some(id) => println!("{}", id),
                                None => println!("{}", dim.apply_to("No conversation yet.")),
                            }
                            continue;
                        }
                        _ => {}
                    }
                    if let Err(e) = self.send(line).await {
                        let red = Style::new().red();
                        eprintln!("{} {}", red.apply_to("Error:"), e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", dim.apply_to("(Interrupted, /quit to exit)"));
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        let outcome = self.agent.process(self.conversation_id, line).await?;
        self.conversation_id = Some(outcome.conversation_id);

        if self.verbose {
            let dim = Style::new().dim();
            for result in &outcome.tool_results {
                let marker = if result.success { "done" } else { "failed" };
                println!("{}", dim.apply_to(format!("[{}] {}", marker, result.content)));
            }
        }
        println!("{}", outcome.reply);
        Ok(())
    }
}
