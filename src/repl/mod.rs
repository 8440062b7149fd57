//! Interactive shopping conversation loop
//!
//! Thin terminal front end over `Assistant::handle_turn`. Rendering stays
//! plain: ranked result lines plus the active filter summary, with the
//! pipeline trace available behind `:trace`.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use uuid::Uuid;

use crate::assistant::{Assistant, TurnResponse};

/// Interactive REPL session over one conversation
pub struct ChatSession {
    assistant: Assistant,
    customer_id: Option<String>,
    session_id: String,
    show_trace: bool,
}

impl ChatSession {
    pub fn new(assistant: Assistant, customer_id: Option<String>) -> Self {
        Self {
            assistant,
            customer_id,
            session_id: Uuid::new_v4().to_string(),
            show_trace: false,
        }
    }

    /// Run the conversation loop until EOF or `:quit`
    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "PawBuddy - pet product search".bold());
        println!("Type a query, or :help for commands.\n");

        let mut editor = DefaultEditor::new()?;

        loop {
            match editor.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(line);

                    if let Some(command) = line.strip_prefix(':') {
                        if !self.handle_command(command).await {
                            break;
                        }
                        continue;
                    }

                    match self
                        .assistant
                        .handle_turn(&self.session_id, self.customer_id.as_deref(), line)
                        .await
                    {
                        Ok(response) => self.render(&response),
                        Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{} {}", "input error:".red().bold(), e);
                    break;
                }
            }
        }

        println!("bye!");
        Ok(())
    }

    /// Handle a `:command`; returns false to exit the loop
    async fn handle_command(&mut self, command: &str) -> bool {
        match command.trim() {
            "quit" | "q" | "exit" => return false,
            "reset" => {
                self.assistant.reset_session(&self.session_id).await;
                self.session_id = Uuid::new_v4().to_string();
                println!("{}", "conversation reset".yellow());
            }
            "trace" => {
                self.show_trace = !self.show_trace;
                println!(
                    "trace display {}",
                    if self.show_trace { "on".green() } else { "off".yellow() }
                );
            }
            "help" => {
                println!(":reset  forget this conversation");
                println!(":trace  toggle pipeline trace display");
                println!(":quit   exit");
            }
            other => println!("unknown command ':{}', try :help", other),
        }
        true
    }

    fn render(&self, response: &TurnResponse) {
        if response.degraded.extraction {
            println!(
                "{}",
                "(language service unavailable - interpreted by keywords only)".yellow()
            );
        }

        if response.degraded.retrieval {
            println!("{}", "search is unavailable right now, please retry".red());
        } else if response.results.is_empty() {
            println!("{}", "no products match the current filters".yellow());
        } else {
            for (i, product) in response.results.iter().enumerate() {
                let snap = &product.snapshot;
                println!(
                    "{} {} {} | {} | score {:.3}",
                    format!("{}.", i + 1).bold(),
                    snap.name.green(),
                    format!("${:.2}", snap.price).bold(),
                    snap.brand.as_deref().unwrap_or("-"),
                    product.score,
                );
            }
        }

        println!("{} {}", "filters:".blue().bold(), response.resolved_intent.summary());

        if self.show_trace {
            println!("{}", "trace:".blue().bold());
            println!("  tokens: {:?}", response.trace.normalized_tokens);
            println!("  partial: {:?}", response.trace.partial_intent);
            println!("  query text: {}", response.trace.query_text);
            println!(
                "  extract {}ms | retrieve {}ms | seeded: {}",
                response.trace.extract_ms, response.trace.retrieve_ms,
                response.trace.seeded_from_profile,
            );
        }
        println!();
    }
}
