//! CLI adapter — interactive and single-message chat surface.
//!
//! Renders the transcript progressively: a spinner runs until the first
//! chunk of a turn lands, then text is appended to the terminal as the
//! accumulated reply grows. Errors surface as inline status lines and
//! the loop continues.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::agent::Agent;
use crate::chat::ChatOrchestrator;
use crate::ui;
use crate::Result;

/// Default greeting shown before the first turn.
const GREETING: &str = "Ohai!";

/// CLI chat surface over an orchestrated session.
pub struct ChatCli<A: Agent> {
    orchestrator: ChatOrchestrator<A>,
    user_label: String,
}

impl<A: Agent> ChatCli<A> {
    pub fn new(orchestrator: ChatOrchestrator<A>, user_label: impl Into<String>) -> Self {
        Self {
            orchestrator,
            user_label: user_label.into(),
        }
    }

    /// Run one turn, streaming the reply to the terminal.
    pub async fn run_turn(&mut self, input: &str) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message("thinking...");

        let label = "Amity".magenta().bold();
        let mut printed = 0usize;
        let mut started = false;

        let result = self
            .orchestrator
            .submit(input, |reply| {
                if !started {
                    spinner.finish_and_clear();
                    print!("\n{label}: ");
                    started = true;
                }
                print!("{}", &reply[printed..]);
                let _ = io::stdout().flush();
                printed = reply.len();
            })
            .await;

        spinner.finish_and_clear();

        result?;
        if !started {
            // The turn closed without any text chunks.
            print!("\n{label}: ");
        }
        println!("\n");
        Ok(())
    }

    /// Run the interactive REPL loop.
    pub async fn run_interactive(&mut self) -> Result<()> {
        if self.orchestrator.transcript().is_empty() {
            println!("\n{}: {}\n", "Amity".magenta().bold(), GREETING);
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}: ", self.user_label.blue().bold());
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "exit" | "quit" | "q" => {
                    println!("Take care! 👋");
                    break;
                }
                "logout" => {
                    let confirmed = inquire::Confirm::new("Sign out and clear this conversation?")
                        .with_default(false)
                        .prompt()
                        .unwrap_or(false);
                    if confirmed {
                        self.orchestrator.logout();
                        ui::print_success("Signed out.");
                        break;
                    }
                    continue;
                }
                _ => {}
            }

            if let Err(e) = self.run_turn(input).await {
                ui::print_error(&e.to_string());
            }
        }

        Ok(())
    }
}
