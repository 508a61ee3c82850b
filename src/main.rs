//! loopkit - interactive chat shell entry point.
//!
//! Reads user input line by line, runs one agent turn per line, and
//! prints the final answer. `--verbose` additionally prints every
//! intermediate tool call and result.

use std::io::Write;

use clap::Parser;
use loopkit::agent::{Agent, StepEntry};
use loopkit::config::Config;
use tokio::io::AsyncBufReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "loopkit", about = "A minimal tool-calling chat agent")]
struct Cli {
    /// Print intermediate tool calls and results
    #[arg(short, long)]
    verbose: bool,

    /// Override the model from configuration
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables win.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a missing credential aborts before any turn runs.
    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    info!("Loaded configuration: model={}", config.model);

    let agent = Agent::new(config)?;

    println!("{}", "═".repeat(60));
    println!("  loopkit agent  (type 'quit' to exit)");
    for (name, description) in agent.tools().list_tools() {
        println!("    {} - {}", name, description);
    }
    println!("{}", "═".repeat(60));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Goodbye!");
            break;
        }

        match agent.run_turn(input).await {
            Ok(outcome) => {
                if cli.verbose {
                    for step in &outcome.steps {
                        match step {
                            StepEntry::ToolCall { name, arguments } => {
                                println!("  -> {}({})", name, arguments);
                            }
                            StepEntry::ToolResult { name, text } => {
                                println!("  [{}]: {}", name, text);
                            }
                            StepEntry::Response { .. } => {}
                        }
                    }
                }
                println!("\n{}\n", outcome.text);
            }
            // A failed turn leaves no state behind; the next line starts
            // a fresh conversation.
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                eprintln!("Error: {}\n", e);
            }
        }
    }

    Ok(())
}
