use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::{Context, Result};
use buddhi_core::{Config, HttpEndpoint, RevealStep, Session};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "buddhi")]
#[command(version, about = "Chat with BuddhiAI from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// URL of the AI endpoint (POST {"question"} -> {"reply"})
    #[arg(long, env = "BUDDHI_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Delay between revealed characters, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Give up on the endpoint after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer (Ctrl-C stops the typing)
    Ask {
        /// Your question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("{}: {:#}", "Logging disabled".yellow(), e);
    }

    let file_config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        eprintln!("{}: {:#}", "Config ignored, using defaults".yellow(), e);
        Config::new()
    });
    let config = file_config.merge(cli.endpoint, cli.delay_ms, cli.timeout_secs);

    if cli.save_config {
        let path = config.save()?;
        println!("Saved configuration to {}", path.display().to_string().bold());
        return Ok(());
    }

    match cli.command {
        Some(Commands::Ask { question }) => ask_once(&config, &question.join(" ")).await,
        None => run_tui(&config).await,
    }
}

/// Log to a file; stderr belongs to the terminal UI
fn init_logging() -> Result<()> {
    let log_path = Config::log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

async fn run_tui(config: &Config) -> Result<()> {
    let endpoint = HttpEndpoint::new(config.endpoint_url(), config.request_timeout())?;
    tracing::info!(endpoint = %endpoint.url(), "starting terminal UI");

    let mut app = App::new(endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(config.reveal_delay());

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    let tx = events.sender();
    let mut dirty = true;

    while !app.should_quit {
        if dirty {
            terminal.draw(|frame| ui::render(app, frame))?;
        }

        dirty = match events.next().await {
            Some(event) => handler::handle_event(app, event, &tx),
            None => break,
        };
    }

    Ok(())
}

async fn ask_once(config: &Config, question: &str) -> Result<()> {
    let endpoint = HttpEndpoint::new(config.endpoint_url(), config.request_timeout())?;
    let mut session = Session::new();

    println!("{} {}", "You:".bold().cyan(), question);

    if session.ask(&endpoint, question).await?.is_none() {
        println!("{}", "Nothing to ask.".yellow());
        return Ok(());
    }

    // Ctrl-C stops the typing but keeps what was shown
    if let Some(stop) = session.stop_handle() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.raise();
            }
        });
    }

    print!("{} ", "AI:".bold().yellow());
    io::stdout().flush()?;

    let done = session
        .reveal_paced(config.reveal_delay(), |_, step| {
            if let RevealStep::Advanced(c) = step {
                print!("{}", c);
                let _ = io::stdout().flush();
            }
        })
        .await;

    match done {
        Some(done) => {
            println!();
            if done.cancelled {
                println!("{}", "(stopped)".dimmed());
            }
        }
        None => {
            // The exchange ended without a reveal: the endpoint failed
            if let Some(last) = session.messages().last() {
                println!("{}", last.text.red());
            }
            anyhow::bail!("no answer from the endpoint at {}", endpoint.url());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(endpoint: &str) -> Config {
        Config::new().merge(Some(endpoint.to_string()), Some(0), Some(1))
    }

    #[tokio::test]
    async fn test_ask_fails_when_endpoint_is_down() {
        // Nothing listens on the discard port
        let err = ask_once(&config_for("http://127.0.0.1:9/api/gemini"), "Hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("127.0.0.1:9"));
    }

    #[tokio::test]
    async fn test_ask_with_blank_question_is_not_an_error() {
        assert!(ask_once(&config_for("http://127.0.0.1:9/api/gemini"), "   ")
            .await
            .is_ok());
    }
}
