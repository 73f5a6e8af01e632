//! beepboop - picture-sentence-picture telephone
//!
//! CLI entry point for starting, continuing, showing and exporting games.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use beepboop::cli::{Cli, Command};
use beepboop::config::Config;
use beepboop::export;
use beepboop::game::{GameSession, RoundEntry, RoundKind, RoundLedger, SessionSettings};
use beepboop::generate::Players;
use beepboop::snapshot::{self, Snapshot};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beepboop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("beepboop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Start {
            sentence,
            style,
            describe_prompt,
            output,
            rounds,
        } => {
            let settings = SessionSettings { style, describe_prompt };
            cmd_start(&config, sentence, settings, output, rounds).await
        }
        Command::Continue { file, rounds } => cmd_continue(&config, &file, rounds).await,
        Command::Show { file } => cmd_show(&file),
        Command::Export { file, out } => cmd_export(&file, out.as_deref()),
    }
}

fn build_players(config: &Config) -> Result<Players> {
    config.validate()?;
    if config.image.get_api_key().is_err() {
        println!(
            "{} {} is not set, images will be placeholder images",
            "!".yellow(),
            config.image.api_key_env
        );
    }
    Players::from_config(&config.text, &config.image).context("Failed to create generators")
}

async fn cmd_start(
    config: &Config,
    sentence: Option<String>,
    settings: SessionSettings,
    output: Option<PathBuf>,
    rounds: Option<u32>,
) -> Result<()> {
    debug!(?sentence, ?settings, ?output, ?rounds, "cmd_start: called");
    let players = build_players(config)?;

    let sentence = match sentence.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(sentence) => sentence,
        None => {
            println!("{}", "Generating an opening sentence...".dimmed());
            players
                .describer
                .initial_sentence()
                .await
                .context("Failed to generate an opening sentence")?
        }
    };

    let output_dir = output.unwrap_or_else(|| config.game.output_dir.clone());
    let mut session = GameSession::new(output_dir, settings, players);
    println!("{} {}", "Game:".bold(), session.id().to_string().cyan());
    if let Some(style) = session.style() {
        println!("{} {}", "Style:".bold(), style);
    }

    let entry = session.start(sentence)?.clone();
    print_round(&entry);

    play_rounds(&mut session, rounds.unwrap_or(config.game.rounds)).await
}

async fn cmd_continue(config: &Config, file: &Path, rounds: Option<u32>) -> Result<()> {
    debug!(file = %file.display(), ?rounds, "cmd_continue: called");
    let players = build_players(config)?;
    let mut session = GameSession::resume(file, players)?;

    println!(
        "{} {} ({} rounds so far)",
        "Continuing game:".bold(),
        session.id().to_string().cyan(),
        session.ledger().len()
    );
    if let Some(style) = session.style() {
        println!("{} {}", "Style:".bold(), style);
    }

    play_rounds(&mut session, rounds.unwrap_or(config.game.rounds)).await
}

async fn play_rounds(session: &mut GameSession, rounds: u32) -> Result<()> {
    debug!(session_id = %session.id(), rounds, "play_rounds: called");
    for _ in 0..rounds {
        let entry = match session.advance().await.cloned() {
            Ok(entry) => entry,
            Err(e) => {
                match session.saved_rounds() {
                    0 => println!("{} game could not be saved", "✗".red()),
                    saved => println!(
                        "{} game saved up to round {} in {}",
                        "✗".red(),
                        saved,
                        session.snapshot_path().display()
                    ),
                }
                return Err(e.into());
            }
        };
        print_round(&entry);
    }

    println!();
    print_summary(session.ledger());
    println!(
        "{} Saved to {}",
        "✓".green(),
        session.snapshot_path().display().to_string().cyan()
    );
    Ok(())
}

fn cmd_show(file: &Path) -> Result<()> {
    debug!(file = %file.display(), "cmd_show: called");
    let snapshot = snapshot::load(file)?;
    print_header(&snapshot);
    for entry in snapshot.entries.entries() {
        print_round(entry);
    }
    println!();
    print_summary(&snapshot.entries);
    Ok(())
}

fn cmd_export(file: &Path, out: Option<&Path>) -> Result<()> {
    debug!(file = %file.display(), ?out, "cmd_export: called");
    let path = export::export(file, out)?;
    println!("{} Exported to {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}

fn print_header(snapshot: &Snapshot) {
    println!("{} {}", "Game:".bold(), snapshot.session_id.to_string().cyan());
    if let Some(style) = &snapshot.style {
        println!("{} {}", "Style:".bold(), style);
    }
    if let Some(prompt) = &snapshot.describe_prompt {
        println!("{} {}", "Describe prompt:".bold(), prompt);
    }
    println!("{} {}", "Rounds:".bold(), snapshot.entries.len());
}

fn print_round(entry: &RoundEntry) {
    let label = format!("Round {}", entry.round_number).bold();
    match entry.kind {
        RoundKind::Text => println!("{} {}", label, entry.content),
        RoundKind::Image => println!("{} {}", label, entry.content.yellow()),
    }
}

fn print_summary(ledger: &RoundLedger) {
    let mut sentences = ledger.entries().iter().filter(|e| e.kind == RoundKind::Text);
    let first = sentences.next();
    let last = sentences.next_back().or(first);
    if let (Some(first), Some(last)) = (first, last) {
        println!("{} {}", "Started with:".bold(), first.content);
        println!("{} {}", "Ended with:".bold(), last.content);
    }
}
