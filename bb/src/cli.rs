//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// beepboop - picture-sentence-picture telephone between two models
#[derive(Debug, Parser)]
#[command(
    name = "beepboop",
    about = "A game of telephone between a text model and an image model",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new game
    Start {
        /// Opening sentence (generated by the text model when omitted)
        sentence: Option<String>,

        /// Art style for every image in this game
        #[arg(short, long)]
        style: Option<String>,

        /// Prompt used when describing images in this game
        #[arg(short = 'p', long)]
        describe_prompt: Option<String>,

        /// Directory to write the snapshot and images to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rounds to play after the opening sentence
        #[arg(short, long)]
        rounds: Option<u32>,
    },

    /// Continue a saved game; style and describe prompt come from the snapshot
    Continue {
        /// Snapshot file (game_<id>.json)
        file: PathBuf,

        /// Rounds to play
        #[arg(short, long)]
        rounds: Option<u32>,
    },

    /// Print the rounds of a saved game
    Show {
        /// Snapshot file (game_<id>.json)
        file: PathBuf,
    },

    /// Render a saved game as an HTML page
    Export {
        /// Snapshot file (game_<id>.json)
        file: PathBuf,

        /// Output HTML file (defaults to game_<id>.html next to the snapshot)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_options() {
        let cli = Cli::try_parse_from([
            "beepboop",
            "start",
            "A cat sleeps.",
            "--style",
            "watercolor",
            "--describe-prompt",
            "Be brief.",
            "--output",
            "games",
            "--rounds",
            "4",
        ])
        .unwrap();

        match cli.command {
            Command::Start {
                sentence,
                style,
                describe_prompt,
                output,
                rounds,
            } => {
                assert_eq!(sentence.as_deref(), Some("A cat sleeps."));
                assert_eq!(style.as_deref(), Some("watercolor"));
                assert_eq!(describe_prompt.as_deref(), Some("Be brief."));
                assert_eq!(output, Some(PathBuf::from("games")));
                assert_eq!(rounds, Some(4));
            }
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_start_without_sentence() {
        let cli = Cli::try_parse_from(["beepboop", "start"]).unwrap();
        assert!(matches!(cli.command, Command::Start { sentence: None, .. }));
    }

    #[test]
    fn test_continue_rejects_overrides() {
        assert!(Cli::try_parse_from(["beepboop", "continue", "game_x.json", "--style", "oil"]).is_err());
        assert!(Cli::try_parse_from(["beepboop", "continue", "game_x.json", "--describe-prompt", "x"]).is_err());

        let cli = Cli::try_parse_from(["beepboop", "continue", "game_x.json", "-r", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Continue { rounds: Some(2), .. }));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["beepboop", "show", "game_x.json", "-v", "-c", "my.yml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("my.yml")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["beepboop"]).is_err());
    }
}
