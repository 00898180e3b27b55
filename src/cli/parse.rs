//! CLI parse: clap types for Atelier. No behavior; definitions only.

use crate::types::{ArtStyle, AspectRatio};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Atelier CLI - studies and painter's notes from a generative model
#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Generate art studies with painter's notes, with a local gallery of recent work")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a study and its painter's notes
    Generate {
        /// What to paint (may be empty when a reference image is given)
        #[arg(default_value = "")]
        subject: String,

        /// Art style, by slug or label (see `atelier styles`)
        #[arg(long, default_value = "oil")]
        style: ArtStyle,

        /// Aspect ratio (1:1, 4:3, 16:9, 3:4, 9:16)
        #[arg(long, default_value = "1:1")]
        aspect_ratio: AspectRatio,

        /// Reference image to re-imagine instead of painting from text
        #[arg(long, conflicts_with = "surprise")]
        reference: Option<PathBuf>,

        /// Let the studio pick the subject
        #[arg(long)]
        surprise: bool,

        /// Directory the image is written to (default: workspace root)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Browse the gallery of recent studies
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// List available art styles
    Styles,
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recent studies, newest first
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = HistoryFormat::Text)]
        format: HistoryFormat,
    },
    /// Show one study's painter's notes
    Show {
        /// Position in the gallery (0 is newest)
        index: usize,
    },
    /// Remove every study from the gallery
    Clear,
    /// Write a study's image to a directory
    Export {
        /// Position in the gallery (0 is newest)
        index: usize,

        /// Target directory (default: workspace root)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Generate again with a study's subject, style and aspect ratio
    Replay {
        /// Position in the gallery (0 is newest)
        index: usize,

        /// Directory the image is written to (default: workspace root)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Rendering for `history list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HistoryFormat {
    Text,
    Json,
}
