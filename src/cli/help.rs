//! CLI help: stable command names for logs.

use crate::cli::parse::{Commands, HistoryCommands};

/// Dotted command name, e.g. `history.export`.
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::History { command } => match command {
            HistoryCommands::List { .. } => "history.list",
            HistoryCommands::Show { .. } => "history.show",
            HistoryCommands::Clear => "history.clear",
            HistoryCommands::Export { .. } => "history.export",
            HistoryCommands::Replay { .. } => "history.replay",
        },
        Commands::Styles => "styles",
    }
}
