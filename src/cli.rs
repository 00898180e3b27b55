//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the studio.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, HistoryCommands, HistoryFormat};
pub use presentation::{
    format_history_entry_text, format_history_list_json, format_history_list_text,
    format_result_text, format_status_line, format_styles_text,
};
pub use route::RunContext;
