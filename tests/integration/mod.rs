//! Integration tests for the Atelier generation studio

mod cli_commands;
mod history_store;
mod orchestrator;
mod retry_policy;
