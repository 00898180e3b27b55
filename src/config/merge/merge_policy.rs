//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only the values later sources commonly override partially are seeded here;
/// everything else falls back to the serde defaults of each section.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    let history_path = crate::config::default_history_path();
    Config::builder()
        .set_default("retry.max_retries", 3)?
        .set_default("retry.initial_delay_ms", 1000)?
        .set_default("history.capacity", 15)?
        .set_default(
            "history.store_path",
            history_path.to_string_lossy().to_string(),
        )
}
