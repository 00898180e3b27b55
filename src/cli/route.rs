//! CLI route: single route table and run context. Dispatches to the studio and presentation.

use crate::cache::ResultCache;
use crate::cli::help::command_name;
use crate::cli::parse::{Commands, HistoryCommands, HistoryFormat};
use crate::cli::presentation::{
    format_history_entry_text, format_history_list_json, format_history_list_text,
    format_result_text, format_status_line, format_styles_text,
};
use crate::config::{AtelierConfig, ConfigLoader};
use crate::error::{ApiError, GenerationError};
use crate::history::{HistoryStore, SledHistoryBackend};
use crate::orchestrator::Orchestrator;
use crate::provider::{GeminiClient, GenerationService};
use crate::retry::RetryPolicy;
use crate::studio::{write_study, StatusStream, StatusUpdate, Studio};
use crate::types::{ArtStyle, AspectRatio, GenerationRequest, ImagePayload};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and the studio session.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    studio: Studio,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let service: Arc<dyn GenerationService> = Arc::new(GeminiClient::new(&config.service)?);
        Self::with_service(workspace_root, &config, service)
    }

    /// Create run context around an already built generation service.
    pub fn with_service(
        workspace_root: PathBuf,
        config: &AtelierConfig,
        service: Arc<dyn GenerationService>,
    ) -> Result<Self, ApiError> {
        let store_path = resolve_path(&workspace_root, &config.history.store_path);
        std::fs::create_dir_all(&store_path)?;
        let backend = Arc::new(SledHistoryBackend::new(&store_path)?);
        let history = Arc::new(HistoryStore::open(backend, config.history.capacity));
        debug!(
            store_path = %store_path.display(),
            entries = history.len(),
            "Opened history store"
        );

        let orchestrator = Orchestrator::new(
            service,
            RetryPolicy::from(&config.retry),
            Arc::new(ResultCache::from(&config.cache)),
            history,
        );

        Ok(Self {
            studio: Studio::new(Arc::new(orchestrator)),
            workspace_root,
        })
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command).await;
        info!(
            command = name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                subject,
                style,
                aspect_ratio,
                reference,
                surprise,
                output,
            } => {
                self.handle_generate(
                    subject,
                    *style,
                    *aspect_ratio,
                    reference.as_deref(),
                    *surprise,
                    output.as_deref(),
                )
                .await
            }
            Commands::History { command } => self.handle_history_command(command).await,
            Commands::Styles => Ok(format_styles_text()),
        }
    }

    async fn handle_generate(
        &self,
        subject: &str,
        style: ArtStyle,
        aspect_ratio: AspectRatio,
        reference: Option<&Path>,
        surprise: bool,
        output: Option<&Path>,
    ) -> Result<String, ApiError> {
        let stream = if surprise {
            self.studio.surprise(style, aspect_ratio)
        } else {
            let mut request = GenerationRequest::new(subject, style, aspect_ratio);
            if let Some(path) = reference {
                request = request.with_reference(read_reference(path)?);
            }
            if request.subject.trim().is_empty() && request.reference.is_none() {
                return Err(GenerationError::InvalidRequest(
                    "a subject, a reference image, or --surprise is required".to_string(),
                )
                .into());
            }
            self.studio.submit(request)
        };
        self.await_study(stream, output).await
    }

    /// Follow a submission to its end, writing the image on success.
    async fn await_study(
        &self,
        mut stream: StatusStream,
        output: Option<&Path>,
    ) -> Result<String, ApiError> {
        while let Some(update) = stream.next_update().await {
            match update {
                StatusUpdate::Progress(status) => {
                    eprintln!("{}", format_status_line(status));
                }
                StatusUpdate::Completed { result, cache_hit } => {
                    let dir = output
                        .map(|dir| resolve_path(&self.workspace_root, dir))
                        .unwrap_or_else(|| self.workspace_root.clone());
                    let written = write_study(&result, &dir)?;
                    return Ok(format_result_text(&result, cache_hit, &written));
                }
                StatusUpdate::Failed { error, .. } => return Err(error.into()),
            }
        }
        Err(GenerationError::Superseded.into())
    }

    async fn handle_history_command(&self, command: &HistoryCommands) -> Result<String, ApiError> {
        match command {
            HistoryCommands::List { format } => {
                let entries = self.studio.history();
                match format {
                    HistoryFormat::Json => format_history_list_json(&entries).map_err(|e| {
                        ApiError::ConfigError(format!("Failed to encode history: {}", e))
                    }),
                    HistoryFormat::Text => Ok(format_history_list_text(&entries)),
                }
            }
            HistoryCommands::Show { index } => {
                let entry = self
                    .studio
                    .history()
                    .into_iter()
                    .nth(*index)
                    .ok_or(ApiError::HistoryEntryNotFound(*index))?;
                Ok(format_history_entry_text(*index, &entry))
            }
            HistoryCommands::Clear => {
                self.studio.clear_history();
                Ok("History cleared.".to_string())
            }
            HistoryCommands::Export { index, dir } => {
                let dir = dir
                    .as_deref()
                    .map(|dir| resolve_path(&self.workspace_root, dir))
                    .unwrap_or_else(|| self.workspace_root.clone());
                let path = self.studio.export(*index, &dir)?;
                Ok(format!("Exported to {}", path.display()))
            }
            HistoryCommands::Replay { index, output } => {
                let stream = self.studio.replay(*index)?;
                self.await_study(stream, output.as_deref()).await
            }
        }
    }
}

fn resolve_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

/// Load a reference image, taking the mime type from the file extension.
fn read_reference(path: &Path) -> Result<ImagePayload, ApiError> {
    let bytes = std::fs::read(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let mime_type = match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => {
            return Err(GenerationError::InvalidRequest(format!(
                "unsupported reference image type: {}",
                path.display()
            ))
            .into())
        }
    };
    Ok(ImagePayload::new(bytes, mime_type))
}
