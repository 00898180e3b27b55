//! Generation Orchestrator
//!
//! Sequences one request: session cache, then the in-flight registry, then the
//! two-stage pipeline (image, then commentary on that image) under the retry
//! policy. Only a fully assembled result is ever cached, recorded in history,
//! or returned.

use crate::cache::{request_key, ResultCache};
use crate::error::GenerationError;
use crate::guard::{RequestToken, StaleResponseGuard};
use crate::history::{HistoryEntry, HistoryStore};
use crate::inflight::{Flight, GenerationOutcome, InFlightRegistry, Interest};
use crate::provider::GenerationService;
use crate::retry::RetryPolicy;
use crate::style::{compose_prompt, display_subject};
use crate::types::{Artifact, Generated, GenerationRequest, GenerationResult, GenerationStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Receives stage transitions of a pipeline.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: GenerationStatus);
}

/// State shared by every pipeline the orchestrator starts
#[derive(Clone)]
struct PipelineContext {
    service: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    cache: Arc<ResultCache>,
    history: Arc<HistoryStore>,
    guard: Arc<StaleResponseGuard>,
}

pub struct Orchestrator {
    ctx: PipelineContext,
    inflight: InFlightRegistry,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        cache: Arc<ResultCache>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            ctx: PipelineContext {
                service,
                retry,
                cache,
                history,
                guard: Arc::new(StaleResponseGuard::new()),
            },
            inflight: InFlightRegistry::new(),
        }
    }

    pub fn guard(&self) -> &Arc<StaleResponseGuard> {
        &self.ctx.guard
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.ctx.cache
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.ctx.history
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inflight
    }

    /// Generate a study. Never superseded: the result is always persisted.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Generated, GenerationError> {
        self.run(request, None, None).await
    }

    /// Generate on behalf of a submission holding `token`.
    ///
    /// Once a newer token is issued the result is dropped (no cache, history
    /// or status writes) and `Superseded` is returned.
    pub async fn generate_guarded(
        &self,
        request: GenerationRequest,
        token: RequestToken,
        observer: Option<Arc<dyn StatusObserver>>,
    ) -> Result<Generated, GenerationError> {
        let outcome = self.run(request, Some(token), observer).await;
        if !self.ctx.guard.is_current(token) {
            debug!(token = %token, "Dropping response for superseded request");
            return Err(GenerationError::Superseded);
        }
        outcome
    }

    async fn run(
        &self,
        request: GenerationRequest,
        token: Option<RequestToken>,
        observer: Option<Arc<dyn StatusObserver>>,
    ) -> Result<Generated, GenerationError> {
        let key = request_key(&request);

        if let Some(key) = key.as_deref() {
            if let Some(result) = self.ctx.cache.get(key) {
                info!(request_key = %key, "Cache hit");
                return Ok(Generated {
                    result,
                    cache_hit: true,
                });
            }
        }

        let outcome = match key {
            Some(key) => {
                let flight = self.flight(&key, &request, token, &observer);
                let joined = flight.joined;
                let outcome = flight.future.await;
                // A joined flight may have given up on its earlier callers
                // just before this caller registered.
                let still_wanted = token.map_or(true, |token| self.ctx.guard.is_current(token));
                if joined && still_wanted && matches!(outcome, Err(GenerationError::Superseded)) {
                    debug!(request_key = %key, "Joined flight was abandoned, starting a new one");
                    self.flight(&key, &request, token, &observer).future.await
                } else {
                    outcome
                }
            }
            None => {
                let interest = Arc::new(Interest::new());
                interest.register(token);
                run_pipeline(self.ctx.clone(), request, None, interest, observer).await
            }
        };

        outcome.map(|result| Generated {
            result,
            cache_hit: false,
        })
    }

    fn flight(
        &self,
        key: &str,
        request: &GenerationRequest,
        token: Option<RequestToken>,
        observer: &Option<Arc<dyn StatusObserver>>,
    ) -> Flight {
        let ctx = self.ctx.clone();
        let pipeline_observer = observer.clone();
        let pipeline_request = request.clone();
        let pipeline_key = key.to_string();
        let flight = self.inflight.get_or_create(key, token, move |interest| {
            run_pipeline(ctx, pipeline_request, Some(pipeline_key), interest, pipeline_observer)
        });
        if flight.joined {
            if let Some(observer) = observer {
                observer.on_status(GenerationStatus::LoadingImage);
            }
        }
        flight
    }
}

async fn run_pipeline(
    ctx: PipelineContext,
    request: GenerationRequest,
    key: Option<String>,
    interest: Arc<Interest>,
    observer: Option<Arc<dyn StatusObserver>>,
) -> GenerationOutcome {
    let started = Instant::now();
    let notify = |status: GenerationStatus| {
        if let Some(observer) = &observer {
            observer.on_status(status);
        }
    };

    let subject = display_subject(&request.subject, request.reference.is_some());
    let prompt = compose_prompt(&subject, request.style);
    let aspect_ratio = request.aspect_ratio;

    let service = ctx.service.as_ref();
    let style = request.style;

    notify(GenerationStatus::LoadingImage);
    let image = match &request.reference {
        Some(reference) => {
            let prompt = prompt.as_str();
            ctx.retry
                .run("edit_image", move || service.edit_image(reference, prompt, aspect_ratio))
                .await?
        }
        None => {
            let prompt = prompt.as_str();
            ctx.retry
                .run("synthesize_image", move || service.synthesize_image(prompt, aspect_ratio))
                .await?
        }
    };
    debug!(subject = %subject, bytes = image.bytes.len(), "Image stage complete");

    if !interest.is_live(&ctx.guard) {
        debug!(subject = %subject, "Request superseded after image stage");
        return Err(GenerationError::Superseded);
    }

    notify(GenerationStatus::LoadingInspiration);
    let inspiration = {
        let image = &image;
        let subject = subject.as_str();
        ctx.retry
            .run("synthesize_commentary", move || async move {
                let inspiration = service.synthesize_commentary(image, subject, style).await?;
                inspiration.validate()?;
                Ok(inspiration)
            })
            .await?
    };

    if !interest.is_live(&ctx.guard) {
        debug!(subject = %subject, "Request superseded after commentary stage");
        return Err(GenerationError::Superseded);
    }

    let result = GenerationResult {
        artifact: Artifact::from(image),
        subject,
        style,
        aspect_ratio,
        inspiration,
        created_at: Utc::now(),
    };

    if let Some(key) = &key {
        ctx.cache.put(key.clone(), result.clone());
    }
    ctx.history.append(HistoryEntry::new(result.clone(), &request));

    info!(
        artifact_id = %result.artifact.id,
        style = %result.style,
        cached = key.is_some(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Generation complete"
    );
    Ok(result)
}
