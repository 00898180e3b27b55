//! Gemini client
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`).
//! Images travel as inline base64 parts in both directions; commentary is
//! requested as JSON against a response schema.

use crate::error::GenerationError;
use crate::provider::{GenerationService, ServiceConfig};
use crate::types::{ArtStyle, AspectRatio, ImagePayload, Inspiration};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// `finishReason` values that mean the output was withheld on policy grounds.
const BLOCKING_FINISH_REASONS: [&str; 6] = [
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
];

// Helper function to map transport errors to GenerationError
fn map_http_error(error: reqwest::Error) -> GenerationError {
    if let Some(status) = error.status() {
        status_error(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        GenerationError::Remote(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::Remote(format!("Connection error: {}", error))
    } else {
        GenerationError::Remote(format!("HTTP error: {}", error))
    }
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn status_error(status: u16, body: &str) -> GenerationError {
    match status {
        400..=499 => GenerationError::ClientError {
            status,
            message: body.to_string(),
        },
        _ => GenerationError::Remote(format!("Request failed with status {}: {}", status, body)),
    }
}

/// Gemini-backed [`GenerationService`]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    image_model: String,
    commentary_model: String,
}

impl GeminiClient {
    /// Build a client. A missing API key is reported on first use, not here,
    /// so history commands work without credentials.
    pub fn new(config: &ServiceConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                GenerationError::ServiceNotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            image_model: config.image_model.clone(),
            commentary_model: config.commentary_model.clone(),
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::ServiceNotConfigured(
                "set service.api_key or GEMINI_API_KEY".to_string(),
            )
        })?;

        let url = self.endpoint_for_model(model);
        debug!(model, url = %url, "Calling generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(payload)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        let body: Value = response.json().await.map_err(|e| {
            GenerationError::MalformedResult(format!("Failed to parse response: {}", e))
        })?;
        check_blocked(&body)?;
        Ok(body)
    }
}

fn inline_image_part(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": BASE64.encode(&image.bytes),
        }
    })
}

fn image_request(parts: Vec<Value>, aspect_ratio: AspectRatio) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio.as_str() },
        },
    })
}

pub(crate) fn commentary_request(image: &ImagePayload, subject: &str, style: ArtStyle) -> Value {
    let instruction = format!(
        "Analyze this portrait subject: \"{}\" created in \"{}\" style. \
         Provide artistic inspiration notes for a painter.",
        subject,
        style.label()
    );
    json!({
        "contents": [{
            "role": "user",
            "parts": [inline_image_part(image), { "text": instruction }],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "technique": {
                        "type": "STRING",
                        "description": format!("A specific technique related to {} to try.", style.label()),
                    },
                    "palette": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "A list of 3-5 pigment names or color descriptions.",
                    },
                    "mood": { "type": "STRING", "description": "The emotional tone of the piece." },
                    "challenge": { "type": "STRING", "description": "A creative challenge for the artist." },
                },
                "required": ["technique", "palette", "mood", "challenge"],
            },
        },
    })
}

/// Surface prompt blocks and policy-withheld candidates as moderation failures.
pub(crate) fn check_blocked(body: &Value) -> Result<(), GenerationError> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(GenerationError::ModeratedContent(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let first_reason = body
        .pointer("/candidates/0/finishReason")
        .and_then(Value::as_str);
    if let Some(reason) = first_reason {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(GenerationError::ModeratedContent(format!(
                "candidate withheld: {}",
                reason
            )));
        }
    }
    Ok(())
}

fn candidate_parts(body: &Value) -> Vec<Value> {
    body.get("candidates")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.pointer("/content/parts").and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect()
}

/// First inline image in the response.
pub(crate) fn extract_image(body: &Value) -> Result<ImagePayload, GenerationError> {
    for part in candidate_parts(body) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
            GenerationError::MalformedResult(format!("image base64 decode failed: {}", e))
        })?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        return Ok(ImagePayload::new(bytes, mime_type));
    }

    Err(GenerationError::MalformedResult(
        "No image data returned from generation service".to_string(),
    ))
}

#[derive(Deserialize)]
struct CommentaryPayload {
    technique: Option<String>,
    palette: Option<Vec<String>>,
    mood: Option<String>,
    challenge: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, GenerationError> {
    value.ok_or_else(|| {
        GenerationError::MalformedResult(format!("commentary is missing '{}'", field))
    })
}

/// Parse the JSON commentary text returned by the commentary model.
pub(crate) fn extract_inspiration(body: &Value) -> Result<Inspiration, GenerationError> {
    let text: String = candidate_parts(body)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResult(
            "No commentary text returned from generation service".to_string(),
        ));
    }

    let payload: CommentaryPayload = serde_json::from_str(text.trim()).map_err(|e| {
        GenerationError::MalformedResult(format!("commentary is not valid JSON: {}", e))
    })?;

    let inspiration = Inspiration {
        technique: required(payload.technique, "technique")?,
        palette: required(payload.palette, "palette")?,
        mood: required(payload.mood, "mood")?,
        challenge: required(payload.challenge, "challenge")?,
    };
    inspiration.validate()?;
    Ok(inspiration)
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn synthesize_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError> {
        let payload = image_request(vec![json!({ "text": prompt })], aspect_ratio);
        let body = self.generate_content(&self.image_model, &payload).await?;
        extract_image(&body)
    }

    async fn edit_image(
        &self,
        reference: &ImagePayload,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError> {
        let payload = image_request(
            vec![inline_image_part(reference), json!({ "text": prompt })],
            aspect_ratio,
        );
        let body = self.generate_content(&self.image_model, &payload).await?;
        extract_image(&body)
    }

    async fn synthesize_commentary(
        &self,
        image: &ImagePayload,
        subject: &str,
        style: ArtStyle,
    ) -> Result<Inspiration, GenerationError> {
        let payload = commentary_request(image, subject, style);
        let body = self.generate_content(&self.commentary_model, &payload).await?;
        extract_inspiration(&body)
    }
}
