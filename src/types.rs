//! Core data model: requests, results and the status sequence a submission
//! moves through.

use crate::error::GenerationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Art medium / style of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtStyle {
    Pencil,
    Charcoal,
    InkPen,
    Watercolor,
    Acrylic,
    Oil,
    Pastel,
    Gouache,
    Abstract,
    Realistic,
    Minimalist,
    LineArt,
    Silhouette,
    Sketch,
    Cartoon,
    DigitalArt,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 16] = [
        ArtStyle::Pencil,
        ArtStyle::Charcoal,
        ArtStyle::InkPen,
        ArtStyle::Watercolor,
        ArtStyle::Acrylic,
        ArtStyle::Oil,
        ArtStyle::Pastel,
        ArtStyle::Gouache,
        ArtStyle::Abstract,
        ArtStyle::Realistic,
        ArtStyle::Minimalist,
        ArtStyle::LineArt,
        ArtStyle::Silhouette,
        ArtStyle::Sketch,
        ArtStyle::Cartoon,
        ArtStyle::DigitalArt,
    ];

    /// Human-readable label, also used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            ArtStyle::Pencil => "Pencil",
            ArtStyle::Charcoal => "Charcoal",
            ArtStyle::InkPen => "Ink / Pen",
            ArtStyle::Watercolor => "Watercolor",
            ArtStyle::Acrylic => "Acrylic",
            ArtStyle::Oil => "Oil",
            ArtStyle::Pastel => "Pastel",
            ArtStyle::Gouache => "Gouache",
            ArtStyle::Abstract => "Abstract",
            ArtStyle::Realistic => "Realistic",
            ArtStyle::Minimalist => "Minimalist",
            ArtStyle::LineArt => "Line Art",
            ArtStyle::Silhouette => "Silhouette",
            ArtStyle::Sketch => "Sketch",
            ArtStyle::Cartoon => "Cartoon / Stylized",
            ArtStyle::DigitalArt => "Digital Art",
        }
    }

    /// Stable identifier used in cache keys, config and the CLI.
    pub fn slug(self) -> &'static str {
        match self {
            ArtStyle::Pencil => "pencil",
            ArtStyle::Charcoal => "charcoal",
            ArtStyle::InkPen => "ink_pen",
            ArtStyle::Watercolor => "watercolor",
            ArtStyle::Acrylic => "acrylic",
            ArtStyle::Oil => "oil",
            ArtStyle::Pastel => "pastel",
            ArtStyle::Gouache => "gouache",
            ArtStyle::Abstract => "abstract",
            ArtStyle::Realistic => "realistic",
            ArtStyle::Minimalist => "minimalist",
            ArtStyle::LineArt => "line_art",
            ArtStyle::Silhouette => "silhouette",
            ArtStyle::Sketch => "sketch",
            ArtStyle::Cartoon => "cartoon",
            ArtStyle::DigitalArt => "digital_art",
        }
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArtStyle {
    type Err = String;

    /// Accepts either the slug (`ink_pen`) or the label (`Ink / Pen`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ArtStyle::ALL
            .into_iter()
            .find(|style| style.slug() == wanted || style.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown art style: {}", s))
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Wide,
        AspectRatio::Portrait,
        AspectRatio::Tall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Wide => "16:9",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Tall => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == wanted)
            .ok_or_else(|| format!("Unsupported aspect ratio: {} (expected one of 1:1, 4:3, 16:9, 3:4, 9:16)", s))
    }
}

/// Binary image payload with its mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Reference image attached to an edit request.
pub type ReferenceImage = ImagePayload;

/// A user's creative request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub subject: String,
    pub style: ArtStyle,
    pub aspect_ratio: AspectRatio,
    pub reference: Option<ReferenceImage>,
}

impl GenerationRequest {
    pub fn new(subject: impl Into<String>, style: ArtStyle, aspect_ratio: AspectRatio) -> Self {
        Self {
            subject: subject.into(),
            style,
            aspect_ratio,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceImage) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Requests carrying a reference image are treated as novel every time.
    pub fn is_cache_eligible(&self) -> bool {
        self.reference.is_none()
    }
}

/// Generated image plus its content identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// BLAKE3 hex digest of `bytes`
    pub id: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let id = hex::encode(blake3::hash(&bytes).as_bytes());
        Self {
            id,
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn payload(&self) -> ImagePayload {
        ImagePayload::new(self.bytes.clone(), self.mime_type.clone())
    }
}

impl From<ImagePayload> for Artifact {
    fn from(payload: ImagePayload) -> Self {
        Artifact::new(payload.bytes, payload.mime_type)
    }
}

/// Painter's notes accompanying a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspiration {
    pub technique: String,
    pub palette: Vec<String>,
    pub mood: String,
    pub challenge: String,
}

impl Inspiration {
    pub const MIN_PALETTE: usize = 3;
    pub const MAX_PALETTE: usize = 5;

    /// Rejects blank fields and palettes outside 3..=5 colors.
    pub fn validate(&self) -> Result<(), GenerationError> {
        for (field, value) in [
            ("technique", &self.technique),
            ("mood", &self.mood),
            ("challenge", &self.challenge),
        ] {
            if value.trim().is_empty() {
                return Err(GenerationError::MalformedResult(format!(
                    "commentary field '{}' is empty",
                    field
                )));
            }
        }

        let count = self.palette.len();
        if !(Self::MIN_PALETTE..=Self::MAX_PALETTE).contains(&count) {
            return Err(GenerationError::MalformedResult(format!(
                "palette has {} colors, expected {}-{}",
                count,
                Self::MIN_PALETTE,
                Self::MAX_PALETTE
            )));
        }
        if self.palette.iter().any(|color| color.trim().is_empty()) {
            return Err(GenerationError::MalformedResult(
                "palette contains an empty color".to_string(),
            ));
        }

        Ok(())
    }
}

/// A completed study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub artifact: Artifact,
    /// Display subject (placeholder substituted when the request had none)
    pub subject: String,
    pub style: ArtStyle,
    pub aspect_ratio: AspectRatio,
    pub inspiration: Inspiration,
    pub created_at: DateTime<Utc>,
}

/// Orchestrator output: the result and whether it came from the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub result: GenerationResult,
    pub cache_hit: bool,
}

/// Status of a submission, in the order a successful one moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Idle,
    GeneratingIdea,
    LoadingImage,
    LoadingInspiration,
    Success,
    Error,
}

impl GenerationStatus {
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            GenerationStatus::GeneratingIdea
                | GenerationStatus::LoadingImage
                | GenerationStatus::LoadingInspiration
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Success | GenerationStatus::Error)
    }
}
