//! Style catalog: prompt modifiers per medium, placeholder subjects, and the
//! "surprise me" subject list.

use crate::types::ArtStyle;
use rand::seq::SliceRandom;

/// Subject used when the request has a reference image but no text.
pub const REFERENCE_PLACEHOLDER_SUBJECT: &str = "Re-imagined Study";

/// Subject used when the request has neither text nor a reference image.
pub const GENESIS_PLACEHOLDER_SUBJECT: &str = "Creative Genesis";

pub const DEFAULT_SUBJECTS: [&str; 7] = [
    "A thoughtful elderly sailor with a weathered face",
    "A young woman with flowers woven into her hair",
    "A mysterious traveler in a wide-brimmed hat",
    "A child laughing in a rain-drenched street",
    "A portrait of a ballet dancer in mid-motion",
    "A jazz musician lost in their saxophone solo",
    "A scholar surrounded by ancient manuscripts",
];

/// Prompt modifiers describing the look of each medium.
pub fn style_modifiers(style: ArtStyle) -> &'static str {
    match style {
        ArtStyle::Watercolor => "soft watercolor painting, heavy paper texture, delicate washes, translucent layering, artistic bleeds, high quality, ethereal lighting, loose brushwork",
        ArtStyle::Oil => "thick oil painting, impasto technique, visible heavy brushstrokes, rich textures, deep dramatic colors, classic masterpiece style, canvas texture, oil on canvas",
        ArtStyle::Acrylic => "vibrant acrylic painting, bold colors, clean edges, modern art style, smooth gradients, satin finish, layered pigments",
        ArtStyle::Pencil => "detailed pencil sketch, professional graphite shading, cross-hatching, fine lines, white paper background, hand-drawn look, realistic sketching",
        ArtStyle::Silhouette => "minimalist silhouette art, high contrast, solid black figure, atmospheric single-color background, clean sharp edges, graphic vector style",
        ArtStyle::Charcoal => "expressive charcoal drawing, smudged tonal values, deep blacks, textured toothy paper, dramatic chiaroscuro, gestural marks",
        ArtStyle::InkPen => "fine ink pen illustration, precise linework, stippling and hatching, high contrast black ink on white paper",
        ArtStyle::Pastel => "soft pastel drawing, powdery texture, blended chalky colors, tinted paper, gentle luminous highlights",
        ArtStyle::Gouache => "opaque gouache painting, flat matte color fields, crisp shapes, illustrative style, visible brush texture",
        ArtStyle::Abstract => "abstract expressive painting, bold geometric and organic shapes, dynamic composition, energetic color interplay",
        ArtStyle::Realistic => "photorealistic painting, lifelike detail, accurate anatomy, natural lighting, subtle skin tones, fine rendering",
        ArtStyle::Minimalist => "minimalist artwork, limited palette, generous negative space, simple forms, calm balanced composition",
        ArtStyle::LineArt => "clean continuous line art, single weight contour lines, no shading, elegant flowing strokes, white background",
        ArtStyle::Sketch => "loose gestural sketch, quick confident strokes, construction lines visible, sketchbook page texture",
        ArtStyle::Cartoon => "stylized cartoon illustration, exaggerated features, bold outlines, cel shading, playful vibrant colors",
        ArtStyle::DigitalArt => "polished digital painting, smooth rendering, cinematic lighting, rich saturated colors, concept art quality",
    }
}

/// Subject to display and prompt with. Never empty.
pub fn display_subject(subject: &str, has_reference: bool) -> String {
    let trimmed = subject.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    if has_reference {
        REFERENCE_PLACEHOLDER_SUBJECT.to_string()
    } else {
        GENESIS_PLACEHOLDER_SUBJECT.to_string()
    }
}

/// `"{subject}, {modifiers}"`
pub fn compose_prompt(subject: &str, style: ArtStyle) -> String {
    format!("{}, {}", subject, style_modifiers(style))
}

/// Pick a subject for "surprise me".
pub fn random_subject() -> &'static str {
    DEFAULT_SUBJECTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_SUBJECTS[0])
}
