//! CLI presentation: text and json formatters per command family.

use crate::history::HistoryEntry;
use crate::types::{ArtStyle, GenerationResult, GenerationStatus};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// One progress line for a pipeline stage.
pub fn format_status_line(status: GenerationStatus) -> String {
    let text = match status {
        GenerationStatus::Idle => "Waiting",
        GenerationStatus::GeneratingIdea => "Dreaming up a subject...",
        GenerationStatus::LoadingImage => "Painting...",
        GenerationStatus::LoadingInspiration => "Writing painter's notes...",
        GenerationStatus::Success => "Done",
        GenerationStatus::Error => "Failed",
    };
    format!("{}", text.dimmed())
}

fn format_inspiration(out: &mut String, result: &GenerationResult) {
    let inspiration = &result.inspiration;
    out.push_str(&format!("{}\n", format_section_heading("Painter's notes")));
    out.push_str(&format!("  Technique: {}\n", inspiration.technique));
    out.push_str(&format!("  Palette:   {}\n", inspiration.palette.join(", ")));
    out.push_str(&format!("  Mood:      {}\n", inspiration.mood));
    out.push_str(&format!("  Challenge: {}\n", inspiration.challenge));
}

/// Freshly generated (or cached) study.
pub fn format_result_text(result: &GenerationResult, cache_hit: bool, written: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("{} ({})", result.subject, result.style))
    ));
    out.push_str(&format!("  Aspect:   {}\n", result.aspect_ratio));
    out.push_str(&format!("  Artifact: {}\n", short_id(&result.artifact.id)));
    out.push_str(&format!("  Saved to: {}\n", written.display().green()));
    if cache_hit {
        out.push_str(&format!("  {}\n", "(from session cache)".dimmed()));
    }
    out.push('\n');
    format_inspiration(&mut out, result);
    out
}

pub fn format_history_list_text(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "The gallery is empty.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Subject", "Style", "Aspect", "Created", "Artifact"]);
    for (index, entry) in entries.iter().enumerate() {
        let result = &entry.result;
        table.add_row(vec![
            index.to_string(),
            result.subject.clone(),
            result.style.label().to_string(),
            result.aspect_ratio.to_string(),
            result.created_at.format("%Y-%m-%d %H:%M").to_string(),
            short_id(&result.artifact.id).to_string(),
        ]);
    }
    format!("{}\n\n{}", format_section_heading("Gallery"), table)
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    index: usize,
    subject: &'a str,
    style: ArtStyle,
    aspect_ratio: String,
    created_at: String,
    artifact_id: &'a str,
    mime_type: &'a str,
}

pub fn format_history_list_json(entries: &[HistoryEntry]) -> Result<String, serde_json::Error> {
    let rows: Vec<HistoryRow<'_>> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| HistoryRow {
            index,
            subject: &entry.result.subject,
            style: entry.result.style,
            aspect_ratio: entry.result.aspect_ratio.to_string(),
            created_at: entry.result.created_at.to_rfc3339(),
            artifact_id: &entry.result.artifact.id,
            mime_type: &entry.result.artifact.mime_type,
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

pub fn format_history_entry_text(index: usize, entry: &HistoryEntry) -> String {
    let result = &entry.result;
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("#{} {} ({})", index, result.subject, result.style))
    ));
    out.push_str(&format!("  Aspect:   {}\n", result.aspect_ratio));
    out.push_str(&format!("  Created:  {}\n", result.created_at.to_rfc3339()));
    out.push_str(&format!("  Artifact: {}\n", result.artifact.id));
    if entry.had_reference {
        out.push_str("  Source:   reference image\n");
    }
    out.push('\n');
    format_inspiration(&mut out, result);
    out
}

pub fn format_styles_text() -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Slug", "Style"]);
    for style in ArtStyle::ALL {
        table.add_row(vec![style.slug(), style.label()]);
    }
    table.to_string()
}
