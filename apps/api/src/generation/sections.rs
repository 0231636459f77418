//! Heading-based matching of raw model output to the requested outline.
//!
//! The model is asked to emit one `## ` heading per section, but its output
//! regularly diverges from the outline. Matching is three-tier: title match,
//! then positional match, then a synthesized placeholder — so every outline
//! section yields exactly one generated section no matter what came back.

use uuid::Uuid;

use crate::models::content::{GeneratedSection, OutlineSection};

/// Splits raw model output on `## ` heading markers.
///
/// Index 0 is the preamble (whatever precedes the first heading, possibly
/// empty); every later element is one heading's title plus body, without the
/// leading marker.
fn split_heading_parts(raw: &str) -> Vec<String> {
    let mut parts: Vec<String> = vec![String::new()];

    for line in raw.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            parts.push(heading.to_string());
        } else {
            let current = parts.last_mut().expect("parts is never empty");
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    parts
}

fn synthesize_body(title: &str) -> String {
    format!(
        "## {title}\n\nThis section introduces {title} and walks through the key \
        concepts, practical examples, and exercises you need to apply it in your \
        day-to-day work."
    )
}

/// Builds the placeholder section used when the model produced nothing usable
/// for an outline entry (and for whole-module fallbacks).
pub fn synthesized_section(outline: &OutlineSection, order_index: i32) -> GeneratedSection {
    GeneratedSection {
        id: Uuid::new_v4(),
        title: outline.title.clone(),
        content: synthesize_body(&outline.title),
        content_type: outline
            .section_type
            .clone()
            .unwrap_or_else(|| "text".to_string()),
        order_index,
        duration: outline.duration.clone(),
    }
}

/// Maps raw model output onto the outline sections.
///
/// Per section: case-insensitive substring title match over the heading parts
/// (matched part used verbatim, re-prefixed with the marker); else the i-th
/// section takes part i+1 (part 0 is preamble); else a synthesized placeholder.
pub fn match_sections(raw: &str, sections: &[OutlineSection]) -> Vec<GeneratedSection> {
    let parts = split_heading_parts(raw);

    sections
        .iter()
        .enumerate()
        .map(|(i, outline)| {
            let order_index = i as i32;
            let title_lower = outline.title.to_lowercase();

            let by_title = parts
                .iter()
                .skip(1)
                .find(|p| p.to_lowercase().contains(&title_lower));

            let content = match by_title.or_else(|| parts.get(i + 1)) {
                Some(part) => format!("## {}", part.trim()),
                None => {
                    return synthesized_section(outline, order_index);
                }
            };

            GeneratedSection {
                id: Uuid::new_v4(),
                title: outline.title.clone(),
                content,
                content_type: outline
                    .section_type
                    .clone()
                    .unwrap_or_else(|| "text".to_string()),
                order_index,
                duration: outline.duration.clone(),
            }
        })
        .collect()
}
