//! Prompt constants and construction for module generation.

use crate::models::content::{EmployeeContext, ModuleOutline};

/// System prompt for all module-generation calls.
pub const EDUCATIONAL_SYSTEM: &str = "You are an expert educational content creator. \
    You write complete, engaging course material in markdown. \
    Start every section with a `## ` heading that repeats the requested \
    section title exactly. Do not add front matter, preambles, or closing \
    remarks outside the sections.";

/// CV-aware module prompt. Replace: {name}, {position}, {department},
/// {cv_summary}, {module_title}, {module_description}, {objectives},
/// {section_list}
const CV_AWARE_PROMPT_TEMPLATE: &str = r#"Create the full learning content for one module of a personalized course.

EMPLOYEE:
Name: {name}
Position: {position}
Department: {department}

CV SUMMARY:
{cv_summary}

MODULE:
Title: {module_title}
Description: {module_description}
Learning objectives:
{objectives}

Write one markdown section per entry below, in order. Start each section with
a `## ` heading repeating the section title exactly:
{section_list}

Tailor the tone, depth, and examples to this employee's background and
day-to-day work. Draw on their CV where it makes an example more concrete."#;

/// Role-based module prompt used when no CV data is available.
/// Replace: {role}, {module_title}, {module_description}, {objectives},
/// {section_list}
const GENERIC_PROMPT_TEMPLATE: &str = r#"Create the full learning content for one module of a course.

AUDIENCE: a {role} taking this course for professional development.

MODULE:
Title: {module_title}
Description: {module_description}
Learning objectives:
{objectives}

Write one markdown section per entry below, in order. Start each section with
a `## ` heading repeating the section title exactly:
{section_list}

Keep the material practical, with examples a {role} would recognize."#;

/// Default audience when neither the employee record nor the caller supplies
/// a role.
pub const DEFAULT_ROLE: &str = "professional";

/// Builds the per-module prompt. Returns the prompt text and whether CV data
/// was interpolated (recorded in the content metadata).
///
/// Serialization of a structured CV summary is the one fallible step; its
/// failure aborts the whole run rather than degrading a single module.
pub fn build_module_prompt(
    outline: &ModuleOutline,
    ctx: Option<&EmployeeContext>,
) -> Result<(String, bool), serde_json::Error> {
    let objectives = if outline.objectives.is_empty() {
        "- (none provided)".to_string()
    } else {
        outline
            .objectives
            .iter()
            .map(|o| format!("- {o}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let section_list = outline
        .sections
        .iter()
        .map(|s| {
            format!(
                "- {} ({}, {})",
                s.title,
                s.section_type.as_deref().unwrap_or("text"),
                s.duration.as_deref().unwrap_or("self-paced"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let description = outline.description.as_deref().unwrap_or("(no description)");

    if let Some(ctx) = ctx {
        if let Some(cv) = &ctx.cv_summary {
            let cv_text = match cv.as_str() {
                Some(s) => s.to_string(),
                None => serde_json::to_string_pretty(cv)?,
            };
            let prompt = CV_AWARE_PROMPT_TEMPLATE
                .replace("{name}", &ctx.name)
                .replace("{position}", ctx.position.as_deref().unwrap_or(DEFAULT_ROLE))
                .replace(
                    "{department}",
                    ctx.department.as_deref().unwrap_or("unspecified"),
                )
                .replace("{cv_summary}", &cv_text)
                .replace("{module_title}", &outline.title)
                .replace("{module_description}", description)
                .replace("{objectives}", &objectives)
                .replace("{section_list}", &section_list);
            return Ok((prompt, true));
        }
    }

    let role = ctx
        .and_then(|c| c.position.as_deref())
        .unwrap_or(DEFAULT_ROLE);

    let prompt = GENERIC_PROMPT_TEMPLATE
        .replace("{role}", role)
        .replace("{module_title}", &outline.title)
        .replace("{module_description}", description)
        .replace("{objectives}", &objectives)
        .replace("{section_list}", &section_list);
    Ok((prompt, false))
}
