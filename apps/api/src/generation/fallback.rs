//! Templated content used when the model cannot be called (or failed for a
//! single module): outline-derived fallback modules, a default outline for
//! courses without one, and the fully mocked course document.

use chrono::Utc;
use uuid::Uuid;

use crate::generation::sections::synthesized_section;
use crate::models::content::{
    ContentMetadata, CourseMeta, GeneratedModule, ModuleOutline, OutlineSection,
    PersonalizedContent,
};

/// Builds a module purely from its outline, with placeholder section bodies.
/// Used when a model call fails with a non-terminal error.
pub fn fallback_module(outline: &ModuleOutline) -> GeneratedModule {
    GeneratedModule {
        id: Uuid::new_v4(),
        title: outline.title.clone(),
        description: outline.description.clone(),
        order_index: outline.order_index,
        sections: outline
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| synthesized_section(s, i as i32))
            .collect(),
        resources: vec![],
    }
}

fn default_sections() -> Vec<OutlineSection> {
    [
        ("Key Concepts", "text", "20 minutes"),
        ("Practical Examples", "text", "25 minutes"),
        ("Hands-on Exercise", "interactive", "30 minutes"),
    ]
    .into_iter()
    .map(|(title, kind, duration)| OutlineSection {
        title: title.to_string(),
        section_type: Some(kind.to_string()),
        duration: Some(duration.to_string()),
    })
    .collect()
}

/// Default outline for a course record that carries none.
pub fn derive_outlines(course: &CourseMeta) -> Vec<ModuleOutline> {
    let title = &course.title;
    [
        (
            format!("Introduction to {title}"),
            format!("Foundations and orientation for {title}."),
        ),
        (
            format!("Core Concepts of {title}"),
            format!("The ideas and techniques at the heart of {title}."),
        ),
        (
            "Advanced Topics and Case Studies".to_string(),
            format!("Applying {title} to realistic scenarios."),
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (module_title, description))| ModuleOutline {
        id: None,
        title: module_title,
        description: Some(description),
        order_index: i as i32,
        objectives: vec![
            format!("Understand how {title} applies to your role"),
            "Practice the techniques on a worked example".to_string(),
        ],
        sections: default_sections(),
    })
    .collect()
}

/// A complete templated course document, produced when no model credential is
/// configured. Always persistable, never personal.
pub fn mock_content(course: &CourseMeta, employee_id: Uuid) -> PersonalizedContent {
    let modules = derive_outlines(course).iter().map(fallback_module).collect();

    PersonalizedContent {
        id: Uuid::new_v4(),
        course_id: course.id,
        employee_id,
        title: course.title.clone(),
        description: course.description.clone(),
        level: course.level.clone(),
        modules,
        metadata: ContentMetadata {
            generated_at: Utc::now(),
            generated_for: employee_id,
            used_cv_data: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseMeta {
        CourseMeta {
            id: Uuid::new_v4(),
            title: "Incident Response".to_string(),
            description: Some("On-call fundamentals".to_string()),
            level: Some("beginner".to_string()),
        }
    }

    #[test]
    fn test_fallback_module_covers_every_outline_section() {
        let outlines = derive_outlines(&course());
        let module = fallback_module(&outlines[0]);
        assert_eq!(module.sections.len(), outlines[0].sections.len());
        assert!(module.sections[0].content.starts_with("## Key Concepts"));
        assert!(module.resources.is_empty());
    }

    #[test]
    fn test_derived_outline_is_templated_from_course_title() {
        let outlines = derive_outlines(&course());
        assert_eq!(outlines.len(), 3);
        assert_eq!(outlines[0].title, "Introduction to Incident Response");
        assert_eq!(outlines[1].title, "Core Concepts of Incident Response");
        assert_eq!(outlines[2].title, "Advanced Topics and Case Studies");
        assert_eq!(outlines[2].order_index, 2);
    }

    #[test]
    fn test_mock_content_is_complete_and_not_cv_based() {
        let course = course();
        let employee = Uuid::new_v4();
        let content = mock_content(&course, employee);

        assert_eq!(content.course_id, course.id);
        assert_eq!(content.title, "Incident Response");
        assert_eq!(content.modules.len(), 3);
        assert!(content
            .modules
            .iter()
            .all(|m| m.sections.len() == 3 && m.sections.iter().all(|s| !s.content.is_empty())));
        assert!(!content.metadata.used_cv_data);
        assert_eq!(content.metadata.generated_for, employee);
    }
}
