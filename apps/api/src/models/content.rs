//! Content entities and their persisted row shapes.
//!
//! The in-memory entities serialize as camelCase — this is the single mapping
//! boundary between the snake_case rows and the JSON shapes the client sees.
//! The `content` JSONB column stores the camelCase entity verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Generation inputs
// ────────────────────────────────────────────────────────────────────────────

/// One section of a module outline. Immutable input to generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    pub title: String,
    #[serde(rename = "type", default)]
    pub section_type: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// A templated description of a module to generate, supplied by the caller
/// or derived from the course record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutline {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub sections: Vec<OutlineSection>,
}

/// Employee profile fields interpolated into prompts. Owned by the HR
/// subsystem; this pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeContext {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Free text or a structured document, depending on what HR ingested.
    #[serde(default)]
    pub cv_summary: Option<Value>,
}

/// Course fields copied into the generated content envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMeta {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Generation outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSection {
    pub id: Uuid,
    pub title: String,
    /// Markdown, starting with a `## ` heading.
    pub content: String,
    pub content_type: String,
    pub order_index: i32,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedModule {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub sections: Vec<GeneratedSection>,
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub generated_at: DateTime<Utc>,
    pub generated_for: Uuid,
    pub used_cv_data: bool,
}

/// The envelope persisted for an enrollment. One row per generation run;
/// the enrollment pointer moves, prior rows are kept as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedContent {
    pub id: Uuid,
    pub course_id: Uuid,
    pub employee_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub level: Option<String>,
    pub modules: Vec<GeneratedModule>,
    pub metadata: ContentMetadata,
}

// ────────────────────────────────────────────────────────────────────────────
// Persisted rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonalizedContentRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub employee_id: Uuid,
    pub content: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentRow {
    pub course_id: Uuid,
    pub employee_id: Uuid,
    pub personalized_content_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub level: Option<String>,
    /// JSONB array of `ModuleOutline`; NULL means derive a default outline.
    pub outline: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub cv_summary: Option<Value>,
}

impl CourseRow {
    pub fn meta(&self) -> CourseMeta {
        CourseMeta {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            level: self.level.clone(),
        }
    }

    /// Parses the stored outline, if any. A malformed outline is treated the
    /// same as a missing one so a bad row cannot wedge generation.
    pub fn outlines(&self) -> Option<Vec<ModuleOutline>> {
        let raw = self.outline.clone()?;
        match serde_json::from_value::<Vec<ModuleOutline>>(raw) {
            Ok(outlines) if !outlines.is_empty() => Some(outlines),
            Ok(_) => None,
            Err(e) => {
                warn!(course_id = %self.id, "Ignoring malformed course outline: {e}");
                None
            }
        }
    }
}

impl From<EmployeeRow> for EmployeeContext {
    fn from(row: EmployeeRow) -> Self {
        EmployeeContext {
            name: row.name,
            position: row.position,
            department: row.department,
            cv_summary: row.cv_summary,
        }
    }
}
