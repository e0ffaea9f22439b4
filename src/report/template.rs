//! The report template: a versioned static artifact compiled once per process.
//!
//! Columns bind record fields through a statically declared table, so a
//! template that names a field the record does not have is rejected at
//! compile time, before any render is attempted.

use std::sync::OnceLock;

use serde::Deserialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::store::User;

pub(super) const TEMPLATE_SRC: &str = include_str!("../../templates/users_report.json");

const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    Parse(String),
    #[error("unsupported template version {0}")]
    Version(u32),
    #[error("template declares no columns")]
    NoColumns,
    #[error("template binds unknown record field `{0}`")]
    UnknownField(String),
    #[error("template binds record field `{0}` twice")]
    DuplicateField(String),
    #[error("template declares parameter `{0}` twice")]
    DuplicateParameter(String),
    #[error("columns need {needed}pt but the printable width is {printable}pt")]
    ColumnsTooWide { needed: f32, printable: f32 },
    #[error("page geometry leaves no room for body rows")]
    Geometry,
}

// Raw serde model of the artifact.

#[derive(Debug, Deserialize)]
struct TemplateDef {
    version: u32,
    title: String,
    page: PageDef,
    title_size: f32,
    body_size: f32,
    row_height: f32,
    #[serde(default)]
    parameters: Vec<ParamDef>,
    columns: Vec<ColumnDef>,
}

#[derive(Debug, Deserialize)]
struct PageDef {
    width: f32,
    height: f32,
    margin: f32,
}

#[derive(Debug, Deserialize)]
struct ParamDef {
    name: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ColumnDef {
    field: String,
    title: String,
    width: f32,
}

/// Extracts one cell of text from a record.
pub type FieldBinding = fn(&User) -> String;

/// Record fields a template may bind. Names are the wire names.
static BINDINGS: &[(&str, FieldBinding)] = &[
    ("id", short_id),
    ("fullName", |u| u.full_name.clone()),
    ("email", |u| u.email.clone()),
    ("status", |u| u.status.as_str().to_string()),
    ("createdAt", |u| fmt_date(u.created_at)),
    ("updatedAt", |u| fmt_date(u.updated_at)),
];

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn fmt_date(t: OffsetDateTime) -> String {
    t.format(&DATE_FORMAT).unwrap_or_default()
}

fn short_id(u: &User) -> String {
    u.id.simple().to_string().chars().take(8).collect()
}

#[derive(Debug)]
pub struct Parameter {
    pub name: String,
    pub label: String,
}

#[derive(Debug)]
pub struct Column {
    pub field: String,
    pub title: String,
    pub width: f32,
    pub bind: FieldBinding,
}

#[derive(Debug)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

#[derive(Debug)]
pub struct CompiledTemplate {
    pub title: String,
    pub page: PageGeometry,
    pub title_size: f32,
    pub body_size: f32,
    pub row_height: f32,
    pub parameters: Vec<Parameter>,
    pub columns: Vec<Column>,
}

impl CompiledTemplate {
    /// Pure function of the artifact text: the same source always compiles
    /// to the same internal program, or fails the same way.
    pub fn compile(src: &str) -> Result<Self, TemplateError> {
        let def: TemplateDef =
            serde_json::from_str(src).map_err(|e| TemplateError::Parse(e.to_string()))?;
        if def.version != SUPPORTED_VERSION {
            return Err(TemplateError::Version(def.version));
        }
        if def.columns.is_empty() {
            return Err(TemplateError::NoColumns);
        }

        let mut seen_params: Vec<&str> = Vec::new();
        for p in &def.parameters {
            if seen_params.contains(&p.name.as_str()) {
                return Err(TemplateError::DuplicateParameter(p.name.clone()));
            }
            seen_params.push(&p.name);
        }

        let mut columns = Vec::with_capacity(def.columns.len());
        let mut seen_fields: Vec<&str> = Vec::new();
        for c in &def.columns {
            if seen_fields.contains(&c.field.as_str()) {
                return Err(TemplateError::DuplicateField(c.field.clone()));
            }
            seen_fields.push(&c.field);
            let bind = BINDINGS
                .iter()
                .find(|(name, _)| *name == c.field)
                .map(|(_, f)| *f)
                .ok_or_else(|| TemplateError::UnknownField(c.field.clone()))?;
            columns.push(Column {
                field: c.field.clone(),
                title: c.title.clone(),
                width: c.width,
                bind,
            });
        }

        let printable = def.page.width - 2.0 * def.page.margin;
        let needed: f32 = columns.iter().map(|c| c.width).sum();
        if needed > printable {
            return Err(TemplateError::ColumnsTooWide { needed, printable });
        }

        let compiled = Self {
            title: def.title,
            page: PageGeometry {
                width: def.page.width,
                height: def.page.height,
                margin: def.page.margin,
            },
            title_size: def.title_size,
            body_size: def.body_size,
            row_height: def.row_height,
            parameters: def
                .parameters
                .into_iter()
                .map(|p| Parameter {
                    name: p.name,
                    label: p.label,
                })
                .collect(),
            columns,
        };
        if compiled.rows_per_page() == 0 {
            return Err(TemplateError::Geometry);
        }
        Ok(compiled)
    }

    /// Body rows that fit on one page. The header block (title, parameter
    /// lines, column header) occupies the same band on every page so the
    /// grid lands at a fixed height.
    pub fn rows_per_page(&self) -> usize {
        let header = self.title_size
            + 6.0
            + self.parameters.len() as f32 * self.row_height
            + self.row_height
            + 3.0;
        let footer = self.row_height;
        let body = self.page.height - 2.0 * self.page.margin - header - footer;
        if body <= 0.0 {
            return 0;
        }
        (body / self.row_height) as usize
    }
}

static COMPILED: OnceLock<Result<CompiledTemplate, TemplateError>> = OnceLock::new();

/// The compiled form of the embedded artifact. The first caller pays the
/// compile; concurrent first calls block on the same initialization, and the
/// result, success or failure, is cached for the life of the process.
pub fn compiled() -> Result<&'static CompiledTemplate, TemplateError> {
    COMPILED
        .get_or_init(|| CompiledTemplate::compile(TEMPLATE_SRC))
        .as_ref()
        .map_err(|e| e.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_template_compiles() {
        let t = CompiledTemplate::compile(TEMPLATE_SRC).expect("embedded template");
        assert_eq!(t.title, "Users Report");
        assert_eq!(t.columns.len(), 6);
        assert_eq!(t.parameters.len(), 1);
        assert_eq!(t.parameters[0].name, "createdBy");
        assert!(t.rows_per_page() > 10);
    }

    #[test]
    fn malformed_json_fails_to_compile() {
        let err = CompiledTemplate::compile("{ not json").unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let src = r#"{
            "version": 1, "title": "T",
            "page": { "width": 595.0, "height": 842.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [],
            "columns": [ { "field": "passwordHash", "title": "Hash", "width": 100.0 } ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownField(f) if f == "passwordHash"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let src = r#"{
            "version": 1, "title": "T",
            "page": { "width": 595.0, "height": 842.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [],
            "columns": [
                { "field": "email", "title": "Email", "width": 100.0 },
                { "field": "email", "title": "Email again", "width": 100.0 }
            ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateField(f) if f == "email"));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let src = r#"{
            "version": 1, "title": "T",
            "page": { "width": 595.0, "height": 842.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [
                { "name": "createdBy", "label": "By" },
                { "name": "createdBy", "label": "By again" }
            ],
            "columns": [ { "field": "email", "title": "Email", "width": 100.0 } ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateParameter(p) if p == "createdBy"));
    }

    #[test]
    fn oversized_columns_are_rejected() {
        let src = r#"{
            "version": 1, "title": "T",
            "page": { "width": 300.0, "height": 842.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [],
            "columns": [
                { "field": "fullName", "title": "Name", "width": 150.0 },
                { "field": "email", "title": "Email", "width": 150.0 }
            ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::ColumnsTooWide { .. }));
    }

    #[test]
    fn future_version_is_rejected() {
        let src = r#"{
            "version": 2, "title": "T",
            "page": { "width": 595.0, "height": 842.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [],
            "columns": [ { "field": "email", "title": "Email", "width": 100.0 } ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::Version(2)));
    }

    #[test]
    fn page_too_small_for_any_row_is_rejected() {
        let src = r#"{
            "version": 1, "title": "T",
            "page": { "width": 595.0, "height": 90.0, "margin": 40.0 },
            "title_size": 16.0, "body_size": 9.0, "row_height": 14.0,
            "parameters": [],
            "columns": [ { "field": "email", "title": "Email", "width": 100.0 } ]
        }"#;
        let err = CompiledTemplate::compile(src).unwrap_err();
        assert!(matches!(err, TemplateError::Geometry));
    }
}
