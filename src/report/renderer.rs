//! Binds a record snapshot and report parameters to the compiled template
//! and assembles the final document bytes.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};

use super::pdf::{self, Pdf, BOLD_FONT, REGULAR_FONT};
use super::template::{self, CompiledTemplate, TemplateError};
use crate::store::User;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("report parameter `{0}` was not supplied")]
    MissingParameter(String),
    #[error("report parameter `{0}` is not declared by the template")]
    UnknownParameter(String),
    #[error("field `{field}` contains `{ch}`, which the report font cannot encode")]
    Unencodable { field: String, ch: char },
    #[error("pdf assembly failed: {0}")]
    Pdf(String),
}

/// Render the record snapshot into a complete PDF document.
///
/// Output depends only on the template artifact, the record order and the
/// parameter values; rendering the same input twice yields identical bytes.
/// An empty snapshot still produces a well-formed single-page document.
pub fn render(records: &[User], params: &BTreeMap<String, String>) -> Result<Vec<u8>, RenderError> {
    let template = template::compiled()?;
    check_parameters(template, params)?;

    let per_page = template.rows_per_page().max(1);
    let chunks: Vec<&[User]> = if records.is_empty() {
        vec![records]
    } else {
        records.chunks(per_page).collect()
    };

    let mut doc = Pdf::new(template.page.width, template.page.height);
    let page_count = chunks.len();
    for (index, rows) in chunks.into_iter().enumerate() {
        let content = page_content(template, rows, params, index + 1, page_count)?;
        doc.add_page(content)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
    }
    doc.finish().map_err(|e| RenderError::Pdf(e.to_string()))
}

fn check_parameters(
    template: &CompiledTemplate,
    params: &BTreeMap<String, String>,
) -> Result<(), RenderError> {
    for p in &template.parameters {
        if !params.contains_key(&p.name) {
            return Err(RenderError::MissingParameter(p.name.clone()));
        }
    }
    for key in params.keys() {
        if !template.parameters.iter().any(|p| &p.name == key) {
            return Err(RenderError::UnknownParameter(key.clone()));
        }
    }
    Ok(())
}

fn page_content(
    t: &CompiledTemplate,
    rows: &[User],
    params: &BTreeMap<String, String>,
    page_no: usize,
    page_count: usize,
) -> Result<Content, RenderError> {
    let left = t.page.margin;
    let right = t.page.width - t.page.margin;
    let mut y = t.page.height - t.page.margin;
    let mut ops: Vec<Operation> = Vec::new();

    if page_no == 1 {
        y -= t.title_size;
        ops.extend(pdf::text(
            BOLD_FONT,
            t.title_size,
            left,
            y,
            encode("title", &t.title)?,
        ));
        y -= 6.0;
        for p in &t.parameters {
            y -= t.row_height;
            let value = params.get(&p.name).map(String::as_str).unwrap_or_default();
            let line = format!("{}: {}", p.label, value);
            ops.extend(pdf::text(
                REGULAR_FONT,
                t.body_size,
                left,
                y,
                encode("parameter", &line)?,
            ));
        }
    } else {
        // Later pages skip the title block but keep the grid at the same height.
        y -= t.title_size + 6.0 + t.parameters.len() as f32 * t.row_height;
    }

    y -= t.row_height;
    let mut x = left;
    for column in &t.columns {
        let cell = truncate(&column.title, max_chars(column.width, t.body_size));
        ops.extend(pdf::text(
            BOLD_FONT,
            t.body_size,
            x,
            y,
            encode(&column.field, &cell)?,
        ));
        x += column.width;
    }
    y -= 3.0;
    ops.extend(pdf::hline(left, y, right));

    for user in rows {
        y -= t.row_height;
        let mut x = left;
        for column in &t.columns {
            let raw = (column.bind)(user);
            let cell = truncate(&raw, max_chars(column.width, t.body_size));
            ops.extend(pdf::text(
                REGULAR_FONT,
                t.body_size,
                x,
                y,
                encode(&column.field, &cell)?,
            ));
            x += column.width;
        }
    }

    let footer = format!("Page {page_no} of {page_count}");
    ops.extend(pdf::text(
        REGULAR_FONT,
        t.body_size,
        left,
        t.page.margin,
        encode("footer", &footer)?,
    ));

    Ok(Content { operations: ops })
}

fn encode(field: &str, text: &str) -> Result<Vec<u8>, RenderError> {
    pdf::encode_win_ansi(text).map_err(|ch| RenderError::Unencodable {
        field: field.to_string(),
        ch,
    })
}

/// Helvetica averages a bit over half an em per glyph at these sizes.
fn max_chars(width: f32, size: f32) -> usize {
    (((width - 4.0) / (size * 0.55)) as usize).max(1)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}
