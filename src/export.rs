// Renderers for assembled reports and the CSV trend export.
// PDF layout is delegated to an external renderer behind DocumentRenderer.

use thiserror::Error;

use crate::models::{PatientInfo, ReportDocument, SectionBody, VitalReading};

const PLACEHOLDER: &str = "--";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document has no sections")]
    Empty,
    #[error("render failed: {0}")]
    Backend(String),
}

/// Turns a report document into bytes. Implementations must not alter the document.
pub trait DocumentRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, RenderError>;
}

/// Plain-text layout: title, timestamp, then each section with aligned table columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        if doc.sections.is_empty() {
            return Err(RenderError::Empty);
        }
        let mut out = String::new();
        out.push_str(&doc.title);
        out.push('\n');
        out.push_str(&"=".repeat(doc.title.chars().count()));
        out.push('\n');
        if let Some(at) = doc.generated_at {
            out.push_str(&format!(
                "Report Generated: {}\n",
                at.format("%Y-%m-%d at %H:%M:%S UTC")
            ));
        }
        for section in &doc.sections {
            out.push('\n');
            out.push_str(&section.title);
            out.push_str(":\n");
            match &section.body {
                SectionBody::Table { head, rows } => render_table(&mut out, head, rows),
                SectionBody::Bullets { items } => {
                    for item in items {
                        out.push_str("  \u{2022} ");
                        out.push_str(item);
                        out.push('\n');
                    }
                }
                SectionBody::Lines { lines } => {
                    for line in lines {
                        out.push_str("  ");
                        out.push_str(line);
                        out.push('\n');
                    }
                }
            }
        }
        Ok(out.into_bytes())
    }
}

fn render_table(out: &mut String, head: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = head.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let w = cell.chars().count();
            match widths.get_mut(i) {
                Some(max) => *max = (*max).max(w),
                None => widths.push(w),
            }
        }
    }
    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let pad = widths[i].saturating_sub(c.chars().count());
                format!("{}{}", c, " ".repeat(pad))
            })
            .collect();
        format!("  {}\n", padded.join(" | ").trim_end())
    };
    out.push_str(&line(head));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", rule.join("-+-")));
    for row in rows {
        out.push_str(&line(row));
    }
}

/// CSV of the window: Time, Temperature, Position; `--` for absent values.
pub fn trend_csv(window: &[VitalReading]) -> String {
    let mut out = String::from("Time,Temperature,Position");
    for r in window {
        let time = r.recorded_at.to_rfc3339();
        let temp = r
            .temperature_c
            .map_or_else(|| PLACEHOLDER.to_string(), |t| t.to_string());
        let posture = r
            .posture
            .as_ref()
            .map_or(PLACEHOLDER, |p| p.label());
        out.push('\n');
        out.push_str(&[csv_field(&time), csv_field(&temp), csv_field(posture)].join(","));
    }
    out
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// File name without extension, e.g. `health_report_Jane_Doe`.
pub fn report_file_stem(patient: Option<&PatientInfo>) -> String {
    match patient {
        Some(p) => {
            let name: Vec<&str> = p.name.split_whitespace().collect();
            format!("health_report_{}", name.join("_"))
        }
        None => "health_report".to_string(),
    }
}
