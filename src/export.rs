//! PDF export of the patient timeline and electronic health record.
//!
//! Layout is a plain text column on A4. The cursor starts at a fixed top
//! offset and a new page begins once it drops below a fixed bottom offset,
//! checked after each entry.

use std::io::BufWriter;

use printpdf::*;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{AssessmentDiagnosis, HealthEvent, Patient};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 282.0;
const BOTTOM_MM: f32 = 35.0;
const MARGIN_MM: f32 = 17.5;
const INDENT_MM: f32 = 21.0;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page1, layer1) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: TOP_MM,
            pages: 1,
        })
    }

    fn heading(&self, text: &str) {
        self.layer
            .use_text(text, 16.0, Mm(MARGIN_MM), Mm(self.y), &self.bold);
    }

    fn text(&self, text: &str, x: f32) {
        self.layer.use_text(text, 10.0, Mm(x), Mm(self.y), &self.font);
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn break_if_needed(&mut self) {
        if self.y < BOTTOM_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_MM;
            self.pages += 1;
        }
    }

    fn finish(self) -> Result<(Vec<u8>, usize), ExportError> {
        let pages = self.pages;
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ExportError::Pdf(format!("save error: {e}")))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| ExportError::Pdf(format!("buffer error: {e}")))?;
        Ok((bytes, pages))
    }
}

/// Render the health timeline, newest first as given.
pub fn timeline_pdf(events: &[HealthEvent]) -> Result<Vec<u8>, ExportError> {
    layout_timeline(events).map(|(bytes, _)| bytes)
}

fn layout_timeline(events: &[HealthEvent]) -> Result<(Vec<u8>, usize), ExportError> {
    let mut w = PageWriter::new("Health Timeline")?;
    w.heading("Health Timeline");
    w.advance(14.0);

    for event in events {
        w.text(
            &format!(
                "{} - {}",
                event.created_at.format("%Y-%m-%d %H:%M:%S"),
                event.title
            ),
            MARGIN_MM,
        );
        w.advance(5.3);
        w.text(&event.description, INDENT_MM);
        w.advance(7.0);
        w.text(
            &format!("Disease: {}", event.disease.as_deref().unwrap_or("None")),
            INDENT_MM,
        );
        w.advance(10.5);
        w.break_if_needed();
    }

    tracing::debug!(events = events.len(), pages = w.pages, "Timeline PDF laid out");
    w.finish()
}

/// Render the EHR: identity block, then one entry per stored assessment.
pub fn ehr_pdf(patient: &Patient, diagnoses: &[AssessmentDiagnosis]) -> Result<Vec<u8>, ExportError> {
    layout_ehr(patient, diagnoses).map(|(bytes, _)| bytes)
}

fn layout_ehr(
    patient: &Patient,
    diagnoses: &[AssessmentDiagnosis],
) -> Result<(Vec<u8>, usize), ExportError> {
    let mut w = PageWriter::new("Electronic Health Record")?;
    w.heading("Electronic Health Record");
    w.advance(10.5);

    w.text(&format!("Name: {}", patient.full_name), MARGIN_MM);
    w.advance(5.3);
    w.text(&format!("Email: {}", patient.email), MARGIN_MM);
    w.advance(5.3);
    let age = patient.age.map(|a| a.to_string()).unwrap_or_default();
    w.text(&format!("Age: {age}"), MARGIN_MM);
    w.advance(10.5);

    for entry in diagnoses {
        w.text(
            &format!("Diagnosis: {}", field_text(&entry.diag, "primary_diagnosis")),
            MARGIN_MM,
        );
        w.advance(5.3);
        w.text(
            &format!("Confidence: {}", field_text(&entry.diag, "diagnosis_confidence")),
            INDENT_MM,
        );
        w.advance(9.0);
        w.break_if_needed();
    }

    w.finish()
}

/// Display text of a diagnosis field; absent or null is empty.
fn field_text(diag: &Map<String, Value>, key: &str) -> String {
    match diag.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
