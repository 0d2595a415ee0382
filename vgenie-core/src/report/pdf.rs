//! Single-page PDF report
//!
//! Writes PDF 1.4 directly: one page, the two standard Helvetica fonts, and
//! a content stream of text, rule and rectangle operators placed at fixed
//! coordinates. Text is WinAnsi encoded; characters outside Latin-1 become `?`.

use super::{ReportView, DISCLAIMER};
use crate::money::format_usd;

/// US Letter in points
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 48.0;
/// Lowest baseline for body text; the disclaimer sits below
const BODY_FLOOR: f32 = 124.0;
/// Room left of right-aligned summary values for their labels
const LABEL_COLUMN: f32 = 200.0;

type Rgb = (f32, f32, f32);

const INDIGO: Rgb = (0.31, 0.27, 0.90);
const INK: Rgb = (0.12, 0.16, 0.22);
const MUTED: Rgb = (0.42, 0.45, 0.50);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const TINT: Rgb = (0.93, 0.95, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

/// Content stream builder for one page
#[derive(Debug, Default)]
pub struct PdfPage {
    ops: Vec<u8>,
}

impl PdfPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, s: &str) {
        self.ops.extend_from_slice(s.as_bytes());
        self.ops.push(b'\n');
    }

    pub fn fill_color(&mut self, (r, g, b): Rgb) {
        self.op(&format!("{:.3} {:.3} {:.3} rg", r, g, b));
    }

    pub fn stroke_color(&mut self, (r, g, b): Rgb) {
        self.op(&format!("{:.3} {:.3} {:.3} RG", r, g, b));
    }

    /// Draw text with its baseline starting at (x, y)
    pub fn text(&mut self, x: f32, y: f32, size: f32, font: Font, text: &str) {
        let mut line = format!("BT /{} {:.1} Tf {:.2} {:.2} Td (", font.resource(), size, x, y);
        line.push_str(&encode_text(text));
        line.push_str(") Tj ET");
        self.op(&line);
    }

    /// Draw text so that it ends at `right`
    pub fn text_right(&mut self, right: f32, y: f32, size: f32, font: Font, text: &str) {
        let width = text_width(text, size);
        self.text(right - width, y, size, font, text);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.op(&format!(
            "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S",
            width, x1, y1, x2, y2
        ));
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.op(&format!("{:.2} {:.2} {:.2} {:.2} re f", x, y, w, h));
    }

    /// Serialize a document containing only this page
    pub fn into_document(self) -> Vec<u8> {
        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [5 0 R] /Count 1 >>".to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents 6 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT
            )
            .into_bytes(),
        ];

        let mut stream = format!("<< /Length {} >>\nstream\n", self.ops.len()).into_bytes();
        stream.extend_from_slice(&self.ops);
        stream.extend_from_slice(b"endstream");
        objects.push(stream);

        let mut out: Vec<u8> = Vec::with_capacity(4096 + self.ops.len());
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Escape a string for a PDF literal, WinAnsi encoding via octal escapes
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\u{a0}'..='\u{ff}' => {
                out.push_str(&format!("\\{:03o}", ch as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate Helvetica advance width in points
fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '0'..='9' | '$' => 556,
            ',' | '.' | ' ' | 'i' | 'l' | 'j' => 278,
            '-' => 333,
            'A'..='Z' => 667,
            _ => 520,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Cut `text` so it fits `max_width`, ending in "..." when shortened
fn fit(text: &str, size: f32, max_width: f32) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let budget = max_width - text_width("...", size);
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if text_width(&out, size) > budget {
            out.pop();
            break;
        }
    }
    format!("{}...", out.trim_end())
}

/// Greedy word wrap to an approximate width
fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render the report as a one-page PDF
pub fn render_pdf(view: &ReportView) -> Vec<u8> {
    let mut page = PdfPage::new();
    let right = PAGE_WIDTH - MARGIN;

    // Title band
    page.fill_color(INDIGO);
    page.fill_rect(0.0, PAGE_HEIGHT - 80.0, PAGE_WIDTH, 80.0);
    page.fill_color(WHITE);
    let width = right - MARGIN;
    page.text(MARGIN, PAGE_HEIGHT - 40.0, 20.0, Font::Bold, &fit(&view.title(), 20.0, width));
    let mut meta = format!("Prepared {}  |  Ref {}", view.date_line(), view.reference());
    if let Some(who) = &view.prepared_for {
        meta.push_str("  |  For ");
        meta.push_str(who);
    }
    page.text(MARGIN, PAGE_HEIGHT - 62.0, 10.0, Font::Regular, &fit(&meta, 10.0, width));

    // Headline range
    page.fill_color(TINT);
    page.fill_rect(MARGIN, 600.0, right - MARGIN, 84.0);
    page.fill_color(INDIGO);
    page.text(MARGIN + 16.0, 660.0, 10.0, Font::Bold, "ESTIMATED VALUE RANGE");
    page.fill_color(INK);
    page.text(MARGIN + 16.0, 620.0, 26.0, Font::Bold, &view.range_line());

    // Summary facts
    let mut y = 570.0;
    page.text(MARGIN, y, 14.0, Font::Bold, "Summary");
    y -= 22.0;
    page.stroke_color(MUTED);
    for (label, value) in view.facts() {
        page.text(MARGIN, y, 11.0, Font::Regular, label);
        page.text_right(right, y, 11.0, Font::Bold, &fit(&value, 11.0, width - LABEL_COLUMN));
        page.line(MARGIN, y - 6.0, right, y - 6.0, 0.3);
        y -= 20.0;
    }

    // SDE breakdown
    y -= 14.0;
    page.text(MARGIN, y, 14.0, Font::Bold, "Seller's discretionary earnings");
    y -= 22.0;
    for line in view.breakdown() {
        page.text(MARGIN, y, 11.0, Font::Regular, line.label);
        page.text_right(right, y, 11.0, Font::Regular, &format_usd(line.amount));
        y -= 18.0;
    }
    page.stroke_color(INK);
    page.line(MARGIN, y + 10.0, right, y + 10.0, 1.0);
    page.text(MARGIN, y - 4.0, 11.0, Font::Bold, "SDE");
    page.text_right(right, y - 4.0, 11.0, Font::Bold, &format_usd(view.result.sde));
    y -= 30.0;

    // Notes, cut off above the disclaimer
    if !view.result.warnings.is_empty() && y >= BODY_FLOOR {
        page.text(MARGIN, y, 11.0, Font::Bold, "Notes");
        y -= 16.0;
        let lines = view
            .result
            .warnings
            .iter()
            .flat_map(|warning| wrap(warning, 10.0, width - 12.0));
        for line in lines {
            if y < BODY_FLOOR {
                break;
            }
            page.text(MARGIN + 12.0, y, 10.0, Font::Regular, &line);
            y -= 14.0;
        }
    }

    // Disclaimer pinned to the bottom margin
    page.fill_color(MUTED);
    let mut dy = 96.0;
    for line in wrap(DISCLAIMER, 8.0, right - MARGIN) {
        page.text(MARGIN, dy, 8.0, Font::Regular, &line);
        dy -= 11.0;
    }

    page.into_document()
}
