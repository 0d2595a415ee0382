//! Print-ready HTML report

use std::fmt::{self, Write};

use super::{ReportView, DISCLAIMER};
use crate::error::{GenieError, Result};
use crate::money::format_usd;

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; color: #1f2937; margin: 0; }
.page { max-width: 760px; margin: 0 auto; padding: 48px 40px; }
header { border-bottom: 3px solid #4f46e5; padding-bottom: 16px; margin-bottom: 32px; }
header h1 { font-size: 26px; margin: 0 0 6px; }
header .meta { color: #6b7280; font-size: 13px; }
.range { background: #eef2ff; border-radius: 8px; padding: 24px; text-align: center; margin-bottom: 32px; }
.range .label { text-transform: uppercase; letter-spacing: .08em; font-size: 12px; color: #4f46e5; }
.range .value { font-size: 34px; font-weight: bold; margin-top: 8px; }
table { width: 100%; border-collapse: collapse; margin-bottom: 28px; }
th, td { text-align: left; padding: 8px 4px; border-bottom: 1px solid #e5e7eb; font-size: 14px; }
td.amount, th.amount { text-align: right; }
tr.total td { font-weight: bold; border-top: 2px solid #1f2937; }
.warnings { background: #fffbeb; border-left: 4px solid #f59e0b; padding: 12px 16px; font-size: 13px; }
.disclaimer { color: #6b7280; font-size: 11px; margin-top: 40px; }
@media print { .page { padding: 0; } .no-print { display: none; } }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render a self-contained HTML document.
///
/// With `auto_print` the page opens the browser print dialog on load so the
/// user can save it as PDF.
pub fn render_html(view: &ReportView, auto_print: bool) -> Result<String> {
    let mut html = String::with_capacity(8 * 1024);
    write_document(&mut html, view, auto_print)
        .map_err(|e| GenieError::report(format!("html: {}", e)))?;
    Ok(html)
}

fn write_document(html: &mut String, view: &ReportView, auto_print: bool) -> fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{}</title>", escape(&view.title()))?;
    writeln!(html, "<style>{}</style></head><body><div class=\"page\">", STYLE)?;

    writeln!(html, "<header><h1>{}</h1>", escape(&view.title()))?;
    write!(html, "<div class=\"meta\">Prepared {} &middot; Ref {}", escape(&view.date_line()), view.reference())?;
    if let Some(who) = &view.prepared_for {
        write!(html, " &middot; For {}", escape(who))?;
    }
    writeln!(html, "</div></header>")?;

    writeln!(
        html,
        "<section class=\"range\"><div class=\"label\">Estimated value range</div>\
         <div class=\"value\">{}</div></section>",
        escape(&view.range_line())
    )?;

    writeln!(html, "<h2>Summary</h2><table>")?;
    for (label, value) in view.facts() {
        writeln!(
            html,
            "<tr><th>{}</th><td class=\"amount\">{}</td></tr>",
            escape(label),
            escape(&value)
        )?;
    }
    writeln!(html, "</table>")?;

    writeln!(
        html,
        "<h2>Seller's discretionary earnings</h2><table>\
         <tr><th>Component</th><th class=\"amount\">Amount</th></tr>"
    )?;
    for line in view.breakdown() {
        writeln!(
            html,
            "<tr><td>{}</td><td class=\"amount\">{}</td></tr>",
            escape(line.label),
            format_usd(line.amount)
        )?;
    }
    writeln!(
        html,
        "<tr class=\"total\"><td>SDE</td><td class=\"amount\">{}</td></tr></table>",
        format_usd(view.result.sde)
    )?;

    if !view.result.warnings.is_empty() {
        writeln!(html, "<div class=\"warnings\"><strong>Notes</strong><ul>")?;
        for warning in &view.result.warnings {
            writeln!(html, "<li>{}</li>", escape(warning))?;
        }
        writeln!(html, "</ul></div>")?;
    }

    writeln!(html, "<p class=\"disclaimer\">{}</p>", escape(DISCLAIMER))?;
    writeln!(html, "</div>")?;
    if auto_print {
        writeln!(
            html,
            "<script>window.addEventListener('load', function () {{ window.print(); }});</script>"
        )?;
    }
    writeln!(html, "</body></html>")
}
