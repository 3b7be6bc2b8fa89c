//! Covenant Render - SOW Content Renderer
//!
//! Produces the HTML the lifecycle manager sends: SOW documents (from a
//! stored template or a built-in per-tier generator) and the receipt, SOW
//! and MSA email bodies. Everything here is pure string building.

mod email;
mod sow;

pub use email::{msa_email, receipt_email, sow_email, EmailBody, ReceiptDetails};
pub use sow::{builtin_sow, render_template, resolve_sow_html, SowDocument, SowVariables};

use covenant_core::Timestamp;

/// Date shown on documents and receipts.
pub fn format_date(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_format_date() {
        let ts = chrono::DateTime::parse_from_rfc3339("2026-10-18T21:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(format_date(ts), "2026-10-18");
    }
}
