//! Email bodies
//!
//! Each template returns both an HTML and a plain-text part. All
//! user-supplied text is escaped in the HTML part.

use std::fmt::Write as _;

use vgenie_core::money::format_cents;
use vgenie_core::report::html::escape;

use super::EmailMessage;
use crate::payments::Product;

fn wrap_html(heading: &str, body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><body style=\"font-family:Helvetica,Arial,sans-serif;color:#1f2937;\">\
         <div style=\"max-width:560px;margin:0 auto;padding:24px;\">\
         <h2 style=\"color:#4f46e5;\">{}</h2>{}\
         <p style=\"color:#6b7280;font-size:12px;\">ValuationGenie</p></div></body></html>",
        escape(heading),
        body
    );
    html
}

fn greeting(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {},", name),
        None => "Hi there,".to_string(),
    }
}

pub fn welcome(to: &str, name: Option<&str>, public_url: &str) -> EmailMessage {
    let hello = greeting(name);
    let link = format!("{}/dashboard", public_url.trim_end_matches('/'));
    let html = wrap_html(
        "Welcome to ValuationGenie",
        &format!(
            "<p>{}</p><p>Your account is ready. Enter your financials and get an estimated \
             value range for your business in a few minutes.</p>\
             <p><a href=\"{}\">Start a valuation</a></p>",
            escape(&hello),
            escape(&link)
        ),
    );
    let text = format!(
        "{}\n\nYour account is ready. Enter your financials and get an estimated value range \
         for your business in a few minutes.\n\nStart a valuation: {}\n",
        hello, link
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to ValuationGenie".to_string(),
        html,
        text,
    }
}

/// Receipt after a successful payment. `business_name` is set for report
/// purchases.
pub fn receipt(
    to: &str,
    product: Product,
    amount_cents: i64,
    business_name: Option<&str>,
    public_url: &str,
) -> EmailMessage {
    let amount = format_cents(amount_cents);
    let what = match (product, business_name) {
        (Product::Report, Some(name)) => format!("the valuation report for {}", name),
        (Product::Report, None) => "your valuation report".to_string(),
        (Product::Lifetime, _) => "lifetime access to every valuation report".to_string(),
    };
    let link = format!("{}/dashboard", public_url.trim_end_matches('/'));
    let html = wrap_html(
        "Payment received",
        &format!(
            "<p>Thanks for your purchase of {}.</p>\
             <table style=\"border-collapse:collapse;\">\
             <tr><td style=\"padding:4px 12px 4px 0;\">Item</td><td>{}</td></tr>\
             <tr><td style=\"padding:4px 12px 4px 0;\">Amount</td><td><strong>{}</strong></td></tr>\
             </table><p><a href=\"{}\">Open your dashboard</a></p>",
            escape(&what),
            escape(product.description()),
            amount,
            escape(&link)
        ),
    );
    let text = format!(
        "Thanks for your purchase of {}.\n\nItem: {}\nAmount: {}\n\nOpen your dashboard: {}\n",
        what,
        product.description(),
        amount,
        link
    );
    EmailMessage {
        to: to.to_string(),
        subject: format!("Your ValuationGenie receipt ({})", amount),
        html,
        text,
    }
}

pub fn subscription_confirmation(to: &str, public_url: &str) -> EmailMessage {
    let unsubscribe = format!(
        "{}/unsubscribe?email={}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(to)
    );
    let html = wrap_html(
        "You're subscribed",
        &format!(
            "<p>You'll get occasional notes on business valuation and selling a small business.</p>\
             <p style=\"font-size:12px;\">Changed your mind? <a href=\"{}\">Unsubscribe</a>.</p>",
            escape(&unsubscribe)
        ),
    );
    let text = format!(
        "You'll get occasional notes on business valuation and selling a small business.\n\n\
         Unsubscribe: {}\n",
        unsubscribe
    );
    EmailMessage {
        to: to.to_string(),
        subject: "You're subscribed to ValuationGenie".to_string(),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_escapes_name() {
        let msg = welcome("a@example.com", Some("<Bob>"), "https://app.example.com/");
        assert!(msg.html.contains("Hi &lt;Bob&gt;,"));
        assert!(msg.text.starts_with("Hi <Bob>,"));
        assert!(msg.text.contains("https://app.example.com/dashboard"));
    }

    #[test]
    fn welcome_without_name() {
        let msg = welcome("a@example.com", Some("  "), "http://localhost:3000");
        assert!(msg.text.starts_with("Hi there,"));
    }

    #[test]
    fn receipt_mentions_amount_and_business() {
        let msg = receipt(
            "a@example.com",
            Product::Report,
            2900,
            Some("Joe's Pizza"),
            "http://localhost:3000",
        );
        assert_eq!(msg.subject, "Your ValuationGenie receipt ($29.00)");
        assert!(msg.text.contains("the valuation report for Joe's Pizza"));
        assert!(msg.html.contains("Joe&#39;s Pizza"));

        let lifetime = receipt("a@example.com", Product::Lifetime, 9900, None, "http://x");
        assert!(lifetime.text.contains("lifetime access"));
    }

    #[test]
    fn confirmation_has_unsubscribe_link() {
        let msg = subscription_confirmation("a@example.com", "http://localhost:3000");
        assert!(msg.text.contains("http://localhost:3000/unsubscribe?email=a%40example.com"));
    }

    #[test]
    fn unsubscribe_link_encodes_address() {
        let msg = subscription_confirmation("a+b&c@example.com", "http://localhost:3000/");
        assert!(msg
            .text
            .contains("http://localhost:3000/unsubscribe?email=a%2Bb%26c%40example.com"));
        assert!(!msg.html.contains("a+b"));
    }
}
