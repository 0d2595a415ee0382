//! Currency formatting helpers shared by the report renderers and email templates

/// Format a whole-dollar amount as `$1,234,567`. Negative values get a
/// leading minus and fractional dollars are rounded.
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(rounded.abs() as u64))
}

/// Format an amount in cents as `$29.00`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, group_thousands(abs / 100), abs % 100)
}

/// Format a multiple as `2.5x`
pub fn format_multiple(multiple: f64) -> String {
    let s = format!("{:.2}", multiple);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    format!("{}x", trimmed)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_dollars() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.0), "$999");
        assert_eq!(format_usd(1000.0), "$1,000");
        assert_eq!(format_usd(1_234_567.4), "$1,234,567");
        assert_eq!(format_usd(-2500.0), "-$2,500");
    }

    #[test]
    fn formats_cents() {
        assert_eq!(format_cents(2900), "$29.00");
        assert_eq!(format_cents(123_456_78), "$123,456.78");
        assert_eq!(format_cents(5), "$0.05");
    }

    #[test]
    fn formats_multiples() {
        assert_eq!(format_multiple(2.0), "2x");
        assert_eq!(format_multiple(2.5), "2.5x");
        assert_eq!(format_multiple(0.25), "0.25x");
    }
}
