//! Industry multiple table
//!
//! Static (low, high) SDE multiples keyed by a normalized industry slug.
//! Unknown industries fall back to [`DEFAULT_MULTIPLE`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Multiple applied when the submitted industry is not in the table.
pub const DEFAULT_MULTIPLE: MultipleRange = MultipleRange { low: 2.0, high: 3.0 };

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid industry slug regex"));

/// Low/high multiplier pair applied to SDE
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MultipleRange {
    pub low: f64,
    pub high: f64,
}

/// One row of the industry table
#[derive(Debug, Clone, Serialize)]
pub struct Industry {
    pub key: &'static str,
    pub label: &'static str,
    pub multiple: MultipleRange,
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

/// Result of looking up a submitted industry label
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryMatch {
    /// Matched table key, or the normalized input when nothing matched
    pub key: String,
    pub label: String,
    pub multiple: MultipleRange,
    pub used_default: bool,
}

const fn industry(
    key: &'static str,
    label: &'static str,
    low: f64,
    high: f64,
    aliases: &'static [&'static str],
) -> Industry {
    Industry {
        key,
        label,
        multiple: MultipleRange { low, high },
        aliases,
    }
}

static INDUSTRIES: &[Industry] = &[
    industry("restaurant", "Restaurant & Food Service", 1.5, 2.5, &["food-service", "cafe", "bar", "food"]),
    industry("retail", "Retail", 1.8, 2.8, &["retail-store", "shop", "store"]),
    industry("ecommerce", "E-commerce", 2.5, 4.0, &["e-commerce", "online-store", "online-retail"]),
    industry("saas", "Software / SaaS", 3.0, 5.0, &["software", "technology", "tech"]),
    industry("professional-services", "Professional Services", 1.8, 3.0, &["consulting", "accounting", "legal", "services"]),
    industry("construction", "Construction & Trades", 2.0, 3.0, &["contractor", "trades", "plumbing", "electrical", "hvac"]),
    industry("manufacturing", "Manufacturing", 2.5, 4.0, &["industrial", "fabrication"]),
    industry("healthcare", "Healthcare", 2.5, 4.0, &["medical", "dental", "health"]),
    industry("auto-repair", "Automotive Repair", 2.0, 3.0, &["automotive", "auto", "auto-services"]),
    industry("landscaping", "Landscaping & Lawn Care", 1.8, 2.8, &["lawn-care", "gardening"]),
    industry("cleaning", "Cleaning Services", 1.5, 2.5, &["janitorial", "cleaning-services", "maid-services"]),
    industry("fitness", "Fitness & Wellness", 1.5, 2.5, &["gym", "wellness", "yoga"]),
    industry("beauty", "Salon & Beauty", 1.3, 2.3, &["salon", "spa", "barber"]),
    industry("marketing-agency", "Marketing Agency", 2.0, 3.2, &["agency", "marketing", "advertising", "digital-agency"]),
    industry("transportation", "Transportation & Logistics", 2.0, 3.0, &["trucking", "logistics", "delivery"]),
    industry("real-estate", "Real Estate Services", 2.0, 3.0, &["property-management", "realty"]),
    industry("education", "Education & Training", 2.0, 3.2, &["tutoring", "training", "childcare"]),
    industry("hospitality", "Hospitality", 2.0, 3.0, &["hotel", "motel", "travel"]),
    industry("wholesale", "Wholesale & Distribution", 2.2, 3.2, &["distribution"]),
    industry("home-services", "Home Services", 2.2, 3.2, &["home-improvement", "pest-control", "roofing"]),
];

/// All known industries in display order
pub fn industries() -> &'static [Industry] {
    INDUSTRIES
}

/// Normalize a free-form industry label into a table slug.
///
/// Lowercases, collapses every run of non-alphanumerics into `-` and trims
/// leading/trailing dashes. `"E-Commerce / Online"` becomes `"e-commerce-online"`.
pub fn normalize(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Look up the multiple for a submitted industry label.
///
/// Matching is on the normalized key or any alias. A miss is not an error:
/// the default multiple is returned with `used_default` set.
pub fn lookup(label: &str) -> IndustryMatch {
    let slug = normalize(label);

    let found = INDUSTRIES
        .iter()
        .find(|i| i.key == slug || i.aliases.contains(&slug.as_str()));

    match found {
        Some(industry) => IndustryMatch {
            key: industry.key.to_string(),
            label: industry.label.to_string(),
            multiple: industry.multiple,
            used_default: false,
        },
        None => IndustryMatch {
            label: label.trim().to_string(),
            key: slug,
            multiple: DEFAULT_MULTIPLE,
            used_default: true,
        },
    }
}
