//! Text normalization and display helpers shared by the filter engine and the
//! sidebar list.

/// Upper-cases and trims a region/state code. Empty in, empty out.
#[must_use]
pub fn normalize_region_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Capitalises the first letter of each whitespace-separated word and
/// lower-cases the rest. Runs of whitespace collapse to a single space.
#[must_use]
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escapes the five HTML-significant characters so feed text can be placed
/// in markup verbatim.
#[must_use]
pub fn escape_for_display(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
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
