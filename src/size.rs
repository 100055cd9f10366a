//! Conversion between human-readable size strings and byte counts.
//!
//! Two shapes are understood. `du -h` emits a compact shape (`3.1G`, `424M`,
//! `0B`) while aggregates computed here are rendered in a spaced shape
//! (`18.2 GB`, `462.0 MB`, or `13,16 GB` under a comma-decimal locale). Both
//! go through [`parse`].

/// Canonical "nothing found / unreadable / absent" size.
pub const ZERO_SIZE: &str = "0B";

const KIB: f64 = 1024.0;

/// Parses a size string into bytes. Anything unrecognised yields 0.
pub fn parse(text: &str) -> u64 {
    let s = text.trim();
    parse_compact(s).or_else(|| parse_spaced(s)).unwrap_or(0)
}

/// Renders a byte count in the spaced shape using 1024-based units.
pub fn format(bytes: u64) -> String {
    if bytes == 0 {
        return ZERO_SIZE.to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / KIB;
    let mut unit = 0;
    while value >= KIB && unit < 3 {
        value /= KIB;
        unit += 1;
    }

    match unit {
        0 => format!("{:.0} KB", value.max(1.0)),
        1 => format!("{value:.1} MB"),
        2 => format!("{value:.2} GB"),
        _ => format!("{value:.2} TB"),
    }
}

/// Largest value in a list of size strings, 0 for an empty list.
pub fn max_of<I, S>(texts: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .map(|t| parse(t.as_ref()))
        .max()
        .unwrap_or(0)
}

/// `<number><unit>` with a single-letter unit, as printed by `du -h`.
fn parse_compact(s: &str) -> Option<u64> {
    let unit = s.chars().last()?;
    let exponent = match unit {
        'B' => 0,
        'K' => 1,
        'M' => 2,
        'G' => 3,
        'T' => 4,
        _ => return None,
    };
    let number = &s[..s.len() - 1];
    if !is_plain_number(number) {
        return None;
    }
    Some(scale(number.parse().ok()?, exponent))
}

/// `<number> <unit>` with a spelled-out unit; the number may use a decimal comma.
fn parse_spaced(s: &str) -> Option<u64> {
    let (number, unit) = s.split_once(' ')?;
    if unit.contains(' ') {
        return None;
    }
    let exponent = match unit.to_ascii_uppercase().as_str() {
        "B" | "BYTES" => 0,
        "KB" => 1,
        "MB" => 2,
        "GB" => 3,
        "TB" => 4,
        _ => return None,
    };
    let number = number.replace(',', ".");
    if !is_plain_number(&number) {
        return None;
    }
    Some(scale(number.parse().ok()?, exponent))
}

fn is_plain_number(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
        && s.matches('.').count() <= 1
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(value: f64, exponent: i32) -> u64 {
    (value * KIB.powi(exponent)).round() as u64
}
