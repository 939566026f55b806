//! Byte-size parsing and formatting with binary (1024-based) units

const BINARY_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Parse a size string such as `4GiB`, `512M`, `1.5g` or `1024` into bytes.
///
/// Every suffix is 1024-based regardless of whether it is written `G`, `GB` or
/// `GiB`. Returns `None` when the string is not a size.
pub fn parse_ram_size(s: &str) -> Option<i64> {
    let s = s.trim();
    let number_end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, rest) = s.split_at(number_end);

    if !number.starts_with(|c: char| c.is_ascii_digit()) || number.ends_with('.') {
        return None;
    }
    let value: f64 = number.parse().ok()?;

    let mut suffix = rest.strip_prefix(' ').unwrap_or(rest).chars().peekable();
    let multiplier: i64 = match suffix.peek().map(|c| c.to_ascii_lowercase()) {
        Some('k') => 1 << 10,
        Some('m') => 1 << 20,
        Some('g') => 1 << 30,
        Some('t') => 1 << 40,
        Some('p') => 1 << 50,
        _ => 1,
    };
    if multiplier != 1 {
        suffix.next();
    }
    if matches!(suffix.peek(), Some('i' | 'I')) {
        suffix.next();
    }
    if matches!(suffix.peek(), Some('b' | 'B')) {
        suffix.next();
    }
    if suffix.next().is_some() {
        return None;
    }

    Some((value * multiplier as f64) as i64)
}

/// Render a byte count with the largest fitting binary unit, e.g. `2GiB` or `1.5MiB`
pub fn human_size(bytes: i64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size.abs() >= 1024.0 && unit < BINARY_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{}{}", significant(size, 4), BINARY_UNITS[unit])
}

/// Format with at most `digits` significant digits, dropping trailing zeros
fn significant(value: f64, digits: i32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - exponent).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}
