//! Chilean RUT (national id) check digit validation.
//!
//! A RUT is a run of body digits followed by one check character (`0`-`9` or `K`).
//! Dots, hyphens and whitespace are accepted as separators on input.

fn strip(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | '-') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Computes the check character for a string of body digits.
///
/// Returns `None` when the body is empty or contains anything other than ASCII digits.
pub fn check_digit(body: &str) -> Option<char> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let sum: u32 = body
        .bytes()
        .rev()
        .zip((2..=7).cycle())
        .map(|(digit, weight)| u32::from(digit - b'0') * weight)
        .sum();

    Some(match 11 - sum % 11 {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10)?,
    })
}

fn split(stripped: &str) -> Option<(&str, char)> {
    let dv = stripped.chars().last()?;
    let body = &stripped[..stripped.len() - dv.len_utf8()];
    (!body.is_empty()).then_some((body, dv))
}

pub fn is_valid(raw: &str) -> bool {
    let stripped = strip(raw);
    match split(&stripped) {
        Some((body, dv)) => check_digit(body) == Some(dv),
        None => false,
    }
}

/// Canonical `BODY-DV` form of a valid RUT, e.g. `12.345.678-5` becomes `12345678-5`.
pub fn normalize(raw: &str) -> Option<String> {
    let stripped = strip(raw);
    let (body, dv) = split(&stripped)?;
    (check_digit(body) == Some(dv)).then(|| format!("{body}-{dv}"))
}
