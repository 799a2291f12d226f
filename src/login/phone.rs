use regex::Regex;

/// Country code prefixed to every entered number.
pub const DEFAULT_COUNTRY_CODE: &str = "+380";

/// Keeps the ASCII digits of `raw` in order and prefixes `country_code`.
///
/// Leading digits that repeat the tail of the country code are written once,
/// so the national trunk `0` and a fully typed `380` both collapse:
/// `"(050) 123-45-67"`, `"50 123 45 67"` and `"380501234567"` all become
/// `"+380501234567"` with the default code.
#[must_use]
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let code_digits = country_code.trim_start_matches('+');

    let overlap = (1..=code_digits.len().min(digits.len()))
        .rev()
        .find(|&len| code_digits.ends_with(&digits[..len]))
        .unwrap_or(0);

    format!("{country_code}{}", &digits[overlap..])
}

/// A country code is `+` followed by one to four digits.
#[must_use]
pub fn valid_country_code(code: &str) -> bool {
    Regex::new(r"^\+[0-9]{1,4}$").map_or(false, |re| re.is_match(code))
}
