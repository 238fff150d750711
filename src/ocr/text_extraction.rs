/// Text extraction for numeric HUD readouts
///
/// OCR output for counters is noisy even with a digit whitelist (stray
/// spaces, newlines, the odd letter). Only the digits are kept and read as a
/// base-10 number.

/// Concatenate every ASCII digit in `text` and parse the result.
///
/// # Returns
/// `None` when there are no digits or the number does not fit in a `u32`.
///
/// # Examples
/// ```
/// # use metro_vision::ocr::text_extraction::parse_digits;
/// assert_eq!(parse_digits("1 234\n"), Some(1234));
/// assert_eq!(parse_digits("score: 07"), Some(7));
/// assert_eq!(parse_digits("no digits"), None);
/// ```
pub fn parse_digits(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_digits("42"), Some(42));
        assert_eq!(parse_digits(" 4 2 "), Some(42));
        assert_eq!(parse_digits("0"), Some(0));
        assert_eq!(parse_digits("x1y2z3"), Some(123));
    }

    #[test]
    fn test_parse_digits_failures() {
        assert_eq!(parse_digits(""), None);
        assert_eq!(parse_digits("   \n"), None);
        assert_eq!(parse_digits("O l"), None);
        // Overflow degrades the same way as no digits
        assert_eq!(parse_digits("99999999999999999999"), None);
    }

    #[test]
    fn test_parse_digits_ignores_non_ascii_digits() {
        // Arabic-Indic digits are not part of the whitelist
        assert_eq!(parse_digits("٣7"), Some(7));
    }
}
