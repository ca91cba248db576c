//! German locale formatting for figures copied out of assessment texts.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::NOT_AVAILABLE;

const THOUSANDS_SEPARATOR: char = '.';
const GENERATION_SUFFIX: &str = " Jahre";

fn digit_run() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Regroups every ASCII digit run in `text` with `.` thousands separators.
///
/// Text around the runs is kept verbatim, so `"1000-2000"` becomes
/// `"1.000-2.000"`. Every run is treated as a number, including years that
/// happen to appear in free text.
pub fn group_digit_runs(text: &str) -> String {
    digit_run()
        .replace_all(text, |caps: &regex::Captures<'_>| group_thousands(&caps[0]))
        .into_owned()
}

/// Groups a plain digit string. Leading zeros are dropped like a numeric parse
/// would, `"0"` stays `"0"`.
pub fn group_thousands(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return "0".to_string();
    }

    let len = trimmed.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Renders a generation length in years with a decimal comma.
///
/// Only the first `.` is converted. `"n/a"` passes through unchanged.
pub fn generation_length(value: &str) -> String {
    if value == NOT_AVAILABLE {
        return value.to_string();
    }
    format!("{}{GENERATION_SUFFIX}", value.replacen('.', ",", 1))
}
