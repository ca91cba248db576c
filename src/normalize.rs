//! Asset name normalization.
//!
//! Maps free-text species names onto the identifier space used for file names
//! and public asset URLs. Consumers rebuild asset URLs from the display name
//! with this exact transform, so any change here breaks published links.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const UNKNOWN: &str = "unknown";

const TRANSLITERATIONS: &[(char, &str)] = &[
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
    ('ß', "ss"),
    ('æ', "ae"),
    ('Æ', "Ae"),
    ('œ', "oe"),
    ('Œ', "Oe"),
    ('ø', "o"),
    ('Ø', "O"),
    ('å', "a"),
    ('Å', "A"),
    ('ð', "d"),
    ('Ð', "D"),
    ('þ', "th"),
    ('Þ', "Th"),
    ('ł', "l"),
    ('Ł', "L"),
];

const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Normalizes `input` into a non-empty, filesystem- and URL-path-safe name.
///
/// `None` is treated like the empty string. The transform is idempotent.
pub fn asset_name(input: Option<&str>) -> String {
    let input = input.unwrap_or("");

    let stage = replace_symbols(&transliterate_all(input));

    // Compatibility decomposition can surface table letters and symbols again
    // (modifier letter AE, small ampersand, fullwidth quotes), so both passes
    // run a second time afterwards.
    let decomposed: String = stage.nfkd().filter(|ch| !is_combining_mark(*ch)).collect();
    let decomposed = replace_symbols(&transliterate_all(&decomposed));

    let sanitized: String = decomposed
        .chars()
        .map(|ch| {
            if RESERVED.contains(&ch) || is_control(ch) {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let collapsed = collapse_runs(&sanitized);
    let trimmed = collapsed.trim().trim_matches(is_edge_separator);

    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

fn transliterate_all(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match transliterate(ch) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    out
}

fn transliterate(ch: char) -> Option<&'static str> {
    TRANSLITERATIONS
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

fn replace_symbols(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str(" and "),
            '@' => out.push_str(" at "),
            '+' => out.push_str(" plus "),
            '\u{2019}' | '\u{2018}' | '\u{201A}' | '\u{201B}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            other => out.push(other),
        }
    }
    out
}

fn is_control(ch: char) -> bool {
    matches!(ch, '\u{0000}'..='\u{001F}' | '\u{007F}')
}

fn is_edge_separator(ch: char) -> bool {
    ch == '.' || ch == '_' || ch == '-' || ch.is_whitespace()
}

fn collapse_runs(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_space = false;
    let mut prev_underscore = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
            prev_underscore = false;
        } else if ch == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
            prev_space = false;
        } else {
            out.push(ch);
            prev_space = false;
            prev_underscore = false;
        }
    }
    out
}
