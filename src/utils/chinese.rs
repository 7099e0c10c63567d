//! Chinese text utilities.

/// Check if two titles are the same when normalized.
pub fn titles_equivalent(a: &str, b: &str) -> bool {
    // TODO: fold Traditional/Simplified variants so 阿凡達 matches 阿凡达
    let (a, b) = (normalize(a), normalize(b));
    !a.is_empty() && a == b
}

/// Normalize a title for comparison: lowercase, without whitespace or punctuation.
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Check if a string contains Chinese characters.
pub fn contains_chinese(s: &str) -> bool {
    s.chars().any(is_chinese_char)
}

/// Check if a character is a Chinese character.
fn is_chinese_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |  // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |  // CJK Unified Ideographs Extension A
        '\u{F900}'..='\u{FAFF}' |  // CJK Compatibility Ideographs
        '\u{20000}'..='\u{2A6DF}'  // CJK Unified Ideographs Extension B
    )
}
