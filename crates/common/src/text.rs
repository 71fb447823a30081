/// Truncate `text` to at most `max_chars` characters, appending `…` when cut.
///
/// Counts `char`s, never splits a code point.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some(_) => {
            let keep: String = text.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{keep}…")
        },
    }
}

/// Return the last `n` non-empty lines of `text`, oldest first.
#[must_use]
pub fn tail_lines(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].to_vec()
}
