//! Sidebar titles derived from a chat's first message.

/// Words kept before the title is cut.
pub const TITLE_WORDS: usize = 4;

/// Marker appended to a cut title.
pub const ELLIPSIS: &str = "...";

/// Builds a chat title from the first user message.
///
/// Text of up to four words is used as-is. Longer text keeps its first four
/// words, without trailing punctuation, joined by single spaces and followed
/// by `...`. A word made only of punctuation is kept whole.
pub fn generate_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= TITLE_WORDS {
        return text.to_string();
    }

    let head: Vec<&str> = words[..TITLE_WORDS]
        .iter()
        .map(|&w| match w.trim_end_matches(|c: char| c.is_ascii_punctuation()) {
            "" => w,
            trimmed => trimmed,
        })
        .collect();
    format!("{}{ELLIPSIS}", head.join(" "))
}
