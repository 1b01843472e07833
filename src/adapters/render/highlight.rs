use nucleo::pattern::{CaseMatching, Normalization, Pattern};
use nucleo::{Config, Matcher, Utf32Str};

/// Wrap the characters of `text` that fuzzy-match `query` in `**`.
/// Returns `None` when the query is blank or does not match.
pub fn highlight_matches(text: &str, query: &str) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);

    // One haystack slot per `char`; `Utf32Str::new` would fold graphemes and
    // shift the indices on combining marks.
    let chars: Vec<char> = text.chars().collect();
    let mut indices = Vec::new();
    pattern.indices(Utf32Str::Unicode(&chars), &mut matcher, &mut indices)?;
    indices.sort_unstable();
    indices.dedup();

    let mut highlighted = String::with_capacity(text.len() + indices.len() * 4);
    let mut in_match = false;
    let mut next = indices.iter().peekable();

    for (i, &c) in chars.iter().enumerate() {
        let matched = next.peek().map(|&&idx| idx as usize == i).unwrap_or(false);
        if matched {
            next.next();
        }
        if matched != in_match {
            highlighted.push_str("**");
            in_match = matched;
        }
        highlighted.push(c);
    }
    if in_match {
        highlighted.push_str("**");
    }

    Some(highlighted)
}
