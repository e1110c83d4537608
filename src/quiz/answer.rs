use std::collections::HashSet;

/// Canonical form of a free-text answer used for comparison.
///
/// Asides in `[...]` and `(...)` are dropped, everything from the first period on is cut,
/// quotes and punctuation other than commas are removed, and the rest is lower-cased with
/// whitespace collapsed. Nested brackets are not supported.
pub fn normalize(text: &str) -> String {
    let text = strip_delimited(text, '[', ']');
    let text = strip_delimited(&text, '(', ')');
    let text = match text.split_once('.') {
        Some((head, _)) => head,
        None => text.as_str(),
    };

    // Lower-case first, it can produce combining marks the filter has to drop.
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|&c| c != '"' && c != '\'')
        .filter(|&c| is_word_char(c) || c.is_whitespace() || c == ',')
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compares a user's reply with the reference answer.
///
/// A reference with commas lists several required parts; the reply must name exactly the
/// same parts in any order.
pub fn check_answer(user_answer: &str, correct_answer: &str) -> bool {
    let norm_user = normalize(user_answer);
    let norm_correct = normalize(correct_answer);

    if norm_correct.contains(',') {
        return answer_parts(&norm_correct) == answer_parts(&norm_user);
    }
    norm_user == norm_correct
}

fn answer_parts(text: &str) -> HashSet<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// Removes every `open ... close` span on a single line, shortest match first.
fn strip_delimited(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let after_open = &rest[start + open.len_utf8()..];
        let line_end = after_open.find('\n').unwrap_or(after_open.len());
        match after_open[..line_end].find(close) {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after_open[end + close.len_utf8()..];
            }
            None => {
                out.push_str(&rest[..start + open.len_utf8()]);
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}
