/// Character spans `(offset, length)` of the words in `text`.
///
/// A word is a maximal run of alphanumeric characters, apostrophes and
/// hyphens.
pub fn word_spans(text: &str) -> Vec<(u32, u32)> {
    let mut spans = Vec::new();
    let mut start: Option<u32> = None;
    let mut idx = 0u32;

    for ch in text.chars() {
        let in_word = ch.is_alphanumeric() || ch == '\'' || ch == '-';
        match (in_word, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx - s));
                start = None;
            }
            _ => {}
        }
        idx += 1;
    }
    if let Some(s) = start {
        spans.push((s, idx - s));
    }
    spans
}

/// Leading integer of a bookmark's text, 0 when there is none or it does not
/// fit.
///
/// Leading whitespace and a sign are accepted and trailing text is ignored,
/// so `" 12abc"` is 12.
pub fn parse_bookmark_id(text: &str) -> i32 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }

    let magnitude: i64 = match digits[..end].parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_include_apostrophes_and_hyphens() {
        assert_eq!(word_spans("It's a test-case"), vec![(0, 4), (5, 1), (7, 9)]);
    }

    #[test]
    fn words_around_punctuation() {
        assert_eq!(word_spans("  Hello, world!  "), vec![(2, 5), (9, 5)]);
        assert_eq!(word_spans("...;"), vec![]);
        assert_eq!(word_spans(""), vec![]);
    }

    #[test]
    fn word_offsets_count_characters() {
        assert_eq!(word_spans("über café"), vec![(0, 4), (5, 4)]);
    }

    #[test]
    fn bookmark_ids() {
        assert_eq!(parse_bookmark_id("42"), 42);
        assert_eq!(parse_bookmark_id(" 12abc"), 12);
        assert_eq!(parse_bookmark_id("-7"), -7);
        assert_eq!(parse_bookmark_id("+3"), 3);
        assert_eq!(parse_bookmark_id("chapter"), 0);
        assert_eq!(parse_bookmark_id(""), 0);
        assert_eq!(parse_bookmark_id("99999999999"), 0);
        assert_eq!(parse_bookmark_id("999999999999999999999999"), 0);
    }
}
