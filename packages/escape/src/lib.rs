//! Line-level escaping codec for the gridconf text format.
//!
//! Everything at this level is plain text. No grammar, no key/value
//! semantics - those belong in higher layers. The codec guarantees one
//! thing: a value that went through [`encode`] survives a trip through
//! a line-oriented file with `#` comments and comes back out of
//! [`decode`] trimmed but otherwise intact.

/// Encode a value so it can sit on a single line of a config file.
///
/// Surrounding whitespace is trimmed first; it would not survive
/// [`decode`] anyway. Then the characters that carry meaning on a line
/// are escaped:
///
/// - `\` becomes `\\`
/// - `#` becomes `\#` (so values may contain the comment marker)
/// - a literal newline becomes `\n`
/// - a literal carriage return becomes `\r`
pub fn encode(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '#' => out.push_str("\\#"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Collecting,
    Escape,
    Comment,
}

/// Decode one raw line from a config file.
///
/// Leading blanks are skipped, escapes are resolved, and an unescaped
/// `#` starts a comment that runs to the end of the line. The comment
/// marker is never escapable once inside a comment. Trailing blanks
/// before a comment or end-of-line are dropped: the scanner keeps a
/// "last significant length" marker and truncates to it, so only
/// whitespace that is followed by a non-blank character survives.
///
/// A line that is blank or holds nothing but a comment decodes to the
/// empty string.
///
/// For any `s` without raw newline/CR, `decode(&encode(s)) == s.trim()`.
pub fn decode(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    // Length of `result` up to and including the last non-blank char.
    let mut significant = 0;
    let mut state = State::Start;

    for c in line.chars() {
        match state {
            State::Start => {
                if c == ' ' || c == '\t' {
                    // Keep eating leading blanks.
                } else if c == '\\' {
                    state = State::Escape;
                } else if c == '#' {
                    state = State::Comment;
                } else {
                    state = State::Collecting;
                    result.push(c);
                    significant = result.len();
                }
            }
            State::Collecting => {
                if c == '\\' {
                    state = State::Escape;
                } else if c == '#' {
                    state = State::Comment;
                } else {
                    result.push(c);
                    if c != ' ' && c != '\t' {
                        significant = result.len();
                    }
                }
            }
            State::Escape => {
                match c {
                    'n' => {
                        result.push('\n');
                        significant = result.len();
                    }
                    'r' => {
                        result.push('\r');
                        significant = result.len();
                    }
                    _ => {
                        result.push(c);
                        if c != ' ' && c != '\t' {
                            significant = result.len();
                        }
                    }
                }
                state = State::Collecting;
            }
            State::Comment => {
                // Consumed to end of line, never escapable.
            }
        }
    }

    result.truncate(significant);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_escapes_specials() {
        assert_eq!(encode("a\\b"), "a\\\\b");
        assert_eq!(encode("pound #1"), "pound \\#1");
        assert_eq!(encode("two\nlines"), "two\\nlines");
        assert_eq!(encode("cr\rhere"), "cr\\rhere");
    }

    #[test]
    fn encode_trims() {
        assert_eq!(encode("  padded  "), "padded");
        assert_eq!(encode("\t\t"), "");
    }

    #[test]
    fn decode_plain_line() {
        assert_eq!(decode("hello world"), "hello world");
    }

    #[test]
    fn decode_skips_leading_blanks() {
        assert_eq!(decode("   \t value"), "value");
    }

    #[test]
    fn decode_drops_comment() {
        assert_eq!(decode("value # a comment"), "value");
        assert_eq!(decode("# only a comment"), "");
        assert_eq!(decode("   "), "");
        assert_eq!(decode(""), "");
    }

    #[test]
    fn decode_trailing_blanks_before_comment_dropped() {
        // The blanks are buffered while scanning but fall past the last
        // significant length.
        assert_eq!(decode("value   \t# comment"), "value");
        assert_eq!(decode("value   "), "value");
    }

    #[test]
    fn decode_inner_blanks_survive() {
        assert_eq!(decode("a b  c"), "a b  c");
    }

    #[test]
    fn decode_resolves_escapes() {
        assert_eq!(decode("a\\#b"), "a#b");
        assert_eq!(decode("a\\\\b"), "a\\b");
        assert_eq!(decode("a\\nb"), "a\nb");
        assert_eq!(decode("a\\rb"), "a\rb");
        // Unknown escapes pass the character through literally.
        assert_eq!(decode("a\\xb"), "axb");
    }

    #[test]
    fn decode_comment_is_never_escapable() {
        // Once in a comment, a backslash is just comment text.
        assert_eq!(decode("value # comment \\# still comment"), "value");
    }

    #[test]
    fn round_trip_is_trim() {
        let cases = [
            "plain",
            "  spaces around  ",
            "inner  spaces kept",
            "hash # in the middle",
            "back\\slash",
            "multi\nline\rvalue",
            "",
            "   ",
            "trailing escape char \\",
        ];
        for case in cases {
            assert_eq!(decode(&encode(case)), case.trim(), "case: {:?}", case);
        }
    }
}
