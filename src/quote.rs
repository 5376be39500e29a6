//! Quoted-string primitives shared by the PO reader and writer.
//!
//! A PO string literal is a single physical line wrapped in quotes. Reading
//! concatenates literals and decodes C-style escapes; writing escapes and
//! wraps long content over several quoted lines. The two directions are
//! asymmetric on purpose: round-tripping is lossless in *content*, not in
//! byte layout.

/// Column at which [`format_string`] wraps output lines.
const WRAP_COLUMNS: usize = 70;

/// Parses a single quoted PO token into its string content.
///
/// Double-quoted tokens undergo C-style escape decoding; single-quoted
/// tokens are returned verbatim. Returns `None` when the token is not
/// wrapped in a matching pair of quotes.
pub fn parse_quoted(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if first != last {
        return None;
    }
    let inner = &token[first.len_utf8()..token.len() - last.len_utf8()];
    match first {
        '"' => Some(unescape(inner)),
        '\'' => Some(inner.to_string()),
        _ => None,
    }
}

/// Decodes C-style backslash escapes: the named escapes, octal sequences of
/// up to three digits and `\xHH` hex sequences. An unknown escape decodes to
/// the escaped character itself.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{0B}'),
            Some('f') => out.push('\u{0C}'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('x') => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    out.push('x');
                } else if let Some(decoded) = char::from_u32(value) {
                    out.push(decoded);
                }
            }
            Some(d @ '0'..='7') => {
                let mut value = d as u32 - '0' as u32;
                let mut digits = 1;
                while digits < 3 {
                    match chars.peek().and_then(|o| o.to_digit(8)) {
                        Some(o) => {
                            value = value * 8 + o;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if let Some(decoded) = char::from_u32(value) {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            // A trailing lone backslash decodes to nothing.
            None => {}
        }
    }
    out
}

/// Escapes control characters, backslashes and double quotes.
///
/// Control characters with a named C escape use it; the rest are written as
/// three-digit octal sequences.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            '\u{0C}' => out.push_str("\\f"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Formats a string as one or more quoted PO output lines.
///
/// The content is escaped, a real line break is forced after every literal
/// `\n` escape, and each resulting segment is wrapped at 70 columns breaking
/// at spaces. The space at a wrap point stays at the end of its line, so
/// concatenating the quoted segments reproduces the escaped content exactly.
///
/// Single-segment results render as `"..."`; multi-segment results open with
/// an empty `""` line so all continuation lines align on the same column.
/// Every returned value is newline-terminated.
pub fn format_string(input: &str) -> String {
    let escaped = escape(input);
    // Force a break after each literal \n escape to keep multi-line
    // translations readable.
    let broken = escaped.replace("\\n", "\\n\n");
    let wrapped = word_wrap(&broken, WRAP_COLUMNS);

    let parts: Vec<&str> = wrapped.split('\n').collect();
    if parts.len() > 1 {
        let mut out = String::with_capacity(wrapped.len() + parts.len() * 3 + 3);
        out.push_str("\"\"\n");
        for part in parts {
            out.push('"');
            out.push_str(part);
            out.push_str("\"\n");
        }
        out
    } else {
        format!("\"{}\"\n", parts[0])
    }
}

/// Greedy word wrap breaking at spaces only.
///
/// The space at a break point is kept at the end of the line. Words longer
/// than `width` are not cut. Existing newlines delimit segments that wrap
/// independently.
fn word_wrap(input: &str, width: usize) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for (i, segment) in input.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut line_len = 0usize;
        for (j, word) in segment.split(' ').enumerate() {
            let word_len = word.chars().count();
            if j == 0 {
                out.push_str(word);
                line_len = word_len;
            } else if line_len + 1 + word_len > width {
                out.push_str(" \n");
                out.push_str(word);
                line_len = word_len;
            } else {
                out.push(' ');
                out.push_str(word);
                line_len += 1 + word_len;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Re-parses formatted output the way the reader would: one quoted
    /// token per line, contents concatenated.
    fn reparse(formatted: &str) -> String {
        formatted
            .lines()
            .map(|line| parse_quoted(line.trim()).expect("quoted line"))
            .collect()
    }

    #[test]
    fn test_parse_quoted_double_quotes_unescape() {
        assert_eq!(parse_quoted("\"a\\nb\""), Some("a\nb".to_string()));
        assert_eq!(parse_quoted("\"tab\\there\""), Some("tab\there".to_string()));
        assert_eq!(parse_quoted("\"\\\"x\\\"\""), Some("\"x\"".to_string()));
    }

    #[test]
    fn test_parse_quoted_single_quotes_verbatim() {
        assert_eq!(parse_quoted("'a\\nb'"), Some("a\\nb".to_string()));
    }

    #[test]
    fn test_parse_quoted_rejects_mismatched_quotes() {
        assert_eq!(parse_quoted("\"open"), None);
        assert_eq!(parse_quoted("'mixed\""), None);
        assert_eq!(parse_quoted("bare"), None);
        assert_eq!(parse_quoted(""), None);
    }

    #[test]
    fn test_unescape_octal_and_hex() {
        assert_eq!(unescape("\\101"), "A");
        assert_eq!(unescape("\\x41"), "A");
        // Octal stops after three digits.
        assert_eq!(unescape("\\1011"), "A1");
        // Unknown escape decodes to the character itself.
        assert_eq!(unescape("\\q"), "q");
    }

    #[test]
    fn test_escape_controls_as_octal() {
        assert_eq!(escape("\u{01}"), "\\001");
        assert_eq!(escape("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape("back\\slash \"quote\""), "back\\\\slash \\\"quote\\\"");
    }

    #[test]
    fn test_format_string_single_line() {
        assert_eq!(format_string("home"), "\"home\"\n");
    }

    #[test]
    fn test_format_string_breaks_after_newline_escape() {
        let formatted = format_string("a\nb");
        // The line break must come immediately after the escaped \n token.
        assert!(formatted.contains("\\n\"\n"));
        assert_eq!(formatted.lines().next(), Some("\"\""));
        assert_eq!(reparse(&formatted), "a\nb");
    }

    #[test]
    fn test_format_string_wraps_at_70_columns() {
        let long = "word ".repeat(40);
        let long = long.trim_end();
        let formatted = format_string(long);
        for line in formatted.lines() {
            // Two quote characters plus the kept break space of overhead.
            assert!(line.chars().count() <= WRAP_COLUMNS + 3, "line too long: {line}");
        }
        assert_eq!(reparse(&formatted), long);
    }

    #[test]
    fn test_format_string_roundtrip_preserves_spaces() {
        let content = "one  two   three \n indented";
        assert_eq!(reparse(&format_string(content)), content);
    }

    #[test]
    fn test_word_wrap_keeps_long_words_whole() {
        let word = "x".repeat(90);
        assert_eq!(word_wrap(&word, 70), word);
    }
}
