// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises extracted document text before it is tokenized.
//
// Word documents carry a lot of invisible noise: non-breaking
// spaces, zero-width spaces, byte order marks, tabs from tables,
// Windows line endings. Left alone, these end up inside answer
// text and make offsets harder to reason about.
//
// Rules:
//   - any Unicode whitespace or control character becomes a
//     plain space, except line breaks
//   - \r\n and lone \r become \n
//   - runs of spaces collapse to one; lines are trimmed
//   - at most one blank line survives between paragraphs
//
// Answers are always reported against the CLEANED text, so the
// reader must be given the same string the offsets refer to.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");

        let mut out       = String::with_capacity(unified.len());
        let mut blank_run = 0usize;
        let mut wrote_any = false;

        for line in unified.split('\n') {
            let line = collapse_spaces(line);

            if line.is_empty() {
                blank_run += 1;
                continue;
            }

            if wrote_any {
                // One newline ends the previous line; a second one
                // keeps a single paragraph break.
                out.push('\n');
                if blank_run > 0 {
                    out.push('\n');
                }
            }
            out.push_str(&line);
            wrote_any = true;
            blank_run = 0;
        }

        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map every space-like or control character to ' ', squeeze runs, trim.
fn collapse_spaces(line: &str) -> String {
    let mut out        = String::with_capacity(line.len());
    let mut last_space = true;

    for c in line.chars() {
        let is_space = c.is_whitespace() || c.is_control() || matches!(c, '\u{200B}' | '\u{FEFF}');
        if is_space {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        assert_eq!(Preprocessor::new().clean("Super   Bowl\t50"), "Super Bowl 50");
    }

    #[test]
    fn test_invisible_characters_become_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Levi's\u{00A0}Stadium"), "Levi's Stadium");
        assert_eq!(p.clean("\u{FEFF}Santa\u{200B}Clara"), "Santa Clara");
        assert_eq!(p.clean("gold\x01themed"), "gold themed");
    }

    #[test]
    fn test_windows_line_endings() {
        assert_eq!(Preprocessor::new().clean("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_keeps_one_paragraph_break() {
        let out = Preprocessor::new().clean("  first  \n\n\n\n  second\nthird ");
        assert_eq!(out, "first\n\nsecond\nthird");
    }

    #[test]
    fn test_empty_and_blank() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean(" \n \t \n"), "");
    }
}
