//! Character-level change highlighting for a single line.

use core_config::HighlightPalette;

/// Colour settings plus the decay window length used by the diff pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightPolicy {
    pub count_max: usize,
    pub palette: HighlightPalette,
}

impl HighlightPolicy {
    pub fn new(count_max: usize, palette: HighlightPalette) -> Self {
        Self { count_max, palette }
    }

    /// Streak value assigned to a line the tick it changes.
    pub fn fresh_streak(&self) -> usize {
        self.count_max.saturating_add(1)
    }
}

impl Default for HighlightPolicy {
    fn default() -> Self {
        Self::new(core_config::COUNT_MAX_DEFAULT, HighlightPalette::default())
    }
}

/// Render `new` wrapped in the line colour, with every run of characters
/// that differs from `old` at the same byte offset wrapped in the word
/// colour. Bytes of `new` past the end of `old` count as different.
pub fn highlight_line(old: &str, new: &str, palette: &HighlightPalette) -> String {
    let old = old.as_bytes();
    let mut out = String::with_capacity(
        new.len() + palette.line_start.len() + palette.line_end.len() + 16,
    );
    out.push_str(&palette.line_start);
    let mut in_run = false;
    for (offset, ch) in new.char_indices() {
        let width = ch.len_utf8();
        let same = old.get(offset..offset + width) == Some(&new.as_bytes()[offset..offset + width]);
        if !same && !in_run {
            out.push_str(&palette.word_start);
            in_run = true;
        } else if same && in_run {
            out.push_str(&palette.word_end);
            in_run = false;
        }
        out.push(ch);
    }
    out.push_str(&palette.line_end);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> HighlightPalette {
        HighlightPalette {
            line_start: "<L>".into(),
            line_end: "</L>".into(),
            word_start: "<W>".into(),
            word_end: "</W>".into(),
        }
    }

    #[test]
    fn identical_lines_only_get_line_colour() {
        assert_eq!(highlight_line("abc", "abc", &tags()), "<L>abc</L>");
    }

    #[test]
    fn marks_each_differing_run() {
        assert_eq!(
            highlight_line("12:00:01 ok", "12:00:02 no", &tags()),
            "<L>12:00:0<W>2</W> <W>no</L>"
        );
    }

    #[test]
    fn tail_past_old_length_is_highlighted() {
        assert_eq!(highlight_line("ab", "abcd", &tags()), "<L>ab<W>cd</L>");
        assert_eq!(highlight_line("", "x", &tags()), "<L><W>x</L>");
    }

    #[test]
    fn shorter_new_line_has_no_trailing_marker() {
        assert_eq!(highlight_line("abcd", "ab", &tags()), "<L>ab</L>");
    }

    #[test]
    fn multibyte_chars_are_never_split() {
        let out = highlight_line("aéb", "aüb", &tags());
        assert_eq!(out, "<L>a<W>ü</W>b</L>");
        // Old text is shorter in bytes at the comparison point.
        let out = highlight_line("a", "a日", &tags());
        assert_eq!(out, "<L>a<W>日</L>");
    }

    #[test]
    fn fresh_streak_is_one_past_count_max() {
        let p = HighlightPolicy::new(3, HighlightPalette::default());
        assert_eq!(p.fresh_streak(), 4);
    }
}
