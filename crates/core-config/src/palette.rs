//! Named SGR colors and the resolved highlight palette.

pub const NORMAL: &str = "\x1b[0m";

const NAMED: &[(&str, &str)] = &[
    ("Normal", NORMAL),
    ("Red", "\x1b[31m"),
    ("Green", "\x1b[32m"),
    ("Yellow", "\x1b[33m"),
    ("Blue", "\x1b[34m"),
    ("Magenta", "\x1b[35m"),
    ("Cyan", "\x1b[36m"),
    ("White", "\x1b[37m"),
    ("BgRed", "\x1b[41m"),
    ("BgGreen", "\x1b[42m"),
    ("BgYellow", "\x1b[43m"),
    ("BgBlue", "\x1b[44m"),
    ("BgMagenta", "\x1b[45m"),
    ("BgCyan", "\x1b[46m"),
    ("BgWhite", "\x1b[47m"),
    ("RedB", "\x1b[31;1m"),
    ("GreenB", "\x1b[32;1m"),
    ("YellowB", "\x1b[33;1m"),
    ("BlueB", "\x1b[34;1m"),
    ("MagentaB", "\x1b[35;1m"),
    ("CyanB", "\x1b[36;1m"),
    ("WhiteB", "\x1b[37;1m"),
    ("Red_", "\x1b[31;4m"),
    ("Green_", "\x1b[32;4m"),
    ("Yellow_", "\x1b[33;4m"),
    ("Blue_", "\x1b[34;4m"),
    ("Magenta_", "\x1b[35;4m"),
    ("Cyan_", "\x1b[36;4m"),
    ("White_", "\x1b[37;4m"),
];

/// Map a color name to its escape sequence. Unknown names pass through
/// verbatim so users can supply raw sequences.
pub fn resolve_color(name: &str) -> String {
    NAMED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, seq)| (*seq).to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Escape sequences wrapped around a highlighted line.
///
/// * `line_start` / `line_end` bracket the whole line (unchanged style).
/// * `word_start` opens a run of changed bytes, `word_end` closes it and must
///   restore the unchanged style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightPalette {
    pub line_start: String,
    pub line_end: String,
    pub word_start: String,
    pub word_end: String,
}

impl Default for HighlightPalette {
    fn default() -> Self {
        Self::from_names("Normal", "Normal", "RedB", "")
    }
}

impl HighlightPalette {
    pub fn from_names(line_color: &str, line_end: &str, word_color: &str, word_end: &str) -> Self {
        let line_start = resolve_color(line_color);
        let word_end = if word_end.is_empty() && line_start == NORMAL {
            NORMAL.to_string()
        } else if word_end.is_empty() {
            format!("{NORMAL}{line_start}")
        } else {
            resolve_color(word_end)
        };
        Self {
            line_end: resolve_color(line_end),
            word_start: resolve_color(word_color),
            word_end,
            line_start,
        }
    }
}
