//! Cleanup: deterministic normalisation of raw cell and label text.
//!
//! ## Why clean once at ingestion?
//!
//! The layout engine hands back cells that may be absent, empty, padded, or
//! split across several physical lines (`"[34]\nIdentificación\nAportante"`).
//! Every later stage (schema matching, row classification, record building)
//! needs the same view of a cell, so the rules here run exactly once when a
//! [`crate::model::Cell`] is built and never again at a classification site.
//!
//! ## Rule Order
//!
//! Line endings are normalised before splitting, invisible characters are
//! stripped before trimming (a BOM would otherwise survive `trim`), and
//! whitespace is collapsed per line before the lines are joined.

/// Apply all cell cleanup rules, returning the cleaned lines.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Split into lines, collapse internal whitespace runs, trim each line
/// 4. Drop lines that end up empty
pub fn clean_lines(input: &str) -> Vec<String> {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    s.split('\n')
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Lowercase and strip Spanish diacritics so that `"Identificación"`,
/// `"IDENTIFICACION"` and `"identificacion"` compare equal.
pub fn fold(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Collapse whitespace inside a line ────────────────────────────────

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  JUAN   PEREZ \t "), "JUAN PEREZ");
    }

    #[test]
    fn test_clean_lines_multiline_header() {
        let lines = clean_lines("[34]\r\nIdentificación\n\n  Aportante ");
        assert_eq!(lines, vec!["[34]", "Identificación", "Aportante"]);
    }

    #[test]
    fn test_clean_lines_blank_input() {
        assert!(clean_lines("  \n \u{FEFF} ").is_empty());
    }

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("IDENTIFICACIÓN Aportante"), "identificacion aportante");
        assert_eq!(fold("Días Cot."), "dias cot.");
        assert_eq!(fold("Año"), "ano");
    }
}
