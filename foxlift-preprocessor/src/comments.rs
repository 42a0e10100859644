//! Rewriting of comments into the one form the translator understands: a line starting with `*`.

use std::sync::OnceLock;

use regex::Regex;

/// `&& text` becomes `* text` on a line of its own.
pub fn inline_comment(text: &str) -> String {
    format!("*{}\n", text.strip_prefix("&&").unwrap_or(text))
}

/// Splits a comment continued with `;` into separate lines, each starting with a single `*`.
pub fn line_comment(text: &str) -> String {
    static CONTINUATION: OnceLock<Regex> = OnceLock::new();
    static MARKER: OnceLock<Regex> = OnceLock::new();

    let text = text.trim();
    if text.is_empty() {
        return text.to_owned();
    }
    let continuation = CONTINUATION.get_or_init(|| {
        Regex::new(r";[ \t]*\r*\n").expect("continuation pattern must be valid")
    });
    let marker =
        MARKER.get_or_init(|| Regex::new(r"^\s*\*?").expect("marker pattern must be valid"));

    continuation
        .replace_all(text, "\n")
        .split('\n')
        .map(|line| format!("{}\n", marker.replace(line, "*")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_comments() {
        assert_eq!(inline_comment("&& total so far"), "* total so far\n");
    }

    #[test]
    fn line_comments() {
        assert_eq!(line_comment("* hello\n"), "* hello\n");
        assert_eq!(line_comment("** box **\r\n"), "** box **\n");
        assert_eq!(line_comment("NOTE old style\n"), "*NOTE old style\n");
        assert_eq!(
            line_comment("* first ;\n   second;  \r\n  * third\n"),
            "* first \n*second\n* third\n"
        );
    }
}
