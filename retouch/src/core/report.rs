//! Parsing of raw `git diff --name-only` output into reported lines.

/// Ordered lines reported by one "list changed files" invocation.
///
/// Lines are kept verbatim apart from the line terminator. Blank lines carry
/// no information and are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    lines: Vec<String>,
}

impl ChangeReport {
    /// Split raw tool output into non-blank lines, preserving order.
    pub fn parse(raw: &str) -> Self {
        let lines = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if `text` appears as a full reported line.
    pub fn contains_line(&self, text: &str) -> bool {
        self.lines.iter().any(|line| line == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(ChangeReport::parse("").is_empty());
    }

    #[test]
    fn whitespace_only_input_yields_no_lines() {
        assert!(ChangeReport::parse("  \n\t\n\r\n   ").is_empty());
    }

    #[test]
    fn preserves_order_and_skips_blank_lines() {
        let report = ChangeReport::parse("b.txt\n\nsrc/a.rs\n   \nz\n");
        assert_eq!(report.lines(), ["b.txt", "src/a.rs", "z"]);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn strips_crlf_terminators_but_keeps_inner_whitespace() {
        let report = ChangeReport::parse(" padded.txt \r\nnext\r\n");
        assert_eq!(report.lines(), [" padded.txt ", "next"]);
    }

    #[test]
    fn contains_line_is_literal() {
        let report = ChangeReport::parse("src/a.txt\nsrc/b.txt");
        assert!(report.contains_line("src/a.txt"));
        assert!(!report.contains_line("src/a"));
        assert!(!report.contains_line("SRC/A.TXT"));
    }
}
