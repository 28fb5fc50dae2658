use std::fmt;

/// Errors produced when a rule string does not match the rule grammar.
///
/// Carries enough to show the user where parsing stopped: the offending
/// line, 1-based line and column numbers and the 0-based character offset
/// into the whole rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParseError {
    original_text: String,
    line_text: String,
    line_number: usize,
    column_number: usize,
    position: usize,
    message: String,
}

impl RuleParseError {
    /// Locate byte `offset` of `text` and build the error around it.
    pub(crate) fn at_offset(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(text.len());
        let before = &text[..offset];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
        Self {
            original_text: text.to_owned(),
            line_text: text[line_start..line_end].to_owned(),
            line_number: before.matches('\n').count() + 1,
            column_number: text[line_start..offset].chars().count() + 1,
            position: before.chars().count(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    #[must_use]
    pub fn line_text(&self) -> &str {
        &self.line_text
    }

    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    #[must_use]
    pub fn column_number(&self) -> usize {
        self.column_number
    }

    /// Character offset of the failure from the start of the rule.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The offending line with a caret under the failing column.
    #[must_use]
    pub fn annotated(&self) -> String {
        format!(
            "{}\n{}^",
            self.line_text,
            " ".repeat(self.column_number.saturating_sub(1))
        )
    }
}

impl fmt::Display for RuleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message, self.line_number, self.column_number
        )
    }
}

impl std::error::Error for RuleParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RuleParseError::at_offset("#uname eq", 9, "Expected attribute value");
        assert_eq!(
            err.to_string(),
            "Expected attribute value (line 1, column 10)"
        );
    }

    #[test]
    fn locates_second_line() {
        let text = "#uname eq a and\ndate gt";
        let err = RuleParseError::at_offset(text, text.len(), "Expected date");
        assert_eq!(err.line_number(), 2);
        assert_eq!(err.column_number(), 8);
        assert_eq!(err.position(), 23);
        assert_eq!(err.line_text(), "date gt");
        assert_eq!(err.original_text(), text);
    }

    #[test]
    fn annotated_points_at_column() {
        let err = RuleParseError::at_offset("a eq", 4, "Expected attribute value");
        assert_eq!(err.annotated(), "a eq\n    ^");
    }

    #[test]
    fn offset_on_newline_belongs_to_previous_line() {
        let err = RuleParseError::at_offset("abc\ndef", 3, "x");
        assert_eq!(err.line_number(), 1);
        assert_eq!(err.line_text(), "abc");
        assert_eq!(err.column_number(), 4);
    }
}
