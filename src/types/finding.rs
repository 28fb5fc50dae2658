use std::fmt;

use thiserror::Error;

use super::ExprKind;

/// How serious a [`Finding`] is. Errors block writing the rule, deprecations
/// are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Deprecation,
}

/// What the validator found wrong with a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FindingMessage {
    #[error("{kind} is not allowed to be used here")]
    ExpressionNotAllowed { kind: ExprKind },

    #[error("'{option_value}' is not a valid {option_name} value, use {allowed}")]
    InvalidOptionValue {
        option_name: String,
        option_value: String,
        allowed: String,
    },

    #[error(
        "invalid {option_type} option{} {}, allowed options are: {}",
        plural_suffix(names),
        quoted_list(names),
        quoted_list(allowed)
    )]
    InvalidOptionNames {
        option_type: String,
        names: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("duplicate {option_type} options: {}", quoted_list(names))]
    DuplicateOptions {
        option_type: String,
        names: Vec<String>,
    },

    #[error("since '{since}' is not sooner than until '{until}'")]
    SinceGreaterThanUntil { since: String, until: String },

    #[error("a duration can only follow a start date")]
    DurationWithoutStart,

    #[error("{option_type} option '{name}' is deprecated")]
    DeprecatedOption { option_type: String, name: String },
}

/// A single validator diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub message: FindingMessage,
}

impl Finding {
    #[must_use]
    pub fn error(message: FindingMessage) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    #[must_use]
    pub fn deprecation(message: FindingMessage) -> Self {
        Self {
            severity: Severity::Deprecation,
            message,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Deprecation => write!(f, "deprecation warning"),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

fn plural_suffix(items: &[String]) -> &'static str {
    if items.len() == 1 {
        ""
    } else {
        "s"
    }
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_allowed_message() {
        let finding = Finding::error(FindingMessage::ExpressionNotAllowed { kind: ExprKind::Op });
        assert_eq!(
            finding.to_string(),
            "error: operation expression is not allowed to be used here"
        );
    }

    #[test]
    fn invalid_names_message() {
        let msg = FindingMessage::InvalidOptionNames {
            option_type: "datespec".into(),
            names: vec!["bogus".into()],
            allowed: vec!["hours".into(), "months".into()],
        };
        assert_eq!(
            msg.to_string(),
            "invalid datespec option 'bogus', allowed options are: 'hours', 'months'"
        );
    }

    #[test]
    fn duplicate_message_lists_all_names() {
        let msg = FindingMessage::DuplicateOptions {
            option_type: "duration".into(),
            names: vec!["hours".into(), "years".into()],
        };
        assert_eq!(msg.to_string(), "duplicate duration options: 'hours', 'years'");
    }

    #[test]
    fn deprecation_is_not_error() {
        let finding = Finding::deprecation(FindingMessage::DeprecatedOption {
            option_type: "duration".into(),
            name: "moon".into(),
        });
        assert!(!finding.is_error());
        assert_eq!(
            finding.to_string(),
            "deprecation warning: duration option 'moon' is deprecated"
        );
    }
}
