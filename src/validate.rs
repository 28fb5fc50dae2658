use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::iso8601;
use crate::{
    BoolExpr, DateInRangeExpr, DateRangeEnd, DateUnaryExpr, ExprKind, Finding, FindingMessage,
    NodeAttrExpr, NodeAttrType, RuleExprPart,
};

const ISO8601_ALLOWED: &str = "ISO 8601 date";

/// Inclusive bounds of a date-spec part. `max == None` means unbounded.
#[derive(Clone, Copy)]
struct PartRange {
    min: u32,
    max: Option<u32>,
}

const fn bounded(min: u32, max: u32) -> PartRange {
    PartRange {
        min,
        max: Some(max),
    }
}

const UNBOUNDED: PartRange = PartRange { min: 0, max: None };

const DATESPEC_PARTS: &[(&str, PartRange)] = &[
    ("hours", bounded(0, 23)),
    ("monthdays", bounded(1, 31)),
    ("weekdays", bounded(1, 7)),
    ("yearsdays", bounded(1, 366)),
    ("yeardays", bounded(1, 366)),
    ("months", bounded(1, 12)),
    ("weeks", bounded(1, 53)),
    ("years", UNBOUNDED),
    ("weekyears", UNBOUNDED),
    ("moon", bounded(0, 7)),
];
const DATESPEC_DEPRECATED: &[&str] = &["moon"];

const DURATION_PARTS: &[&str] = &[
    "hours",
    "months",
    "weeks",
    "years",
    "monthdays",
    "weekdays",
    "weekyears",
    "yearsdays",
    "moon",
];
const DURATION_DEPRECATED: &[&str] = &["monthdays", "weekdays", "weekyears", "yearsdays", "moon"];

/// Check a parsed rule against the expression kinds allowed in its context
/// and against the value constraints of each expression.
///
/// Every problem in the tree is reported; nothing short-circuits. Findings
/// are ordered as the offending expressions appear in the tree, followed by
/// one finding per disallowed expression kind in the order first seen.
#[must_use]
pub fn validate(
    tree: &BoolExpr,
    allow_rsc_expr: bool,
    allow_op_expr: bool,
    allow_node_attr_expr: bool,
) -> Vec<Finding> {
    let mut validator = Validator {
        allow_rsc_expr,
        allow_op_expr,
        allow_node_attr_expr,
        findings: Vec::new(),
        disallowed: Vec::new(),
    };
    validator.visit_bool(tree);

    let Validator {
        mut findings,
        disallowed,
        ..
    } = validator;
    findings.extend(
        disallowed
            .into_iter()
            .map(|kind| Finding::error(FindingMessage::ExpressionNotAllowed { kind })),
    );
    findings
}

struct Validator {
    allow_rsc_expr: bool,
    allow_op_expr: bool,
    allow_node_attr_expr: bool,
    findings: Vec<Finding>,
    disallowed: Vec<ExprKind>,
}

impl Validator {
    fn visit_bool(&mut self, expr: &BoolExpr) {
        for child in &expr.children {
            self.visit(child);
        }
    }

    fn visit(&mut self, part: &RuleExprPart) {
        match part {
            RuleExprPart::Bool(expr) => self.visit_bool(expr),
            RuleExprPart::NodeAttr(expr) => {
                if self.allow_node_attr_expr {
                    self.check_node_attr(expr);
                } else {
                    self.disallow(ExprKind::NodeAttr);
                }
            }
            RuleExprPart::Rsc(_) => {
                if !self.allow_rsc_expr {
                    self.disallow(ExprKind::Rsc);
                }
            }
            RuleExprPart::Op(_) => {
                if !self.allow_op_expr {
                    self.disallow(ExprKind::Op);
                }
            }
            RuleExprPart::DateUnary(expr) => self.check_date_unary(expr),
            RuleExprPart::DateInRange(expr) => self.check_date_range(expr),
            RuleExprPart::Datespec(expr) => self.check_datespec(&expr.date_parts),
        }
    }

    fn disallow(&mut self, kind: ExprKind) {
        if !self.disallowed.contains(&kind) {
            self.disallowed.push(kind);
        }
    }

    fn error(&mut self, message: FindingMessage) {
        self.findings.push(Finding::error(message));
    }

    fn invalid_value(&mut self, option_name: &str, option_value: &str, allowed: impl Into<String>) {
        self.error(FindingMessage::InvalidOptionValue {
            option_name: option_name.to_owned(),
            option_value: option_value.to_owned(),
            allowed: allowed.into(),
        });
    }

    fn check_node_attr(&mut self, expr: &NodeAttrExpr) {
        let (Some(attr_type), Some(value)) = (expr.attr_type, expr.attr_value.as_deref()) else {
            return;
        };
        match attr_type {
            NodeAttrType::String => {}
            NodeAttrType::Integer => {
                if !is_integer(value) {
                    self.invalid_value("integer", value, "an integer");
                }
            }
            // Floats are accepted here although older CIB schemas only allow
            // integers for `number`; newer Pacemaker compares them as doubles.
            NodeAttrType::Number => {
                if !is_number(value) {
                    self.invalid_value("number", value, "a floating-point number");
                }
            }
            NodeAttrType::Version => {
                if !is_version(value) {
                    self.invalid_value(
                        "version",
                        value,
                        "a version number (e.g. 1, 1.2, 1.23.45, ...)",
                    );
                }
            }
        }
    }

    fn check_date_unary(&mut self, expr: &DateUnaryExpr) {
        self.check_date("date", &expr.date);
    }

    fn check_date_range(&mut self, expr: &DateInRangeExpr) {
        let start = expr
            .date_start
            .as_deref()
            .and_then(|start| self.check_date("start", start));
        match &expr.end {
            DateRangeEnd::Date(end) => {
                let end_parsed = self.check_date("end", end);
                if let (Some(since), Some(until)) = (start, end_parsed) {
                    if since >= until {
                        self.error(FindingMessage::SinceGreaterThanUntil {
                            since: expr.date_start.clone().unwrap_or_default(),
                            until: end.clone(),
                        });
                    }
                }
            }
            DateRangeEnd::Duration(parts) => {
                if expr.date_start.is_none() {
                    self.error(FindingMessage::DurationWithoutStart);
                }
                self.check_duration(parts);
            }
        }
    }

    /// Report `value` if it is not a date; return the parsed date otherwise.
    fn check_date(&mut self, field: &str, value: &str) -> Option<NaiveDateTime> {
        let parsed = iso8601::parse(value);
        if parsed.is_none() {
            self.invalid_value(field, value, ISO8601_ALLOWED);
        }
        parsed
    }

    fn check_datespec(&mut self, parts: &[(String, String)]) {
        let known = |name: &str| {
            DATESPEC_PARTS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, range)| *range)
        };
        let allowed: Vec<&str> = DATESPEC_PARTS.iter().map(|(name, _)| *name).collect();

        self.check_unknown_names("datespec", parts, &allowed);
        for (name, value) in parts {
            if let Some(range) = known(name) {
                if !datespec_value_ok(value, range) {
                    self.invalid_value(name, value, describe_range(range));
                }
            }
        }
        self.check_duplicates("datespec", parts);
        self.check_deprecated("datespec", parts, DATESPEC_DEPRECATED);
    }

    fn check_duration(&mut self, parts: &[(String, String)]) {
        self.check_unknown_names("duration", parts, DURATION_PARTS);
        for (name, value) in parts {
            if DURATION_PARTS.contains(&name.as_str())
                && !(is_digits(value) && value.parse::<u32>().is_ok())
            {
                self.invalid_value(name, value, "a non-negative integer");
            }
        }
        self.check_duplicates("duration", parts);
        self.check_deprecated("duration", parts, DURATION_DEPRECATED);
    }

    fn check_unknown_names(
        &mut self,
        option_type: &str,
        parts: &[(String, String)],
        allowed: &[&str],
    ) {
        let unknown: BTreeSet<&str> = parts
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !allowed.contains(name))
            .collect();
        if unknown.is_empty() {
            return;
        }
        let mut allowed: Vec<String> = allowed.iter().map(|name| (*name).to_owned()).collect();
        allowed.sort();
        self.error(FindingMessage::InvalidOptionNames {
            option_type: option_type.to_owned(),
            names: unknown.into_iter().map(str::to_owned).collect(),
            allowed,
        });
    }

    fn check_duplicates(&mut self, option_type: &str, parts: &[(String, String)]) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for (name, _) in parts {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        let duplicated: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_owned())
            .collect();
        if !duplicated.is_empty() {
            self.error(FindingMessage::DuplicateOptions {
                option_type: option_type.to_owned(),
                names: duplicated,
            });
        }
    }

    fn check_deprecated(
        &mut self,
        option_type: &str,
        parts: &[(String, String)],
        deprecated: &[&str],
    ) {
        let mut reported: Vec<&str> = Vec::new();
        for (name, _) in parts {
            if deprecated.contains(&name.as_str()) && !reported.contains(&name.as_str()) {
                reported.push(name);
                self.findings
                    .push(Finding::deprecation(FindingMessage::DeprecatedOption {
                        option_type: option_type.to_owned(),
                        name: name.clone(),
                    }));
            }
        }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer(value: &str) -> bool {
    is_digits(value.strip_prefix('-').unwrap_or(value))
}

fn is_number(value: &str) -> bool {
    // `f64::from_str` also takes "inf" and "NaN", which Pacemaker does not.
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        && value.parse::<f64>().is_ok()
}

fn is_version(value: &str) -> bool {
    value.split('.').all(is_digits)
}

fn datespec_value_ok(value: &str, range: PartRange) -> bool {
    let in_range = |text: &str| {
        Some(text)
            .filter(|text| is_digits(text))
            .and_then(|text| text.parse::<u32>().ok())
            .filter(|n| *n >= range.min && range.max.map_or(true, |max| *n <= max))
    };
    match value.split_once('-') {
        None => in_range(value).is_some(),
        Some((low, high)) => match (in_range(low), in_range(high)) {
            (Some(low), Some(high)) => low < high,
            _ => false,
        },
    }
}

fn describe_range(range: PartRange) -> String {
    match range.max {
        Some(max) => format!(
            "{min}..{max} or {min}..{}-{}..{max}",
            max - 1,
            range.min + 1,
            min = range.min
        ),
        None => "an integer or a range of integers (e.g. 2010-2020)".to_owned(),
    }
}
