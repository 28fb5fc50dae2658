use std::collections::BTreeMap;

use crate::types::quote_if_needed;
use crate::{DateCommonDto, RuleExpressionDto, RuleExpressionType, RuleInEffectStatus};

use super::Element;

const RULE_CHILD_TAGS: &[&str] = &[
    "rule",
    "expression",
    "date_expression",
    "op_expression",
    "rsc_expression",
];

/// Read a CIB rule subtree into its display form.
///
/// Works on rules written by any tool: every attribute but `id` ends up in
/// `options`, child elements that are not rule expressions are skipped and
/// missing optional attributes are simply left out of `as_string`. An element
/// that is not one of the expression tags is read as a `rule`.
#[must_use]
pub fn to_dto(element: &Element) -> RuleExpressionDto {
    match element.name() {
        "expression" => leaf(element, RuleExpressionType::Expression, expression_text(element)),
        "date_expression" => date_expression_to_dto(element),
        "op_expression" => leaf(element, RuleExpressionType::OpExpression, op_text(element)),
        "rsc_expression" => leaf(element, RuleExpressionType::RscExpression, rsc_text(element)),
        _ => rule_to_dto(element),
    }
}

fn rule_to_dto(element: &Element) -> RuleExpressionDto {
    let expressions: Vec<RuleExpressionDto> = element
        .children()
        .iter()
        .filter(|child| RULE_CHILD_TAGS.contains(&child.name()))
        .map(to_dto)
        .collect();
    let separator = format!(" {} ", element.attr("boolean-op").unwrap_or("and"));
    let as_string = expressions
        .iter()
        .map(|child| {
            if child.is_rule() {
                format!("({})", child.as_string)
            } else {
                child.as_string.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator);

    RuleExpressionDto {
        expressions,
        ..leaf(element, RuleExpressionType::Rule, as_string)
    }
}

fn date_expression_to_dto(element: &Element) -> RuleExpressionDto {
    let date_spec = element.child("date_spec");
    let duration = element.child("duration");
    let operation = element.attr("operation").unwrap_or("in_range");

    let mut words: Vec<String> = Vec::new();
    match operation {
        "date_spec" => {
            words.push("date-spec".to_owned());
            words.extend(date_spec.map(part_words).unwrap_or_default());
        }
        "in_range" => {
            words.extend(["date".to_owned(), "in_range".to_owned()]);
            words.extend(element.attr("start").map(str::to_owned));
            if element.attr("end").is_some() || duration.is_some() {
                words.push("to".to_owned());
            }
            words.extend(element.attr("end").map(str::to_owned));
            if let Some(duration) = duration {
                words.push("duration".to_owned());
                words.extend(part_words(duration));
            }
        }
        other => {
            words.extend(["date".to_owned(), other.to_owned()]);
            words.extend(element.attr("start").map(str::to_owned));
            words.extend(element.attr("end").map(str::to_owned));
        }
    }

    RuleExpressionDto {
        date_spec: date_spec.map(date_common),
        duration: duration.map(date_common),
        ..leaf(element, RuleExpressionType::DateExpression, words.join(" "))
    }
}

fn expression_text(element: &Element) -> String {
    let attribute = element.attr("attribute").unwrap_or_default();
    let operation = element.attr("operation").unwrap_or_default();
    match element.attr("value") {
        Some(value) => {
            let mut words = vec![attribute, operation];
            words.extend(element.attr("type"));
            let value = quote_if_needed(value);
            words.push(&value);
            words.join(" ")
        }
        None => format!("{operation} {attribute}"),
    }
}

fn op_text(element: &Element) -> String {
    let mut text = format!("op {}", element.attr("name").unwrap_or_default());
    if let Some(interval) = element.attr("interval") {
        text.push_str(" interval=");
        text.push_str(interval);
    }
    text
}

fn rsc_text(element: &Element) -> String {
    format!(
        "resource {}:{}:{}",
        element.attr("class").unwrap_or_default(),
        element.attr("provider").unwrap_or_default(),
        element.attr("type").unwrap_or_default(),
    )
}

fn part_words(element: &Element) -> Vec<String> {
    element
        .attributes()
        .filter(|(name, _)| *name != "id")
        .map(|(name, value)| format!("{name}={value}"))
        .collect()
}

fn options(element: &Element) -> BTreeMap<String, String> {
    element
        .attributes()
        .filter(|(name, _)| *name != "id")
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect()
}

fn date_common(element: &Element) -> DateCommonDto {
    DateCommonDto {
        id: element.attr("id").unwrap_or_default().to_owned(),
        options: options(element),
    }
}

fn leaf(element: &Element, expr_type: RuleExpressionType, as_string: String) -> RuleExpressionDto {
    RuleExpressionDto {
        id: element.attr("id").unwrap_or_default().to_owned(),
        expr_type,
        in_effect_status: RuleInEffectStatus::Unknown,
        options: options(element),
        date_spec: None,
        duration: None,
        expressions: Vec::new(),
        as_string,
    }
}
