use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which CIB element a [`RuleExpressionDto`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleExpressionType {
    Rule,
    Expression,
    DateExpression,
    OpExpression,
    RscExpression,
}

/// Whether a rule's temporal conditions hold right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleInEffectStatus {
    #[default]
    Unknown,
    Expired,
    InEffect,
    NotYetInEffect,
}

/// A `date_spec` or `duration` element: its id and remaining attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCommonDto {
    pub id: String,
    pub options: BTreeMap<String, String>,
}

/// Display form of a rule, or of one of its expressions, read back from CIB XML.
///
/// `options` holds the element's attributes except `id` verbatim, including
/// ones this crate does not interpret. `expressions` is only populated for
/// [`RuleExpressionType::Rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExpressionDto {
    pub id: String,
    #[serde(rename = "type")]
    pub expr_type: RuleExpressionType,
    pub in_effect_status: RuleInEffectStatus,
    pub options: BTreeMap<String, String>,
    pub date_spec: Option<DateCommonDto>,
    pub duration: Option<DateCommonDto>,
    pub expressions: Vec<RuleExpressionDto>,
    pub as_string: String,
}

impl RuleExpressionDto {
    #[must_use]
    pub fn is_rule(&self) -> bool {
        self.expr_type == RuleExpressionType::Rule
    }

    /// Ids of this node and every nested rule node, depth first.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_rule_ids(&mut ids);
        ids
    }

    fn collect_rule_ids(&self, ids: &mut Vec<String>) {
        if self.is_rule() {
            ids.push(self.id.clone());
        }
        for child in &self.expressions {
            child.collect_rule_ids(ids);
        }
    }

    /// Copy of this tree with every rule node's status replaced by `status_of`.
    /// Other nodes are reset to [`RuleInEffectStatus::Unknown`].
    #[must_use]
    pub fn with_in_effect(self, status_of: &dyn Fn(&str) -> RuleInEffectStatus) -> Self {
        let in_effect_status = if self.is_rule() {
            status_of(&self.id)
        } else {
            RuleInEffectStatus::Unknown
        };
        Self {
            in_effect_status,
            expressions: self
                .expressions
                .into_iter()
                .map(|child| child.with_in_effect(status_of))
                .collect(),
            ..self
        }
    }
}

impl fmt::Display for RuleInEffectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RuleInEffectStatus::Unknown => "unknown",
            RuleInEffectStatus::Expired => "expired",
            RuleInEffectStatus::InEffect => "in effect",
            RuleInEffectStatus::NotYetInEffect => "not yet in effect",
        };
        f.write_str(text)
    }
}

impl fmt::Display for RuleExpressionDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string)
    }
}
