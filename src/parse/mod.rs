mod error;
mod grammar;

use winnow::error::{ContextError, StrContext};

pub use error::RuleParseError;

use crate::{BoolExpr, RuleExprPart};

/// Parse a rule string into an expression tree.
///
/// The root of the result is always a [`BoolExpr`]: an empty rule yields an
/// empty `and`, and a lone expression is wrapped in a single-child `and`.
/// Resource and operation expressions are only recognized when allowed.
///
/// # Errors
///
/// Returns [`RuleParseError`] if `text` is not valid rule syntax.
pub fn parse_rule(
    text: &str,
    allow_rsc_expr: bool,
    allow_op_expr: bool,
) -> Result<BoolExpr, RuleParseError> {
    use winnow::Parser;

    let grammar = grammar::Grammar {
        allow_rsc_expr,
        allow_op_expr,
    };
    let parsed = (|i: &mut &str| grammar.rule(i))
        .parse(text)
        .map_err(|e| RuleParseError::at_offset(text, e.offset(), describe(e.inner())))?;

    let tree = match parsed {
        None => BoolExpr::and(Vec::new()),
        Some(RuleExprPart::Bool(tree)) => tree,
        Some(other) => BoolExpr::and(vec![other]),
    };
    tracing::debug!(
        operator = %tree.operator,
        children = tree.children.len(),
        "parsed rule"
    );
    Ok(tree)
}

fn describe(error: &ContextError) -> String {
    let expected: Vec<String> = error
        .context()
        .filter_map(|context| match context {
            StrContext::Expected(value) => Some(value.to_string()),
            _ => None,
        })
        .collect();
    match expected.as_slice() {
        [] => "Unexpected input".to_owned(),
        [only] => format!("Expected {only}"),
        [init @ .., last] => format!("Expected {} or {last}", init.join(", ")),
    }
}
