use winnow::ascii::{digit1, multispace0, Caseless};
use winnow::combinator::{alt, cut_err, eof, not, opt, peek, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{any, literal, one_of, take_while};

use crate::{
    BoolExpr, BoolOperator, DateInRangeExpr, DateRangeEnd, DateUnaryExpr, DateUnaryOp,
    DatespecExpr, NodeAttrExpr, NodeAttrOp, NodeAttrType, OpExpr, RscExpr, RuleExprPart,
};

/// Which optional expression kinds the grammar accepts.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Grammar {
    pub(crate) allow_rsc_expr: bool,
    pub(crate) allow_op_expr: bool,
}

// -- Tokens -----------------------------------------------------------------

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')'
}

fn expected(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn token<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., is_token_char).parse_next(input)
}

/// Case-insensitive keyword that must not run into the following token.
fn keyword<'i>(word: &'static str) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    terminated(literal(Caseless(word)), not(one_of(is_token_char)))
}

fn quoted_string(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    cut_err(quoted_body)
        .context(expected("closing '\"'"))
        .parse_next(input)
}

fn quoted_body(input: &mut &str) -> ModalResult<String> {
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                if !matches!(esc, '"' | '\\') {
                    s.push('\\');
                }
                s.push(esc);
            }
            c => s.push(c),
        }
    }
}

// -- Node attribute expressions ---------------------------------------------

fn node_attr_operator(input: &mut &str) -> ModalResult<NodeAttrOp> {
    alt((
        keyword("eq").value(NodeAttrOp::Eq),
        keyword("ne").value(NodeAttrOp::Ne),
        keyword("gte").value(NodeAttrOp::Gte),
        keyword("gt").value(NodeAttrOp::Gt),
        keyword("lte").value(NodeAttrOp::Lte),
        keyword("lt").value(NodeAttrOp::Lt),
    ))
    .parse_next(input)
}

fn node_attr_type(input: &mut &str) -> ModalResult<NodeAttrType> {
    alt((
        keyword("string").value(NodeAttrType::String),
        keyword("integer").value(NodeAttrType::Integer),
        keyword("number").value(NodeAttrType::Number),
        keyword("version").value(NodeAttrType::Version),
    ))
    .parse_next(input)
}

fn attr_value(input: &mut &str) -> ModalResult<String> {
    alt((
        quoted_string,
        token
            .map(str::to_owned)
            .context(expected("attribute value")),
    ))
    .parse_next(input)
}

fn node_attr_unary(input: &mut &str) -> ModalResult<RuleExprPart> {
    let operator = alt((
        keyword("defined").value(NodeAttrOp::Defined),
        keyword("not_defined").value(NodeAttrOp::NotDefined),
    ))
    .parse_next(input)?;
    ws(input)?;
    // `defined eq 1` compares an attribute named "defined"
    not(node_attr_operator).parse_next(input)?;
    let name = cut_err(token)
        .context(expected("attribute name"))
        .parse_next(input)?;
    Ok(NodeAttrExpr::unary(operator, name).into())
}

fn typed_value(input: &mut &str) -> ModalResult<(Option<NodeAttrType>, String)> {
    // A type keyword with nothing after it is the value itself.
    let attr_type = opt(terminated(node_attr_type, (ws, peek(attr_value)))).parse_next(input)?;
    if attr_type.is_some() {
        ws(input)?;
    }
    let value = attr_value.parse_next(input)?;
    Ok((attr_type, value))
}

fn node_attr_binary(input: &mut &str) -> ModalResult<RuleExprPart> {
    let name = token.context(expected("expression")).parse_next(input)?;
    ws(input)?;
    let operator = node_attr_operator
        .context(expected("comparison operator"))
        .parse_next(input)?;
    ws(input)?;
    let (attr_type, value) = cut_err(typed_value).parse_next(input)?;
    Ok(NodeAttrExpr::binary(name, operator, &value, attr_type).into())
}

// -- Resource and operation expressions -------------------------------------

fn rsc_part<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| is_token_char(c) && c != ':').parse_next(input)
}

fn rsc_expr(input: &mut &str) -> ModalResult<RuleExprPart> {
    keyword("resource").parse_next(input)?;
    ws(input)?;
    not(node_attr_operator).parse_next(input)?;
    let (standard, _, provider, _, rsc_type) =
        cut_err((opt(rsc_part), ':', opt(rsc_part), ':', opt(rsc_part)))
            .context(expected("<standard>:<provider>:<type>"))
            .parse_next(input)?;
    Ok(RscExpr::new(standard, provider, rsc_type).into())
}

fn interval_value<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(
        (digit1, take_while(0.., |c: char| c.is_ascii_alphabetic())).take(),
        not(one_of(is_token_char)),
    )
    .context(expected("interval (a number with an optional time unit)"))
    .parse_next(input)
}

fn op_expr(input: &mut &str) -> ModalResult<RuleExprPart> {
    keyword("op").parse_next(input)?;
    ws(input)?;
    not(node_attr_operator).parse_next(input)?;
    let name = cut_err(token)
        .context(expected("operation name"))
        .parse_next(input)?;
    let interval = opt(preceded(
        (ws, literal(Caseless("interval="))),
        cut_err(interval_value),
    ))
    .parse_next(input)?;
    Ok(OpExpr::new(name, interval).into())
}

// -- Date expressions -------------------------------------------------------

fn date_token<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    token.context(expected("date")).parse_next(input)
}

/// A single `name=value` pair. Leaves the input untouched on failure so that
/// errors point at the start of the pair.
fn date_part(input: &mut &str) -> ModalResult<(String, String)> {
    let start = input.checkpoint();
    let parsed = (
        take_while(1.., |c: char| is_token_char(c) && c != '='),
        '=',
        token,
    )
        .parse_next(input);
    match parsed {
        Ok((name, _, value)) => Ok((name.to_owned(), value.to_owned())),
        Err(e) => {
            input.reset(&start);
            Err(e)
        }
    }
}

fn date_parts(input: &mut &str) -> ModalResult<Vec<(String, String)>> {
    ws(input)?;
    let first = date_part
        .context(expected("name=value option"))
        .parse_next(input)?;
    let rest: Vec<(String, String)> = repeat(0.., preceded(ws, date_part)).parse_next(input)?;
    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first);
    parts.extend(rest);
    Ok(parts)
}

fn date_range_tail(input: &mut &str) -> ModalResult<RuleExprPart> {
    ws(input)?;
    let date_start = opt(terminated(preceded(not(keyword("to")), date_token), ws))
        .parse_next(input)?;
    keyword("to")
        .context(expected("'to'"))
        .parse_next(input)?;
    ws(input)?;
    let end = if opt(keyword("duration")).parse_next(input)?.is_some() {
        DateRangeEnd::Duration(date_parts(input)?)
    } else {
        DateRangeEnd::Date(date_token(input)?.to_owned())
    };
    Ok(DateInRangeExpr {
        date_start: date_start.map(str::to_owned),
        end,
    }
    .into())
}

#[derive(Clone, Copy)]
enum DateOperation {
    Unary(DateUnaryOp),
    InRange,
}

fn date_expr(input: &mut &str) -> ModalResult<RuleExprPart> {
    keyword("date").parse_next(input)?;
    ws(input)?;
    let operation = alt((
        keyword("gt").value(DateOperation::Unary(DateUnaryOp::Gt)),
        keyword("lt").value(DateOperation::Unary(DateUnaryOp::Lt)),
        keyword("in_range").value(DateOperation::InRange),
    ))
    .parse_next(input)?;
    match operation {
        DateOperation::Unary(operator) => {
            let date = cut_err(preceded(ws, date_token)).parse_next(input)?;
            Ok(DateUnaryExpr::new(operator, date).into())
        }
        DateOperation::InRange => cut_err(date_range_tail).parse_next(input),
    }
}

fn datespec_expr(input: &mut &str) -> ModalResult<RuleExprPart> {
    keyword("date-spec").parse_next(input)?;
    let date_parts = cut_err(date_parts).parse_next(input)?;
    Ok(DatespecExpr { date_parts }.into())
}

// -- Boolean structure ------------------------------------------------------

fn bool_operator(input: &mut &str) -> ModalResult<BoolOperator> {
    alt((
        keyword("and").value(BoolOperator::And),
        keyword("or").value(BoolOperator::Or),
    ))
    .parse_next(input)
}

/// Operands joined by the same operator share one node; every change of
/// operator wraps everything so far as the first operand of a new node.
/// `a or b and c` therefore becomes `and(or(a, b), c)`.
fn build_bool_tree(first: RuleExprPart, rest: Vec<(BoolOperator, RuleExprPart)>) -> RuleExprPart {
    let mut rest = rest.into_iter();
    let Some((mut last_operator, second)) = rest.next() else {
        return first;
    };
    let mut operands = vec![first, second];
    for (operator, operand) in rest {
        if operator != last_operator {
            operands = vec![BoolExpr::new(last_operator, operands).into()];
            last_operator = operator;
        }
        operands.push(operand);
    }
    BoolExpr::new(last_operator, operands).into()
}

impl Grammar {
    fn simple_expr(self, input: &mut &str) -> ModalResult<RuleExprPart> {
        if let Some(expr) = opt(date_expr).parse_next(input)? {
            return Ok(expr);
        }
        if let Some(expr) = opt(datespec_expr).parse_next(input)? {
            return Ok(expr);
        }
        if self.allow_rsc_expr {
            if let Some(expr) = opt(rsc_expr).parse_next(input)? {
                return Ok(expr);
            }
        }
        if self.allow_op_expr {
            if let Some(expr) = opt(op_expr).parse_next(input)? {
                return Ok(expr);
            }
        }
        if let Some(expr) = opt(node_attr_unary).parse_next(input)? {
            return Ok(expr);
        }
        node_attr_binary(input)
    }

    fn parenthesized(self, input: &mut &str) -> ModalResult<RuleExprPart> {
        '('.parse_next(input)?;
        ws(input)?;
        let inner = cut_err(|i: &mut &str| self.bool_expr(i)).parse_next(input)?;
        ws(input)?;
        cut_err(')')
            .context(expected("'and'"))
            .context(expected("'or'"))
            .context(expected("')'"))
            .parse_next(input)?;
        Ok(inner)
    }

    fn operand(self, input: &mut &str) -> ModalResult<RuleExprPart> {
        alt((
            |i: &mut &str| self.parenthesized(i),
            |i: &mut &str| self.simple_expr(i),
        ))
        .parse_next(input)
    }

    fn bool_expr(self, input: &mut &str) -> ModalResult<RuleExprPart> {
        let first = self.operand(input)?;
        let rest: Vec<(BoolOperator, RuleExprPart)> = repeat(
            0..,
            (
                preceded(ws, bool_operator),
                cut_err(preceded(ws, |i: &mut &str| self.operand(i))),
            ),
        )
        .parse_next(input)?;
        Ok(build_bool_tree(first, rest))
    }

    /// A whole rule. `None` for an empty (or whitespace-only) rule.
    pub(crate) fn rule(self, input: &mut &str) -> ModalResult<Option<RuleExprPart>> {
        ws(input)?;
        if input.is_empty() {
            return Ok(None);
        }
        let expr = cut_err(|i: &mut &str| self.bool_expr(i)).parse_next(input)?;
        ws(input)?;
        cut_err(eof)
            .context(expected("'and'"))
            .context(expected("'or'"))
            .context(expected("end of rule"))
            .parse_next(input)?;
        Ok(Some(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_part(input: &str, grammar: Grammar) -> Option<RuleExprPart> {
        (|i: &mut &str| grammar.rule(i)).parse(input).unwrap()
    }

    fn all() -> Grammar {
        Grammar {
            allow_rsc_expr: true,
            allow_op_expr: true,
        }
    }

    fn attr(name: &str, value: &str) -> RuleExprPart {
        NodeAttrExpr::binary(name, NodeAttrOp::Eq, value, None).into()
    }

    #[test]
    fn keyword_requires_boundary() {
        let mut input = "android";
        assert!(keyword("and").parse_next(&mut input).is_err());
        let mut input = "AND x";
        assert_eq!(keyword("and").parse_next(&mut input).unwrap(), "AND");
    }

    #[test]
    fn quoted_value_with_escapes() {
        let mut input = r#""a \"b\" \\ c""#;
        assert_eq!(quoted_string(&mut input).unwrap(), r#"a "b" \ c"#);
    }

    #[test]
    fn bool_tree_merges_equal_operators() {
        let tree = build_bool_tree(
            attr("a", "1"),
            vec![
                (BoolOperator::And, attr("b", "1")),
                (BoolOperator::And, attr("c", "1")),
            ],
        );
        assert_eq!(
            tree,
            BoolExpr::and(vec![attr("a", "1"), attr("b", "1"), attr("c", "1")]).into()
        );
    }

    #[test]
    fn bool_tree_nests_on_operator_change() {
        let tree = build_bool_tree(
            attr("a", "1"),
            vec![
                (BoolOperator::Or, attr("b", "1")),
                (BoolOperator::And, attr("c", "1")),
                (BoolOperator::Or, attr("d", "1")),
            ],
        );
        let expected = BoolExpr::or(vec![
            BoolExpr::and(vec![
                BoolExpr::or(vec![attr("a", "1"), attr("b", "1")]).into(),
                attr("c", "1"),
            ])
            .into(),
            attr("d", "1"),
        ]);
        assert_eq!(tree, expected.into());
    }

    #[test]
    fn type_keyword_alone_is_the_value() {
        let part = parse_part("kind eq string", Grammar::default()).unwrap();
        assert_eq!(part, attr("kind", "string"));
    }

    #[test]
    fn type_keyword_before_value() {
        let part = parse_part("weight gte number 2.5", Grammar::default()).unwrap();
        assert_eq!(
            part,
            NodeAttrExpr::binary("weight", NodeAttrOp::Gte, "2.5", Some(NodeAttrType::Number))
                .into()
        );
    }

    #[test]
    fn defined_followed_by_operator_is_binary() {
        let part = parse_part("defined eq 1", Grammar::default()).unwrap();
        assert_eq!(part, attr("defined", "1"));
    }

    #[test]
    fn date_word_as_attribute_name() {
        let part = parse_part("date eq today", Grammar::default()).unwrap();
        assert_eq!(part, attr("date", "today"));
    }

    #[test]
    fn resource_parts_may_be_empty() {
        let part = parse_part("resource ::Dummy", all()).unwrap();
        assert_eq!(part, RscExpr::new(None, None, Some("Dummy")).into());
    }

    #[test]
    fn op_with_interval() {
        let part = parse_part("op monitor interval=10min", all()).unwrap();
        assert_eq!(part, OpExpr::new("monitor", Some("10min")).into());
    }

    #[test]
    fn in_range_without_start() {
        let part = parse_part("date in_range to 2024-12-31", Grammar::default()).unwrap();
        assert_eq!(part, DateInRangeExpr::until(None, "2024-12-31").into());
    }

    #[test]
    fn empty_rule_is_none() {
        assert_eq!(parse_part("  \n ", Grammar::default()), None);
    }
}
