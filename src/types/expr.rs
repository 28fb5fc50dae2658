use std::fmt;

/// Boolean operators joining the children of a [`BoolExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOperator {
    And,
    Or,
}

/// Operators of a node attribute expression. `Defined` and `NotDefined` are
/// unary, the rest compare the attribute against a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeAttrOp {
    Defined,
    NotDefined,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Value type of a binary node attribute comparison.
///
/// `Integer` is the legacy spelling of `Number` and is kept so that old rules
/// keep parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeAttrType {
    String,
    Integer,
    Number,
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnaryOp {
    Gt,
    Lt,
}

/// The kinds of expressions a rule can be made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprKind {
    Bool,
    NodeAttr,
    Rsc,
    Op,
    DateUnary,
    DateInRange,
    Datespec,
}

/// Root and only inner node of a parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolExpr {
    pub operator: BoolOperator,
    pub children: Vec<RuleExprPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttrExpr {
    pub operator: NodeAttrOp,
    pub attr_name: String,
    /// `None` for the unary operators.
    pub attr_value: Option<String>,
    pub attr_type: Option<NodeAttrType>,
}

/// Matches resources by agent. Every part is optional, `None` meaning "any".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RscExpr {
    pub standard: Option<String>,
    pub provider: Option<String>,
    pub rsc_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpExpr {
    pub name: String,
    /// Kept verbatim, e.g. `"30s"`.
    pub interval: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateUnaryExpr {
    pub operator: DateUnaryOp,
    pub date: String,
}

/// Upper bound of a date range: either an explicit date or a duration added
/// to the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRangeEnd {
    Date(String),
    Duration(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateInRangeExpr {
    pub date_start: Option<String>,
    pub end: DateRangeEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatespecExpr {
    /// Part names are not checked here; duplicates are allowed.
    pub date_parts: Vec<(String, String)>,
}

/// A node of the rule expression tree.
///
/// Only [`RuleExprPart::Bool`] has children, every other variant is a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExprPart {
    Bool(BoolExpr),
    NodeAttr(NodeAttrExpr),
    Rsc(RscExpr),
    Op(OpExpr),
    DateUnary(DateUnaryExpr),
    DateInRange(DateInRangeExpr),
    Datespec(DatespecExpr),
}

// -- Constructors -----------------------------------------------------------

impl BoolExpr {
    #[must_use]
    pub fn new(operator: BoolOperator, children: Vec<RuleExprPart>) -> Self {
        Self { operator, children }
    }

    #[must_use]
    pub fn and(children: Vec<RuleExprPart>) -> Self {
        Self::new(BoolOperator::And, children)
    }

    #[must_use]
    pub fn or(children: Vec<RuleExprPart>) -> Self {
        Self::new(BoolOperator::Or, children)
    }

    /// Whether an expression of `kind` appears anywhere below this node.
    #[must_use]
    pub fn contains(&self, kind: ExprKind) -> bool {
        self.children.iter().any(|child| match child {
            RuleExprPart::Bool(inner) => kind == ExprKind::Bool || inner.contains(kind),
            other => other.kind() == kind,
        })
    }
}

impl NodeAttrExpr {
    #[must_use]
    pub fn unary(operator: NodeAttrOp, attr_name: &str) -> Self {
        Self {
            operator,
            attr_name: attr_name.to_owned(),
            attr_value: None,
            attr_type: None,
        }
    }

    #[must_use]
    pub fn binary(
        attr_name: &str,
        operator: NodeAttrOp,
        attr_value: &str,
        attr_type: Option<NodeAttrType>,
    ) -> Self {
        Self {
            operator,
            attr_name: attr_name.to_owned(),
            attr_value: Some(attr_value.to_owned()),
            attr_type,
        }
    }
}

impl RscExpr {
    #[must_use]
    pub fn new(standard: Option<&str>, provider: Option<&str>, rsc_type: Option<&str>) -> Self {
        Self {
            standard: standard.map(str::to_owned),
            provider: provider.map(str::to_owned),
            rsc_type: rsc_type.map(str::to_owned),
        }
    }
}

impl OpExpr {
    #[must_use]
    pub fn new(name: &str, interval: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            interval: interval.map(str::to_owned),
        }
    }
}

impl DateUnaryExpr {
    #[must_use]
    pub fn new(operator: DateUnaryOp, date: &str) -> Self {
        Self {
            operator,
            date: date.to_owned(),
        }
    }
}

impl DateInRangeExpr {
    #[must_use]
    pub fn until(date_start: Option<&str>, date_end: &str) -> Self {
        Self {
            date_start: date_start.map(str::to_owned),
            end: DateRangeEnd::Date(date_end.to_owned()),
        }
    }

    #[must_use]
    pub fn with_duration(date_start: Option<&str>, parts: &[(&str, &str)]) -> Self {
        Self {
            date_start: date_start.map(str::to_owned),
            end: DateRangeEnd::Duration(owned_pairs(parts)),
        }
    }

    #[must_use]
    pub fn date_end(&self) -> Option<&str> {
        match &self.end {
            DateRangeEnd::Date(date) => Some(date),
            DateRangeEnd::Duration(_) => None,
        }
    }

    #[must_use]
    pub fn duration_parts(&self) -> Option<&[(String, String)]> {
        match &self.end {
            DateRangeEnd::Date(_) => None,
            DateRangeEnd::Duration(parts) => Some(parts),
        }
    }
}

impl DatespecExpr {
    #[must_use]
    pub fn new(parts: &[(&str, &str)]) -> Self {
        Self {
            date_parts: owned_pairs(parts),
        }
    }
}

impl RuleExprPart {
    #[must_use]
    pub fn kind(&self) -> ExprKind {
        match self {
            RuleExprPart::Bool(_) => ExprKind::Bool,
            RuleExprPart::NodeAttr(_) => ExprKind::NodeAttr,
            RuleExprPart::Rsc(_) => ExprKind::Rsc,
            RuleExprPart::Op(_) => ExprKind::Op,
            RuleExprPart::DateUnary(_) => ExprKind::DateUnary,
            RuleExprPart::DateInRange(_) => ExprKind::DateInRange,
            RuleExprPart::Datespec(_) => ExprKind::Datespec,
        }
    }
}

fn owned_pairs(parts: &[(&str, &str)]) -> Vec<(String, String)> {
    parts
        .iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect()
}

macro_rules! impl_into_part {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RuleExprPart {
                fn from(expr: $ty) -> Self {
                    RuleExprPart::$variant(expr)
                }
            }
        )*
    };
}

impl_into_part! {
    BoolExpr => Bool,
    NodeAttrExpr => NodeAttr,
    RscExpr => Rsc,
    OpExpr => Op,
    DateUnaryExpr => DateUnary,
    DateInRangeExpr => DateInRange,
    DatespecExpr => Datespec,
}

// -- Rendering --------------------------------------------------------------

impl BoolOperator {
    /// Lowercase keyword, as written in rules and in the `boolean-op` attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        }
    }
}

impl NodeAttrOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeAttrOp::Defined => "defined",
            NodeAttrOp::NotDefined => "not_defined",
            NodeAttrOp::Eq => "eq",
            NodeAttrOp::Ne => "ne",
            NodeAttrOp::Gt => "gt",
            NodeAttrOp::Gte => "gte",
            NodeAttrOp::Lt => "lt",
            NodeAttrOp::Lte => "lte",
        }
    }

    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(self, NodeAttrOp::Defined | NodeAttrOp::NotDefined)
    }
}

impl NodeAttrType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeAttrType::String => "string",
            NodeAttrType::Integer => "integer",
            NodeAttrType::Number => "number",
            NodeAttrType::Version => "version",
        }
    }
}

impl DateUnaryOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DateUnaryOp::Gt => "gt",
            DateUnaryOp::Lt => "lt",
        }
    }
}

impl fmt::Display for BoolOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for NodeAttrOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for NodeAttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DateUnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprKind::Bool => "boolean expression",
            ExprKind::NodeAttr => "node attribute expression",
            ExprKind::Rsc => "resource expression",
            ExprKind::Op => "operation expression",
            ExprKind::DateUnary => "date expression",
            ExprKind::DateInRange => "date range expression",
            ExprKind::Datespec => "date-spec expression",
        };
        f.write_str(name)
    }
}

/// Quote a value when the rule syntax could not read it back as a bare token.
pub(crate) fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"'));
    if !needs_quotes {
        return value.to_owned();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn write_parts(f: &mut fmt::Formatter<'_>, parts: &[(String, String)]) -> fmt::Result {
    for (name, value) in parts {
        write!(f, " {name}={value}")?;
    }
    Ok(())
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.operator)?;
            }
            match child {
                RuleExprPart::Bool(inner) => write!(f, "({inner})")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for RuleExprPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleExprPart::Bool(expr) => write!(f, "{expr}"),
            RuleExprPart::NodeAttr(expr) => match &expr.attr_value {
                None => write!(f, "{} {}", expr.operator, expr.attr_name),
                Some(value) => {
                    write!(f, "{} {}", expr.attr_name, expr.operator)?;
                    if let Some(attr_type) = expr.attr_type {
                        write!(f, " {attr_type}")?;
                    }
                    write!(f, " {}", quote_if_needed(value))
                }
            },
            RuleExprPart::Rsc(expr) => write!(
                f,
                "resource {}:{}:{}",
                expr.standard.as_deref().unwrap_or_default(),
                expr.provider.as_deref().unwrap_or_default(),
                expr.rsc_type.as_deref().unwrap_or_default(),
            ),
            RuleExprPart::Op(expr) => {
                write!(f, "op {}", expr.name)?;
                if let Some(interval) = &expr.interval {
                    write!(f, " interval={interval}")?;
                }
                Ok(())
            }
            RuleExprPart::DateUnary(expr) => write!(f, "date {} {}", expr.operator, expr.date),
            RuleExprPart::DateInRange(expr) => {
                write!(f, "date in_range")?;
                if let Some(start) = &expr.date_start {
                    write!(f, " {start}")?;
                }
                write!(f, " to")?;
                match &expr.end {
                    DateRangeEnd::Date(end) => write!(f, " {end}"),
                    DateRangeEnd::Duration(parts) => {
                        write!(f, " duration")?;
                        write_parts(f, parts)
                    }
                }
            }
            RuleExprPart::Datespec(expr) => {
                write!(f, "date-spec")?;
                write_parts(f, &expr.date_parts)
            }
        }
    }
}
