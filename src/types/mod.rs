mod dto;
mod expr;
mod finding;

pub use dto::{DateCommonDto, RuleExpressionDto, RuleExpressionType, RuleInEffectStatus};
pub use expr::{
    BoolExpr, BoolOperator, DateInRangeExpr, DateRangeEnd, DateUnaryExpr, DateUnaryOp,
    DatespecExpr, ExprKind, NodeAttrExpr, NodeAttrOp, NodeAttrType, OpExpr, RscExpr,
    RuleExprPart,
};
pub(crate) use expr::quote_if_needed;
pub use finding::{Finding, FindingMessage, Severity};
