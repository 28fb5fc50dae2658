//! Pacemaker CIB rule expressions.
//!
//! Rules are written in a compact text syntax such as
//! `date-spec hours=9-16 weekdays=1-5 and #uname eq node1`. This crate parses
//! them into a [`BoolExpr`] tree, validates the tree for the context it is
//! used in, lowers it to CIB XML, reads CIB rules back into a display form
//! ([`RuleExpressionDto`]) and works out whether rules are in effect.
//!
//! ```
//! use cibrule::cib::{self, DocumentIdProvider, Element};
//!
//! let tree = cibrule::parse_rule("op monitor interval=10s", false, true).unwrap();
//! assert!(cibrule::validate(&tree, false, true, false).is_empty());
//!
//! let mut defaults = Element::new("meta_attributes").with_attr("id", "op-defaults");
//! let mut ids = DocumentIdProvider::new(&defaults);
//! let rule = cib::export(&mut defaults, &tree, &mut ids).unwrap();
//! assert_eq!(cib::to_dto(rule).as_string, "op monitor interval=10s");
//! ```

pub mod cib;
pub mod config;
mod error;
pub mod in_effect;
pub mod iso8601;
mod parse;
pub mod runner;
mod types;
mod validate;

pub use error::CibRuleError;
pub use parse::{parse_rule, RuleParseError};
pub use types::{
    BoolExpr, BoolOperator, DateCommonDto, DateInRangeExpr, DateRangeEnd, DateUnaryExpr,
    DateUnaryOp, DatespecExpr, ExprKind, Finding, FindingMessage, NodeAttrExpr, NodeAttrOp,
    NodeAttrType, OpExpr, RscExpr, RuleExprPart, RuleExpressionDto, RuleExpressionType,
    RuleInEffectStatus, Severity,
};
pub use validate::validate;
