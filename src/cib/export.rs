use crate::{BoolExpr, DateRangeEnd, DateUnaryOp, RuleExprPart};

use super::{Element, IdAllocationError, IdProvider};

/// Lower `tree` to a CIB `rule` element appended to `parent`.
///
/// Ids are derived from the id of the enclosing element (the tag name when it
/// has none) and allocated in document order. Only the returned top-level
/// `rule` gets `score="INFINITY"`.
///
/// # Errors
///
/// Returns [`IdAllocationError`] if `id_provider` cannot allocate an id. In
/// that case `parent` is left untouched.
pub fn export<'a>(
    parent: &'a mut Element,
    tree: &BoolExpr,
    id_provider: &mut dyn IdProvider,
) -> Result<&'a mut Element, IdAllocationError> {
    let parent_id = parent.attr("id").unwrap_or(parent.name()).to_owned();
    let mut rule = export_bool(&parent_id, tree, id_provider)?;
    rule.set_attr("score", "INFINITY");
    tracing::debug!(
        parent = %parent_id,
        rule_id = rule.attr("id").unwrap_or_default(),
        "exported rule"
    );
    Ok(parent.append_child(rule))
}

fn export_bool(
    parent_id: &str,
    expr: &BoolExpr,
    ids: &mut dyn IdProvider,
) -> Result<Element, IdAllocationError> {
    let id = ids.allocate_id(&format!("{parent_id}-rule"))?;
    let mut rule = Element::new("rule")
        .with_attr("id", &id)
        .with_attr("boolean-op", expr.operator.as_str());
    for child in &expr.children {
        rule.append_child(export_part(&id, child, ids)?);
    }
    Ok(rule)
}

fn export_part(
    parent_id: &str,
    part: &RuleExprPart,
    ids: &mut dyn IdProvider,
) -> Result<Element, IdAllocationError> {
    let element = match part {
        RuleExprPart::Bool(expr) => export_bool(parent_id, expr, ids)?,

        RuleExprPart::NodeAttr(expr) => {
            let mut element = Element::new("expression")
                .with_attr("id", &ids.allocate_id(&format!("{parent_id}-expr"))?)
                .with_attr("attribute", &expr.attr_name)
                .with_attr("operation", expr.operator.as_str());
            if let Some(value) = &expr.attr_value {
                element.set_attr("value", value);
            }
            if let Some(attr_type) = expr.attr_type {
                element.set_attr("type", attr_type.as_str());
            }
            element
        }

        RuleExprPart::Rsc(expr) => {
            let candidate = match &expr.rsc_type {
                Some(rsc_type) => format!("{parent_id}-rsc-{rsc_type}"),
                None => format!("{parent_id}-rsc"),
            };
            let mut element = Element::new("rsc_expression")
                .with_attr("id", &ids.allocate_id(&candidate)?)
                .with_attr("class", expr.standard.as_deref().unwrap_or_default());
            if let Some(provider) = expr.provider.as_deref().filter(|p| !p.is_empty()) {
                element.set_attr("provider", provider);
            }
            if let Some(rsc_type) = &expr.rsc_type {
                element.set_attr("type", rsc_type);
            }
            element
        }

        RuleExprPart::Op(expr) => {
            let mut element = Element::new("op_expression")
                .with_attr(
                    "id",
                    &ids.allocate_id(&format!("{parent_id}-op-{}", expr.name))?,
                )
                .with_attr("name", &expr.name);
            if let Some(interval) = &expr.interval {
                element.set_attr("interval", interval);
            }
            element
        }

        RuleExprPart::DateUnary(expr) => {
            let bound = match expr.operator {
                DateUnaryOp::Gt => "start",
                DateUnaryOp::Lt => "end",
            };
            date_expression(parent_id, expr.operator.as_str(), ids)?.with_attr(bound, &expr.date)
        }

        RuleExprPart::DateInRange(expr) => {
            let mut element = date_expression(parent_id, "in_range", ids)?;
            if let Some(start) = &expr.date_start {
                element.set_attr("start", start);
            }
            match &expr.end {
                DateRangeEnd::Date(end) => element.set_attr("end", end),
                DateRangeEnd::Duration(parts) => {
                    let child = parts_element("duration", &element, parts, ids)?;
                    element.append_child(child);
                }
            }
            element
        }

        RuleExprPart::Datespec(expr) => {
            let mut element = date_expression(parent_id, "date_spec", ids)?;
            let child = parts_element("date_spec", &element, &expr.date_parts, ids)?;
            element.append_child(child);
            element
        }
    };
    Ok(element)
}

fn date_expression(
    parent_id: &str,
    operation: &str,
    ids: &mut dyn IdProvider,
) -> Result<Element, IdAllocationError> {
    Ok(Element::new("date_expression")
        .with_attr("id", &ids.allocate_id(&format!("{parent_id}-expr"))?)
        .with_attr("operation", operation))
}

/// A `duration` or `date_spec` element holding `parts` as attributes. A
/// repeated part name keeps its last value.
fn parts_element(
    tag: &str,
    owner: &Element,
    parts: &[(String, String)],
    ids: &mut dyn IdProvider,
) -> Result<Element, IdAllocationError> {
    let owner_id = owner.attr("id").unwrap_or(tag);
    let suffix = tag.replace('_', "");
    let mut element =
        Element::new(tag).with_attr("id", &ids.allocate_id(&format!("{owner_id}-{suffix}"))?);
    for (name, value) in parts {
        element.set_attr(name, value);
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cib::{to_dto, DocumentIdProvider};
    use crate::{
        DateInRangeExpr, DateUnaryExpr, DatespecExpr, NodeAttrExpr, NodeAttrOp, NodeAttrType,
        OpExpr, RscExpr,
    };

    fn export_into(parent: &mut Element, tree: &BoolExpr) -> String {
        let mut ids = DocumentIdProvider::new(parent);
        export(parent, tree, &mut ids).unwrap().to_xml()
    }

    #[test]
    fn op_and_rsc_defaults_rule() {
        let mut parent = Element::new("meta_attributes").with_attr("id", "op-defaults");
        let tree = BoolExpr::and(vec![
            RscExpr::new(Some("ocf"), Some("pacemaker"), Some("Dummy")).into(),
            OpExpr::new("monitor", Some("30s")).into(),
        ]);
        assert_eq!(
            export_into(&mut parent, &tree),
            concat!(
                r#"<rule id="op-defaults-rule" boolean-op="and" score="INFINITY">"#,
                r#"<rsc_expression id="op-defaults-rule-rsc-Dummy" class="ocf" provider="pacemaker" type="Dummy"/>"#,
                r#"<op_expression id="op-defaults-rule-op-monitor" name="monitor" interval="30s"/>"#,
                "</rule>",
            )
        );
        assert_eq!(parent.children().len(), 1);
    }

    #[test]
    fn score_only_on_top_level_rule() {
        let mut parent = Element::new("meta_attributes").with_attr("id", "m");
        let tree = BoolExpr::or(vec![
            BoolExpr::and(vec![OpExpr::new("start", None).into()]).into(),
            OpExpr::new("stop", None).into(),
        ]);
        let mut ids = DocumentIdProvider::new(&parent);
        let rule = export(&mut parent, &tree, &mut ids).unwrap();
        assert_eq!(rule.attr("score"), Some("INFINITY"));
        assert_eq!(rule.children()[0].name(), "rule");
        assert_eq!(rule.children()[0].attr("score"), None);
        assert_eq!(rule.children()[0].attr("id"), Some("m-rule-rule"));
    }

    #[test]
    fn same_op_name_gets_distinct_ids() {
        let mut parent = Element::new("meta_attributes").with_attr("id", "m");
        let tree = BoolExpr::or(vec![
            OpExpr::new("monitor", Some("10")).into(),
            OpExpr::new("monitor", Some("20")).into(),
        ]);
        let mut ids = DocumentIdProvider::new(&parent);
        let rule = export(&mut parent, &tree, &mut ids).unwrap();
        let op_ids: Vec<_> = rule.children().iter().filter_map(|c| c.attr("id")).collect();
        assert_eq!(op_ids, vec!["m-rule-op-monitor", "m-rule-op-monitor-1"]);
    }

    #[test]
    fn node_attr_and_dates() {
        let mut parent = Element::new("rsc_location").with_attr("id", "loc");
        let tree = BoolExpr::and(vec![
            NodeAttrExpr::unary(NodeAttrOp::NotDefined, "pingd").into(),
            NodeAttrExpr::binary("#uname", NodeAttrOp::Gte, "5", Some(NodeAttrType::Number)).into(),
            DateUnaryExpr::new(DateUnaryOp::Gt, "2014-06-26").into(),
            DateUnaryExpr::new(DateUnaryOp::Lt, "2015-06-26").into(),
            DateInRangeExpr::until(None, "2016-01-01").into(),
        ]);
        assert_eq!(
            export_into(&mut parent, &tree),
            concat!(
                r#"<rule id="loc-rule" boolean-op="and" score="INFINITY">"#,
                r#"<expression id="loc-rule-expr" attribute="pingd" operation="not_defined"/>"#,
                r##"<expression id="loc-rule-expr-1" attribute="#uname" operation="gte" value="5" type="number"/>"##,
                r#"<date_expression id="loc-rule-expr-2" operation="gt" start="2014-06-26"/>"#,
                r#"<date_expression id="loc-rule-expr-3" operation="lt" end="2015-06-26"/>"#,
                r#"<date_expression id="loc-rule-expr-4" operation="in_range" end="2016-01-01"/>"#,
                "</rule>",
            )
        );
    }

    #[test]
    fn duration_and_datespec_children() {
        let mut parent = Element::new("meta_attributes").with_attr("id", "m");
        let tree = BoolExpr::and(vec![
            DateInRangeExpr::with_duration(Some("2014-06-26"), &[("years", "1")]).into(),
            DatespecExpr::new(&[("hours", "9-16"), ("weekdays", "1-5"), ("hours", "10")]).into(),
        ]);
        assert_eq!(
            export_into(&mut parent, &tree),
            concat!(
                r#"<rule id="m-rule" boolean-op="and" score="INFINITY">"#,
                r#"<date_expression id="m-rule-expr" operation="in_range" start="2014-06-26">"#,
                r#"<duration id="m-rule-expr-duration" years="1"/>"#,
                "</date_expression>",
                r#"<date_expression id="m-rule-expr-1" operation="date_spec">"#,
                r#"<date_spec id="m-rule-expr-1-datespec" hours="10" weekdays="1-5"/>"#,
                "</date_expression>",
                "</rule>",
            )
        );
    }

    #[test]
    fn parent_without_id_uses_tag_name() {
        let mut parent = Element::new("rsc_defaults");
        let tree = BoolExpr::and(vec![RscExpr::new(Some("ocf"), Some(""), None).into()]);
        assert_eq!(
            export_into(&mut parent, &tree),
            concat!(
                r#"<rule id="rsc_defaults-rule" boolean-op="and" score="INFINITY">"#,
                r#"<rsc_expression id="rsc_defaults-rule-rsc" class="ocf"/>"#,
                "</rule>",
            )
        );
    }

    #[test]
    fn resource_without_standard_keeps_empty_class() {
        let mut parent = Element::new("meta_attributes").with_attr("id", "m");
        let tree = BoolExpr::and(vec![RscExpr::new(None, None, Some("Dummy")).into()]);
        assert_eq!(
            export_into(&mut parent, &tree),
            concat!(
                r#"<rule id="m-rule" boolean-op="and" score="INFINITY">"#,
                r#"<rsc_expression id="m-rule-rsc-Dummy" class="" type="Dummy"/>"#,
                "</rule>",
            )
        );
        let rule = &parent.children()[0];
        assert_eq!(to_dto(rule).as_string, "resource ::Dummy");
    }

    #[test]
    fn failed_allocation_leaves_parent_alone() {
        struct Refuse;
        impl IdProvider for Refuse {
            fn allocate_id(&mut self, candidate: &str) -> Result<String, IdAllocationError> {
                Err(IdAllocationError::Exhausted {
                    candidate: candidate.to_owned(),
                })
            }
        }
        let mut parent = Element::new("meta_attributes").with_attr("id", "m");
        let tree = BoolExpr::and(vec![]);
        assert!(export(&mut parent, &tree, &mut Refuse).is_err());
        assert!(parent.children().is_empty());
    }
}
