use cibrule::cib::{to_dto, Element};
use cibrule::{RuleExpressionType, RuleInEffectStatus};

fn dto(xml: &str) -> cibrule::RuleExpressionDto {
    to_dto(&Element::parse(xml).unwrap())
}

#[test]
fn unary_node_attribute() {
    let rule = dto(
        r#"<rule id="location-rule" boolean-op="and" score="INFINITY">
             <expression id="location-rule-expr" attribute="pingd" operation="defined"/>
           </rule>"#,
    );
    assert_eq!(rule.as_string, "defined pingd");
    assert_eq!(rule.expressions.len(), 1);
    assert_eq!(rule.expressions[0].expr_type, RuleExpressionType::Expression);
    assert_eq!(rule.expressions[0].as_string, "defined pingd");
}

#[test]
fn value_with_space_is_quoted() {
    let rule = dto(
        r#"<rule id="r" boolean-op="and" score="INFINITY">
             <expression id="r-expr" attribute="my-attr" operation="eq" value="my value"/>
           </rule>"#,
    );
    assert_eq!(rule.as_string, "my-attr eq \"my value\"");
}

#[test]
fn resource_expression() {
    let rule = dto(
        r#"<rule id="r" boolean-op="and" score="INFINITY">
             <rsc_expression id="r-rsc-Dummy" class="ocf" provider="pacemaker" type="Dummy"/>
           </rule>"#,
    );
    assert_eq!(rule.as_string, "resource ocf:pacemaker:Dummy");
    let rsc = &rule.expressions[0];
    assert_eq!(rsc.expr_type, RuleExpressionType::RscExpression);
    assert_eq!(rsc.options.get("provider").map(String::as_str), Some("pacemaker"));

    assert_eq!(
        dto(r#"<rsc_expression id="x" type="IPaddr2"/>"#).as_string,
        "resource ::IPaddr2"
    );
}

#[test]
fn in_range_with_duration() {
    let rule = dto(
        r#"<rule id="r" boolean-op="and" score="INFINITY">
             <date_expression id="r-expr" operation="in_range" start="2014-06-26">
               <duration id="r-expr-duration" years="1"/>
             </date_expression>
           </rule>"#,
    );
    assert_eq!(rule.as_string, "date in_range 2014-06-26 to duration years=1");
    let date = &rule.expressions[0];
    assert_eq!(date.expr_type, RuleExpressionType::DateExpression);
    assert_eq!(date.duration.as_ref().map(|d| d.id.as_str()), Some("r-expr-duration"));
    assert!(date.date_spec.is_none());
}

#[test]
fn nested_rules_are_parenthesized() {
    let rule = dto(
        r##"<rule id="r" boolean-op="or" score="INFINITY">
             <rule id="r-rule" boolean-op="and">
               <expression id="r-rule-expr" attribute="#uname" operation="eq" value="node1"/>
               <date_expression id="r-rule-expr-1" operation="gt" start="2014-06-26"/>
             </rule>
             <rule id="r-rule-1" boolean-op="and">
               <date_expression id="r-rule-1-expr" operation="date_spec">
                 <date_spec id="r-rule-1-expr-datespec" weekdays="6-7"/>
               </date_expression>
             </rule>
           </rule>"##,
    );
    assert_eq!(
        rule.as_string,
        "(#uname eq node1 and date gt 2014-06-26) or (date-spec weekdays=6-7)"
    );
    assert_eq!(rule.rule_ids(), vec!["r", "r-rule", "r-rule-1"]);
    assert_eq!(
        rule.expressions[1].expressions[0]
            .date_spec
            .as_ref()
            .and_then(|d| d.options.get("weekdays"))
            .map(String::as_str),
        Some("6-7")
    );
}

#[test]
fn missing_boolean_op_means_and() {
    let rule = dto(
        r#"<rule id="r">
             <op_expression id="r-op-start" name="start"/>
             <op_expression id="r-op-stop" name="stop"/>
           </rule>"#,
    );
    assert_eq!(rule.as_string, "op start and op stop");
    assert!(!rule.options.contains_key("boolean-op"));
}

#[test]
fn attributes_are_kept_verbatim() {
    let rule = dto(
        r#"<rule id="r" boolean-op="and" score="INFINITY" role="Promoted">
             <date_expression id="r-expr" operation="lt" end="2015-01-01"/>
           </rule>"#,
    );
    assert_eq!(rule.id, "r");
    assert_eq!(rule.options.len(), 3);
    assert_eq!(rule.options.get("role").map(String::as_str), Some("Promoted"));
    assert_eq!(
        rule.expressions[0].options.get("end").map(String::as_str),
        Some("2015-01-01")
    );
    assert!(rule.expressions[0].options.get("id").is_none());
}

#[test]
fn statuses_default_to_unknown() {
    let rule = dto(
        r#"<rule id="r"><rule id="r-rule"><expression id="e" attribute="a" operation="defined"/></rule></rule>"#,
    );
    assert_eq!(rule.in_effect_status, RuleInEffectStatus::Unknown);
    assert_eq!(rule.expressions[0].in_effect_status, RuleInEffectStatus::Unknown);
}

#[test]
fn serializes_for_display_layers() {
    let rule = dto(
        r#"<rule id="r" boolean-op="and"><date_expression id="d" operation="date_spec"><date_spec id="ds" hours="9-16"/></date_expression></rule>"#,
    );
    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(json["id"], "r");
    assert_eq!(json["type"], "RULE");
    assert_eq!(json["in_effect_status"], "UNKNOWN");
    assert_eq!(json["as_string"], "date-spec hours=9-16");
    assert_eq!(json["options"]["boolean-op"], "and");
    assert!(json["date_spec"].is_null());

    let date = &json["expressions"][0];
    assert_eq!(date["type"], "DATE_EXPRESSION");
    assert_eq!(date["date_spec"]["id"], "ds");
    assert_eq!(date["date_spec"]["options"]["hours"], "9-16");

    let back: cibrule::RuleExpressionDto = serde_json::from_value(json).unwrap();
    assert_eq!(back, rule);
}
