//! Whether rules are currently in effect.

use std::collections::HashMap;

use chrono::{Months, NaiveDateTime, TimeDelta};

use crate::cib::Element;
use crate::config::{Config, InEffectSource};
use crate::iso8601;
use crate::runner::{CommandRunner, RunnerError};
use crate::{RuleExpressionDto, RuleInEffectStatus};

/// `crm_rule` exit code for a rule whose end date has passed.
pub const CRM_EX_EXPIRED: i32 = 110;
/// `crm_rule` exit code for a rule whose start date is in the future.
pub const CRM_EX_NOT_YET_IN_EFFECT: i32 = 111;

pub trait RuleInEffectEval {
    fn get_rule_status(&self, rule_id: &str) -> RuleInEffectStatus;
}

/// Knows nothing; every rule is [`RuleInEffectStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleInEffectEvalDummy;

impl RuleInEffectEval for RuleInEffectEvalDummy {
    fn get_rule_status(&self, _rule_id: &str) -> RuleInEffectStatus {
        RuleInEffectStatus::Unknown
    }
}

/// Answers from a single batched `crm_rule --check` run.
#[derive(Debug, Clone, Default)]
pub struct CrmRuleEval {
    statuses: HashMap<String, RuleInEffectStatus>,
}

impl CrmRuleEval {
    /// Ask `crm_rule` about all of `rule_ids` at once, feeding it `cib`.
    ///
    /// No process is started when `rule_ids` is empty. Output that cannot be
    /// read leaves every rule [`RuleInEffectStatus::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if `crm_rule` cannot be run at all.
    pub fn query(
        runner: &dyn CommandRunner,
        crm_rule_exec: &str,
        cib: &Element,
        rule_ids: &[String],
    ) -> Result<Self, RunnerError> {
        if rule_ids.is_empty() {
            return Ok(Self::default());
        }

        let mut args = vec![
            crm_rule_exec,
            "--check",
            "--output-as=xml",
            "--xml-text",
            "-",
        ];
        for id in rule_ids {
            args.extend(["--rule", id.as_str()]);
        }
        tracing::debug!(rules = rule_ids.len(), "checking rules with crm_rule");
        let output = runner.run(&args, Some(&cib.to_xml()))?;

        let statuses = match Element::parse(&output.stdout) {
            Ok(result) => result
                .descendants()
                .into_iter()
                .filter(|element| element.name() == "rule-check")
                .filter_map(|check| {
                    let id = check.attr("rule-id")?;
                    let status = check
                        .attr("rc")
                        .and_then(|rc| rc.trim().parse().ok())
                        .map_or(RuleInEffectStatus::Unknown, status_from_exit_code);
                    Some((id.to_owned(), status))
                })
                .collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retval = output.retval,
                    stderr = %output.stderr.trim(),
                    "unable to read crm_rule output"
                );
                HashMap::new()
            }
        };
        Ok(Self { statuses })
    }
}

impl RuleInEffectEval for CrmRuleEval {
    fn get_rule_status(&self, rule_id: &str) -> RuleInEffectStatus {
        self.statuses
            .get(rule_id)
            .copied()
            .unwrap_or(RuleInEffectStatus::Unknown)
    }
}

#[must_use]
pub fn status_from_exit_code(code: i32) -> RuleInEffectStatus {
    match code {
        0 => RuleInEffectStatus::InEffect,
        CRM_EX_EXPIRED => RuleInEffectStatus::Expired,
        CRM_EX_NOT_YET_IN_EFFECT => RuleInEffectStatus::NotYetInEffect,
        _ => RuleInEffectStatus::Unknown,
    }
}

/// Judges rules from their date expressions against a fixed clock, without
/// Pacemaker.
///
/// Only `gt`, `lt` and `in_range` date expressions are understood. Anything
/// else makes its branch unknown, which an `and` rule can still override when
/// another branch has already expired and an `or` rule when another branch is
/// in effect.
#[derive(Debug, Clone, Copy)]
pub struct ClockRuleEval<'a> {
    cib: &'a Element,
    now: NaiveDateTime,
}

impl<'a> ClockRuleEval<'a> {
    #[must_use]
    pub fn new(cib: &'a Element, now: NaiveDateTime) -> Self {
        Self { cib, now }
    }

    fn rule_status(&self, rule: &Element) -> RuleInEffectStatus {
        let statuses: Vec<RuleInEffectStatus> = rule
            .children()
            .iter()
            .filter_map(|child| match child.name() {
                "rule" => Some(self.rule_status(child)),
                "date_expression" => Some(self.date_status(child)),
                "expression" | "op_expression" | "rsc_expression" => {
                    Some(RuleInEffectStatus::Unknown)
                }
                _ => None,
            })
            .collect();
        if statuses.is_empty() {
            return RuleInEffectStatus::Unknown;
        }
        match rule.attr("boolean-op").unwrap_or("and") {
            "or" => combine_or(&statuses),
            _ => combine_and(&statuses),
        }
    }

    fn date_status(&self, expr: &Element) -> RuleInEffectStatus {
        let date = |name: &str| expr.attr(name).map(iso8601::parse);
        let status = match expr.attr("operation").unwrap_or("in_range") {
            "gt" => date("start").flatten().map(|start| {
                if self.now > start {
                    RuleInEffectStatus::InEffect
                } else {
                    RuleInEffectStatus::NotYetInEffect
                }
            }),
            "lt" => date("end").flatten().map(|end| {
                if self.now < end {
                    RuleInEffectStatus::InEffect
                } else {
                    RuleInEffectStatus::Expired
                }
            }),
            "in_range" => {
                // A bound that is present but unreadable makes the range unknown.
                let start = date("start");
                let end = match (date("end"), expr.child("duration")) {
                    (Some(end), _) => Some(end),
                    (None, Some(duration)) => {
                        Some(start.flatten().and_then(|s| add_duration(s, duration)))
                    }
                    (None, None) => None,
                };
                self.range_status(start, end)
            }
            _ => None,
        };
        status.unwrap_or(RuleInEffectStatus::Unknown)
    }

    fn range_status(
        &self,
        start: Option<Option<NaiveDateTime>>,
        end: Option<Option<NaiveDateTime>>,
    ) -> Option<RuleInEffectStatus> {
        if start.is_none() && end.is_none() {
            return None;
        }
        let start = start.map_or(Some(None), |s| s.map(Some))?;
        let end = end.map_or(Some(None), |e| e.map(Some))?;
        if start.is_some_and(|start| self.now < start) {
            Some(RuleInEffectStatus::NotYetInEffect)
        } else if end.is_some_and(|end| self.now > end) {
            Some(RuleInEffectStatus::Expired)
        } else {
            Some(RuleInEffectStatus::InEffect)
        }
    }
}

impl RuleInEffectEval for ClockRuleEval<'_> {
    fn get_rule_status(&self, rule_id: &str) -> RuleInEffectStatus {
        match self.cib.find_by_id(rule_id) {
            Some(rule) if rule.name() == "rule" => self.rule_status(rule),
            _ => {
                tracing::warn!(rule_id, "rule not found in CIB");
                RuleInEffectStatus::Unknown
            }
        }
    }
}

fn add_duration(start: NaiveDateTime, duration: &Element) -> Option<NaiveDateTime> {
    duration
        .attributes()
        .filter(|(name, _)| *name != "id")
        .try_fold(start, |at, (name, value)| {
            let n: u32 = value.trim().parse().ok()?;
            match name {
                "years" => at.checked_add_months(Months::new(n.checked_mul(12)?)),
                "months" => at.checked_add_months(Months::new(n)),
                "weeks" => at.checked_add_signed(TimeDelta::try_weeks(i64::from(n))?),
                "hours" => at.checked_add_signed(TimeDelta::try_hours(i64::from(n))?),
                _ => None,
            }
        })
}

fn combine_and(statuses: &[RuleInEffectStatus]) -> RuleInEffectStatus {
    use RuleInEffectStatus::{Expired, InEffect, NotYetInEffect, Unknown};
    if statuses.contains(&Expired) {
        Expired
    } else if statuses.contains(&Unknown) {
        Unknown
    } else if statuses.contains(&NotYetInEffect) {
        NotYetInEffect
    } else {
        InEffect
    }
}

fn combine_or(statuses: &[RuleInEffectStatus]) -> RuleInEffectStatus {
    use RuleInEffectStatus::{Expired, InEffect, NotYetInEffect, Unknown};
    if statuses.contains(&InEffect) {
        InEffect
    } else if statuses.contains(&Unknown) {
        Unknown
    } else if statuses.iter().all(|s| *s == Expired) {
        Expired
    } else {
        NotYetInEffect
    }
}

/// Set the status of every rule node of `dto` from `eval`. Only rule ids are
/// ever looked up.
#[must_use]
pub fn apply_in_effect_status(
    eval: &dyn RuleInEffectEval,
    dto: RuleExpressionDto,
) -> RuleExpressionDto {
    dto.with_in_effect(&|rule_id| eval.get_rule_status(rule_id))
}

/// Fill in the status of every rule node of `dto` with one `crm_rule` run.
///
/// # Errors
///
/// Returns [`RunnerError`] if `crm_rule` cannot be run.
pub fn fill_in_effect_status(
    runner: &dyn CommandRunner,
    crm_rule_exec: &str,
    cib: &Element,
    dto: RuleExpressionDto,
) -> Result<RuleExpressionDto, RunnerError> {
    let eval = CrmRuleEval::query(runner, crm_rule_exec, cib, &dto.rule_ids())?;
    Ok(apply_in_effect_status(&eval, dto))
}

/// Fill in rule statuses from whichever source `config` selects.
///
/// # Errors
///
/// Returns [`RunnerError`] if Pacemaker is the source and `crm_rule` cannot
/// be run.
pub fn resolve_in_effect_status(
    config: &Config,
    runner: &dyn CommandRunner,
    cib: &Element,
    dto: RuleExpressionDto,
    now: NaiveDateTime,
) -> Result<RuleExpressionDto, RunnerError> {
    match config.in_effect_source() {
        InEffectSource::Pacemaker => {
            let exec = config.crm_rule_exec();
            fill_in_effect_status(runner, &exec.to_string_lossy(), cib, dto)
        }
        InEffectSource::Clock => Ok(apply_in_effect_status(&ClockRuleEval::new(cib, now), dto)),
        InEffectSource::Disabled => Ok(apply_in_effect_status(&RuleInEffectEvalDummy, dto)),
    }
}
