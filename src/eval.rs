use std::cmp::Ordering;

use regex::Regex;
use tracing::warn;

use crate::{
    config::FieldNaming,
    criteria::{CriteriaNode, fields::FieldNode},
    error::Error,
    filter::{FieldPredicate, Operator, RangeOp},
    query::Value,
    record::{FieldRef, Record},
};

/// Matches criteria objects against already materialized records.
///
/// Fields are checked in enumeration order and the first failing field
/// ends the evaluation. An absent candidate, or an absent sub-record under
/// nested criteria, behaves as a record with every attribute absent.
///
/// Every pattern of the criteria is compiled before any field is checked,
/// so an invalid pattern is reported whatever the candidate looks like.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    naming: FieldNaming,
}

impl Evaluator {
    pub fn new(naming: FieldNaming) -> Self {
        Self { naming }
    }

    /// Like [`try_matches`](Self::try_matches), but reports any error as a
    /// non-match after logging it.
    pub fn matches(&self, criteria: &dyn CriteriaNode, candidate: Option<&dyn Record>) -> bool {
        match self.try_matches(criteria, candidate) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(
                    criteria = criteria.criteria_name(),
                    field = err.field().unwrap_or_default(),
                    error = %err,
                    "criteria evaluation failed, treating candidate as non-match"
                );
                false
            }
        }
    }

    pub fn try_matches(
        &self,
        criteria: &dyn CriteriaNode,
        candidate: Option<&dyn Record>,
    ) -> Result<bool, Error> {
        Ok(self.matcher(criteria)?.matches(candidate))
    }

    /// Prepares `criteria` once for matching many candidates.
    pub fn matcher(&self, criteria: &dyn CriteriaNode) -> Result<Matcher, Error> {
        let mut path = Vec::new();
        Ok(Matcher {
            naming: self.naming,
            steps: plan(criteria, &mut path)?,
        })
    }
}

/// Criteria lowered for evaluation, with its patterns compiled.
#[derive(Debug, Clone)]
pub struct Matcher {
    naming: FieldNaming,
    steps: Vec<Step>,
}

impl Matcher {
    pub fn matches(&self, candidate: Option<&dyn Record>) -> bool {
        self.run(&self.steps, candidate)
    }

    fn run(&self, steps: &[Step], record: Option<&dyn Record>) -> bool {
        steps.iter().all(|step| match step {
            Step::Filter { name, groups } => {
                let attribute = record.and_then(|r| r.field(&self.naming.apply(name)));
                groups.is_empty()
                    || groups.iter().any(|group| {
                        group
                            .iter()
                            .all(|check| check_holds(check, attribute.as_ref()))
                    })
            }
            Step::Nested { name, steps } => {
                let attribute = record.and_then(|r| r.field(&self.naming.apply(name)));
                let sub_record = match attribute {
                    Some(FieldRef::Record(r)) => Some(r),
                    _ => None,
                };
                self.run(steps, sub_record)
            }
        })
    }
}

#[derive(Debug, Clone)]
enum Step {
    Filter {
        name: &'static str,
        groups: Vec<Vec<Check>>,
    },
    Nested {
        name: &'static str,
        steps: Vec<Step>,
    },
}

#[derive(Debug, Clone)]
enum Check {
    Operator(Operator),
    Pattern(Regex),
}

fn plan(node: &dyn CriteriaNode, path: &mut Vec<&'static str>) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    for field in node.set_fields()? {
        let name = field.descriptor.name;
        path.push(name);
        let step = match field.node {
            FieldNode::Filter(filter) => Step::Filter {
                name,
                groups: compile_groups(filter.predicate(), path)?,
            },
            FieldNode::Nested(sub) => Step::Nested {
                name,
                steps: plan(sub, path)?,
            },
        };
        path.pop();
        steps.push(step);
    }
    Ok(steps)
}

fn compile_groups(
    predicate: FieldPredicate,
    path: &[&'static str],
) -> Result<Vec<Vec<Check>>, Error> {
    predicate
        .groups
        .into_iter()
        .map(|group| {
            group
                .0
                .into_iter()
                .map(|operator| match operator {
                    Operator::Pattern(pattern) => Regex::new(&pattern)
                        .map(Check::Pattern)
                        .map_err(|e| Error::InvalidPattern {
                            field: path.join("."),
                            pattern,
                            reason: e.to_string(),
                        }),
                    other => Ok(Check::Operator(other)),
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

fn check_holds(check: &Check, attribute: Option<&FieldRef<'_>>) -> bool {
    let value = match attribute {
        None => return matches!(check, Check::Operator(Operator::Exists(false))),
        Some(FieldRef::Value(value)) => Some(value),
        // present, but no value operator applies
        Some(FieldRef::Record(_)) | Some(FieldRef::Opaque) => None,
    };

    let operator = match check {
        Check::Pattern(regex) => return value.is_some_and(|v| regex.is_match(&v.to_string())),
        Check::Operator(operator) => operator,
    };
    match operator {
        Operator::Exists(exists) => *exists,
        Operator::Eq(expected) => value.is_some_and(|v| v.matches(expected)),
        Operator::Ne(excluded) => value.is_some_and(|v| !v.matches(excluded)),
        // lowered to Check::Pattern by compile_groups
        Operator::Pattern(_) => false,
        Operator::Range(op, bound) => value
            .and_then(|v| v.compare(bound))
            .is_some_and(|ordering| range_holds(*op, ordering)),
        Operator::In(set) => value.is_some_and(|v| contains(set, v)),
        Operator::NotIn(set) => value.is_some_and(|v| !contains(set, v)),
    }
}

fn range_holds(op: RangeOp, ordering: Ordering) -> bool {
    match op {
        RangeOp::Gte => ordering != Ordering::Less,
        RangeOp::Gt => ordering == Ordering::Greater,
        RangeOp::Lte => ordering != Ordering::Greater,
        RangeOp::Lt => ordering == Ordering::Less,
    }
}

fn contains(set: &[Value], value: &Value) -> bool {
    set.iter().any(|candidate| value.matches(candidate))
}
