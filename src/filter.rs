use serde::{Deserialize, Serialize};

use crate::query::{ToValue, Value};

/// Predicate over a single criteria field.
///
/// Every set operator must hold at once. `alternative` is a second group
/// that is OR-ed with this one; see [`FieldPredicate`] for how the groups
/// are combined. A value with nothing set matches everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValue<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ne: Option<T>,
    #[serde(
        default,
        rename = "regex",
        alias = "pattern",
        skip_serializing_if = "Option::is_none"
    )]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#in: Option<Vec<T>>,
    #[serde(
        default,
        rename = "nin",
        alias = "notIn",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_in: Option<Vec<T>>,
    #[serde(
        default,
        rename = "or",
        alias = "alternative",
        skip_serializing_if = "Option::is_none"
    )]
    pub alternative: Option<Box<FilterValue<T>>>,
}

impl<T> Default for FilterValue<T> {
    fn default() -> Self {
        Self {
            eq: None,
            ne: None,
            pattern: None,
            gte: None,
            gt: None,
            lte: None,
            lt: None,
            exists: None,
            r#in: None,
            not_in: None,
            alternative: None,
        }
    }
}

fn dedup<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

impl<T: PartialEq> FilterValue<T> {
    pub fn eq(value: impl Into<T>) -> Self {
        Self::default().and_eq(value)
    }

    pub fn ne(value: impl Into<T>) -> Self {
        Self::default().and_ne(value)
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::default().and_pattern(pattern)
    }

    pub fn gte(value: impl Into<T>) -> Self {
        Self::default().and_gte(value)
    }

    pub fn gt(value: impl Into<T>) -> Self {
        Self::default().and_gt(value)
    }

    pub fn lte(value: impl Into<T>) -> Self {
        Self::default().and_lte(value)
    }

    pub fn lt(value: impl Into<T>) -> Self {
        Self::default().and_lt(value)
    }

    pub fn exists(exists: bool) -> Self {
        Self::default().and_exists(exists)
    }

    pub fn is_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        Self::default().and_in(values)
    }

    pub fn not_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        Self::default().and_not_in(values)
    }

    pub fn and_eq(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.eq = Some(value.into());
        consumed_self
    }

    pub fn and_ne(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.ne = Some(value.into());
        consumed_self
    }

    pub fn and_pattern(self, pattern: impl Into<String>) -> Self {
        let mut consumed_self = self;
        consumed_self.pattern = Some(pattern.into());
        consumed_self
    }

    pub fn and_gte(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.gte = Some(value.into());
        consumed_self
    }

    pub fn and_gt(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.gt = Some(value.into());
        consumed_self
    }

    pub fn and_lte(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.lte = Some(value.into());
        consumed_self
    }

    pub fn and_lt(self, value: impl Into<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.lt = Some(value.into());
        consumed_self
    }

    pub fn and_exists(self, exists: bool) -> Self {
        let mut consumed_self = self;
        consumed_self.exists = Some(exists);
        consumed_self
    }

    pub fn and_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        let mut consumed_self = self;
        consumed_self.r#in = Some(dedup(values.into_iter().map(Into::into)));
        consumed_self
    }

    pub fn and_not_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        let mut consumed_self = self;
        consumed_self.not_in = Some(dedup(values.into_iter().map(Into::into)));
        consumed_self
    }

    /// Attaches an alternative group. An existing alternative is kept and
    /// the new one is chained behind it.
    pub fn or(self, alternative: FilterValue<T>) -> Self {
        let mut consumed_self = self;
        consumed_self.alternative = Some(Box::new(match consumed_self.alternative.take() {
            Some(existing) => (*existing).or(alternative),
            None => alternative,
        }));
        consumed_self
    }
}

impl<T> FilterValue<T> {
    /// True when neither this group nor any alternative sets an operator.
    pub fn is_neutral(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.pattern.is_none()
            && self.gte.is_none()
            && self.gt.is_none()
            && self.lte.is_none()
            && self.lt.is_none()
            && self.exists.is_none()
            && self.r#in.is_none()
            && self.not_in.is_none()
            && self.alternative.as_ref().is_none_or(|alt| alt.is_neutral())
    }
}

impl<T: ToValue> FilterValue<T> {
    /// This group's operators, alternatives excluded, in canonical order.
    fn own_conjunction(&self) -> Conjunction {
        let mut ops = Vec::new();
        if let Some(v) = &self.eq {
            ops.push(Operator::Eq(v.to_value()));
        }
        if let Some(v) = &self.ne {
            ops.push(Operator::Ne(v.to_value()));
        }
        if let Some(p) = &self.pattern {
            ops.push(Operator::Pattern(p.clone()));
        }
        if let Some(v) = &self.gte {
            ops.push(Operator::Range(RangeOp::Gte, v.to_value()));
        }
        if let Some(v) = &self.gt {
            ops.push(Operator::Range(RangeOp::Gt, v.to_value()));
        }
        if let Some(v) = &self.lte {
            ops.push(Operator::Range(RangeOp::Lte, v.to_value()));
        }
        if let Some(v) = &self.lt {
            ops.push(Operator::Range(RangeOp::Lt, v.to_value()));
        }
        if let Some(e) = self.exists {
            ops.push(Operator::Exists(e));
        }
        if let Some(set) = &self.r#in {
            ops.push(Operator::In(set.iter().map(ToValue::to_value).collect()));
        }
        if let Some(set) = &self.not_in {
            ops.push(Operator::NotIn(set.iter().map(ToValue::to_value).collect()));
        }
        Conjunction(ops)
    }
}

/// -----------------------------
/// Backend-agnostic predicate IR
/// -----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gte,
    Gt,
    Lte,
    Lt,
}

impl RangeOp {
    pub fn name(&self) -> &'static str {
        match self {
            RangeOp::Gte => "gte",
            RangeOp::Gt => "gt",
            RangeOp::Lte => "lte",
            RangeOp::Lt => "lt",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Pattern(String),
    Range(RangeOp, Value),
    Exists(bool),
    In(Vec<Value>),
    NotIn(Vec<Value>),
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::Ne(_) => "ne",
            Operator::Pattern(_) => "pattern",
            Operator::Range(op, _) => op.name(),
            Operator::Exists(_) => "exists",
            Operator::In(_) => "in",
            Operator::NotIn(_) => "notIn",
        }
    }
}

/// Operators that must all hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction(pub Vec<Operator>);

impl Conjunction {
    pub fn operators(&self) -> &[Operator] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A field's predicate in disjunctive normal form: the field matches when
/// any group holds. Groups come from the primary operators followed by the
/// alternative chain; groups with no operators are dropped, and no groups
/// at all means no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPredicate {
    pub groups: Vec<Conjunction>,
}

impl FieldPredicate {
    pub fn is_unconstrained(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Object-safe view of a `FilterValue<T>` with `T` erased.
pub trait FieldFilter: Send + Sync {
    fn predicate(&self) -> FieldPredicate;
}

impl<T> FieldFilter for FilterValue<T>
where
    T: ToValue + Send + Sync,
{
    fn predicate(&self) -> FieldPredicate {
        let mut groups = Vec::new();
        let mut current = Some(self);
        while let Some(filter) = current {
            let conjunction = filter.own_conjunction();
            if !conjunction.is_empty() {
                groups.push(conjunction);
            }
            current = filter.alternative.as_deref();
        }
        FieldPredicate { groups }
    }
}
