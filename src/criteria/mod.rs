pub mod fields;
pub mod period;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    filter::{FieldFilter, FilterValue},
    query::{Projection, ToValue},
};
use fields::{AccessorTable, CriteriaField, field_table};

/// A criteria object: named per-field predicates plus projection settings.
///
/// Implemented by `#[derive(Criteria)]` or by hand. Embedded shapes such as
/// [`BaseCriteria`] are registered with [`AccessorTable::flatten`] and their
/// fields are enumerated as if declared on the embedding type.
pub trait Criteria: Send + Sync + 'static {
    const NAME: &'static str;

    fn accessor_table() -> AccessorTable<Self>
    where
        Self: Sized;

    fn includes(&self) -> Option<&BTreeSet<String>> {
        None
    }

    fn includes_limitation(&self) -> Option<&BTreeSet<String>> {
        None
    }

    /// Normalization hook, run by [`prepare`].
    fn init(&mut self) {}

    /// Domain-level rejection hook, run by [`prepare`] after `init`.
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Object-safe face of a criteria object, used by the evaluator, the
/// compilers and nested criteria fields.
pub trait CriteriaNode: Send + Sync {
    fn criteria_name(&self) -> &'static str;

    /// Fields that currently hold a filter or a nested criteria.
    fn set_fields(&self) -> Result<Vec<CriteriaField<'_>>, Error>;

    fn projection(&self) -> Projection;
}

impl<C: Criteria> CriteriaNode for C {
    fn criteria_name(&self) -> &'static str {
        C::NAME
    }

    fn set_fields(&self) -> Result<Vec<CriteriaField<'_>>, Error> {
        Ok(field_table::<C>()?.read(self))
    }

    fn projection(&self) -> Projection {
        Projection::resolve(self.includes(), self.includes_limitation())
    }
}

/// Runs the `init` then `validate` hooks.
pub fn prepare<C: Criteria>(criteria: &mut C) -> Result<(), Error> {
    criteria.init();
    criteria.validate()
}

/// -----------------------------
/// Base identity criteria
/// -----------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCriteria<ID> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FilterValue<ID>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes_limitation: Option<BTreeSet<String>>,
}

impl<ID> Default for BaseCriteria<ID> {
    fn default() -> Self {
        Self {
            id: None,
            includes: None,
            includes_limitation: None,
        }
    }
}

impl<ID: PartialEq> BaseCriteria<ID> {
    pub fn by_id(id: impl Into<ID>) -> Self {
        Self {
            id: Some(FilterValue::eq(id)),
            ..Self::default()
        }
    }

    pub fn by_ids<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ID>,
    {
        Self {
            id: Some(FilterValue::is_in(ids)),
            ..Self::default()
        }
    }
}

impl<ID> BaseCriteria<ID> {
    pub fn with_includes<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut consumed_self = self;
        consumed_self.includes = Some(fields.into_iter().map(Into::into).collect());
        consumed_self
    }

    pub fn with_includes_limitation<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut consumed_self = self;
        consumed_self.includes_limitation = Some(fields.into_iter().map(Into::into).collect());
        consumed_self
    }
}

impl<ID> Criteria for BaseCriteria<ID>
where
    ID: ToValue + Send + Sync + 'static,
{
    const NAME: &'static str = "BaseCriteria";

    fn accessor_table() -> AccessorTable<Self> {
        let mut table = AccessorTable::new(Self::NAME);
        table.filter("id", |c: &Self| c.id.as_ref().map(|f| f as &dyn FieldFilter));
        table
    }

    fn includes(&self) -> Option<&BTreeSet<String>> {
        self.includes.as_ref()
    }

    fn includes_limitation(&self) -> Option<&BTreeSet<String>> {
        self.includes_limitation.as_ref()
    }
}

/// Criteria for records owned by a parent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildCriteria<ID> {
    #[serde(flatten)]
    pub base: BaseCriteria<ID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FilterValue<ID>>,
}

impl<ID> Default for ChildCriteria<ID> {
    fn default() -> Self {
        Self {
            base: BaseCriteria::default(),
            parent_id: None,
        }
    }
}

impl<ID: PartialEq> ChildCriteria<ID> {
    pub fn by_parent_id(parent_id: impl Into<ID>) -> Self {
        Self {
            parent_id: Some(FilterValue::eq(parent_id)),
            ..Self::default()
        }
    }
}

impl<ID> Criteria for ChildCriteria<ID>
where
    ID: ToValue + Send + Sync + 'static,
{
    const NAME: &'static str = "ChildCriteria";

    fn accessor_table() -> AccessorTable<Self> {
        let mut table = AccessorTable::new(Self::NAME);
        table
            .flatten::<BaseCriteria<ID>>(|c: &Self| &c.base)
            .filter("parent_id", |c: &Self| {
                c.parent_id.as_ref().map(|f| f as &dyn FieldFilter)
            });
        table
    }

    fn includes(&self) -> Option<&BTreeSet<String>> {
        self.base.includes()
    }

    fn includes_limitation(&self) -> Option<&BTreeSet<String>> {
        self.base.includes_limitation()
    }
}
