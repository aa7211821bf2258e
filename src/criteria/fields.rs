use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use once_cell::sync::Lazy;
use tracing::debug;

use super::{Criteria, CriteriaNode};
use crate::{error::Error, filter::FieldFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Filter,
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Criteria type that declares the field. Differs from the enumerated
    /// type for fields reached through an embedded criteria.
    pub declared_in: &'static str,
}

/// What a set field of a criteria object holds.
#[derive(Clone, Copy)]
pub enum FieldNode<'a> {
    Filter(&'a dyn FieldFilter),
    Nested(&'a dyn CriteriaNode),
}

#[derive(Clone, Copy)]
pub struct CriteriaField<'a> {
    pub descriptor: FieldDescriptor,
    pub node: FieldNode<'a>,
}

type Getter<C> = Arc<dyn for<'a> Fn(&'a C) -> Option<FieldNode<'a>> + Send + Sync>;

fn getter<C, F>(f: F) -> Getter<C>
where
    C: 'static,
    F: for<'a> Fn(&'a C) -> Option<FieldNode<'a>> + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Accessor<C> {
    descriptor: FieldDescriptor,
    getter: Getter<C>,
}

/// Field name to getter table for one criteria type, in declaration order.
///
/// Normally generated by `#[derive(Criteria)]`; hand-written impls build it
/// through [`filter`](Self::filter), [`nested`](Self::nested) and
/// [`flatten`](Self::flatten).
pub struct AccessorTable<C> {
    criteria: &'static str,
    accessors: Vec<Accessor<C>>,
    deferred: Option<Error>,
}

impl<C: 'static> AccessorTable<C> {
    pub fn new(criteria: &'static str) -> Self {
        Self {
            criteria,
            accessors: Vec::new(),
            deferred: None,
        }
    }

    pub fn filter<F>(&mut self, name: &'static str, get: F) -> &mut Self
    where
        F: for<'a> Fn(&'a C) -> Option<&'a dyn FieldFilter> + Send + Sync + 'static,
    {
        self.accessors.push(Accessor {
            descriptor: FieldDescriptor {
                name,
                kind: FieldKind::Filter,
                declared_in: self.criteria,
            },
            getter: getter(move |c: &C| get(c).map(FieldNode::Filter)),
        });
        self
    }

    pub fn nested<F>(&mut self, name: &'static str, get: F) -> &mut Self
    where
        F: for<'a> Fn(&'a C) -> Option<&'a dyn CriteriaNode> + Send + Sync + 'static,
    {
        self.accessors.push(Accessor {
            descriptor: FieldDescriptor {
                name,
                kind: FieldKind::Nested,
                declared_in: self.criteria,
            },
            getter: getter(move |c: &C| get(c).map(FieldNode::Nested)),
        });
        self
    }

    /// Splices the fields of an embedded criteria into this table, in place.
    pub fn flatten<B: Criteria>(&mut self, project: fn(&C) -> &B) -> &mut Self {
        let inner = match field_table::<B>() {
            Ok(inner) => inner,
            Err(err) => {
                self.deferred.get_or_insert(err);
                return self;
            }
        };
        for accessor in &inner.accessors {
            let get = Arc::clone(&accessor.getter);
            self.accessors.push(Accessor {
                descriptor: accessor.descriptor,
                getter: getter(move |c: &C| (*get)(project(c))),
            });
        }
        self
    }

    pub fn criteria_name(&self) -> &'static str {
        self.criteria
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        self.accessors.iter().map(|a| a.descriptor).collect()
    }

    /// Fields that hold a value on `criteria`.
    pub fn read<'a>(&self, criteria: &'a C) -> Vec<CriteriaField<'a>> {
        self.accessors
            .iter()
            .filter_map(|a| {
                (*a.getter)(criteria).map(|node| CriteriaField {
                    descriptor: a.descriptor,
                    node,
                })
            })
            .collect()
    }

    fn validate(&self) -> Result<(), Error> {
        if let Some(err) = &self.deferred {
            return Err(err.clone());
        }
        let mut seen = HashSet::new();
        for accessor in &self.accessors {
            let name = accessor.descriptor.name;
            if name.is_empty() || name.contains('.') {
                return Err(Error::InvalidField {
                    criteria: self.criteria,
                    field: name.to_string(),
                    reason: "field names must be non-empty and contain no '.'".to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(Error::InvalidField {
                    criteria: self.criteria,
                    field: name.to_string(),
                    reason: format!(
                        "declared more than once (again in {})",
                        accessor.descriptor.declared_in
                    ),
                });
            }
        }
        Ok(())
    }
}

// ── Process-wide table cache ────────────────────────────────────────────

static TABLES: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Accessor table for `C`, built and validated on first use then shared.
/// Two threads racing on the same type may both build it; the first one
/// stored wins.
pub fn field_table<C: Criteria>() -> Result<Arc<AccessorTable<C>>, Error> {
    let key = TypeId::of::<C>();

    let cached = TABLES
        .read()
        .ok()
        .and_then(|tables| tables.get(&key).cloned());
    if let Some(table) = cached {
        if let Ok(table) = table.downcast::<AccessorTable<C>>() {
            return Ok(table);
        }
    }

    let table = C::accessor_table();
    table.validate()?;
    debug!(
        criteria = C::NAME,
        fields = table.len(),
        "built criteria accessor table"
    );

    let table = Arc::new(table);
    if let Ok(mut tables) = TABLES.write() {
        let stored = tables
            .entry(key)
            .or_insert_with(|| Arc::clone(&table) as Arc<dyn Any + Send + Sync>);
        if let Ok(stored) = Arc::clone(stored).downcast::<AccessorTable<C>>() {
            return Ok(stored);
        }
    }
    Ok(table)
}
