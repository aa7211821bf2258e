//! Typed criteria objects, evaluated in memory or compiled to document-store
//! and SQL predicates with the same meaning on every path.
//!
//! ```ignore
//! #[derive(Criteria, Default)]
//! struct PersonCriteria {
//!     #[criteria(flatten)]
//!     base: BaseCriteria<i64>,
//!     name: Option<FilterValue<String>>,
//!     age: Option<FilterValue<i64>>,
//! }
//!
//! let criteria = PersonCriteria {
//!     age: Some(FilterValue::gte(18).and_lt(65)),
//!     ..Default::default()
//! };
//! let query = krino::compile(Some(&criteria), None, Backend::Relational(Dialect::Postgres))?;
//! ```

extern crate self as krino;

pub mod adapters;
pub mod config;
pub mod criteria;
pub mod error;
pub mod eval;
pub mod filter;
pub mod query;
pub mod record;

pub use crate::adapters::{
    Backend, CompiledQuery, DocumentCompiler, DocumentQuery, QueryCompiler, RelationalCompiler,
    RelationalQuery, SqlFragment, SqlPredicate,
};
pub use crate::config::{CompilerConfig, Dialect, FieldNaming};
pub use crate::criteria::{
    BaseCriteria, ChildCriteria, Criteria, CriteriaNode,
    fields::{AccessorTable, FieldDescriptor, FieldKind},
    period::{TimePeriod, TimePeriodFilters},
    prepare,
};
pub use crate::error::Error;
pub use crate::eval::{Evaluator, Matcher};
pub use crate::filter::{FieldFilter, FilterValue};
pub use crate::query::{Direction, Pageable, Projection, Sort, ToValue, Value};
pub use crate::record::{FieldRef, Record};

#[cfg(feature = "derive")]
pub use krino_derive::*;

/// Compiles `criteria` for `backend` with the default [`CompilerConfig`].
pub fn compile(
    criteria: Option<&dyn CriteriaNode>,
    pageable: Option<&Pageable>,
    backend: Backend,
) -> Result<CompiledQuery, Error> {
    backend.compile_with(&CompilerConfig::default(), criteria, pageable)
}

/// Matches `candidate` against `criteria`; errors count as a non-match.
pub fn evaluate(criteria: &dyn CriteriaNode, candidate: Option<&dyn Record>) -> bool {
    Evaluator::default().matches(criteria, candidate)
}

/// Declared fields of `C`, embedded criteria flattened in place.
pub fn enumerate_fields<C: Criteria>() -> Result<Vec<FieldDescriptor>, Error> {
    Ok(criteria::fields::field_table::<C>()?.descriptors())
}
