pub mod document;
pub mod sql;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::time::Instant;

use metrics::histogram;

use crate::{
    config::{CompilerConfig, Dialect},
    criteria::{CriteriaNode, fields::FieldNode},
    error::Error,
    filter::FieldPredicate,
    query::Pageable,
};

pub use document::{DocumentCompiler, DocumentQuery};
pub use sql::{RelationalCompiler, RelationalQuery, SqlFragment, SqlPredicate};

/// Translates a criteria object into one backend's native query form.
///
/// `None` criteria compiles to the unconstrained query and `None` pageable
/// applies no limit, offset or sort. Compilation either fully succeeds or
/// fails on the first operator the backend cannot express.
pub trait QueryCompiler {
    type Output;

    fn backend(&self) -> &'static str;

    fn compile(
        &self,
        criteria: Option<&dyn CriteriaNode>,
        pageable: Option<&Pageable>,
    ) -> Result<Self::Output, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Document,
    Relational(Dialect),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    Document(DocumentQuery),
    Relational(RelationalQuery),
}

impl CompiledQuery {
    pub fn as_document(&self) -> Option<&DocumentQuery> {
        match self {
            CompiledQuery::Document(q) => Some(q),
            CompiledQuery::Relational(_) => None,
        }
    }

    pub fn as_relational(&self) -> Option<&RelationalQuery> {
        match self {
            CompiledQuery::Relational(q) => Some(q),
            CompiledQuery::Document(_) => None,
        }
    }
}

impl Backend {
    pub fn compile_with(
        &self,
        config: &CompilerConfig,
        criteria: Option<&dyn CriteriaNode>,
        pageable: Option<&Pageable>,
    ) -> Result<CompiledQuery, Error> {
        match self {
            Backend::Document => DocumentCompiler::new(config.clone())
                .compile(criteria, pageable)
                .map(CompiledQuery::Document),
            Backend::Relational(dialect) => RelationalCompiler::new(*dialect)
                .with_config(config.clone())
                .compile(criteria, pageable)
                .map(CompiledQuery::Relational),
        }
    }
}

/// -----------------------------
/// Shared compiler plumbing
/// -----------------------------

/// One constrained filter field, addressed by its path through nested
/// criteria.
pub(crate) struct Leaf {
    pub path: Vec<&'static str>,
    pub predicate: FieldPredicate,
}

impl Leaf {
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

/// Constrained fields of `criteria` in enumeration order, nested criteria
/// flattened in place. Unconstrained filters are skipped.
pub(crate) fn collect_leaves(criteria: &dyn CriteriaNode) -> Result<Vec<Leaf>, Error> {
    let mut leaves = Vec::new();
    let mut path = Vec::new();
    walk(criteria, &mut path, &mut leaves)?;
    Ok(leaves)
}

fn walk(
    node: &dyn CriteriaNode,
    path: &mut Vec<&'static str>,
    leaves: &mut Vec<Leaf>,
) -> Result<(), Error> {
    for field in node.set_fields()? {
        path.push(field.descriptor.name);
        match field.node {
            FieldNode::Filter(filter) => {
                let predicate = filter.predicate();
                if !predicate.is_unconstrained() {
                    leaves.push(Leaf {
                        path: path.clone(),
                        predicate,
                    });
                }
            }
            FieldNode::Nested(sub) => walk(sub, path, leaves)?,
        }
        path.pop();
    }
    Ok(())
}

/// Runs one compilation and records its latency.
pub(crate) fn timed<T>(
    backend: &'static str,
    compile: impl FnOnce() -> Result<T, Error>,
) -> Result<T, Error> {
    let start = Instant::now();
    let result = compile();
    histogram!("krino.compile.duration_ms",
        "backend" => backend
    )
    .record(start.elapsed().as_millis() as f64);
    result
}
