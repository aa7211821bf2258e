use regex::Regex;
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use super::{Leaf, QueryCompiler, collect_leaves, timed};
use crate::{
    config::CompilerConfig,
    criteria::CriteriaNode,
    error::Error,
    filter::{Conjunction, Operator, RangeOp},
    query::{Direction, Pageable, Projection, Value},
};

/// Find request for a document store, in MongoDB query language.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filter: JsonValue,
    /// `{field: 1, ...}` when the result is narrowed, `None` for all fields.
    pub projection: Option<JsonValue>,
    pub sort: Vec<(String, i32)>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl DocumentQuery {
    /// Sort specification document, `None` when unsorted.
    pub fn sort_document(&self) -> Option<JsonValue> {
        if self.sort.is_empty() {
            return None;
        }
        let mut doc = Map::new();
        for (field, order) in &self.sort {
            doc.insert(field.clone(), json!(order));
        }
        Some(JsonValue::Object(doc))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentCompiler {
    config: CompilerConfig,
}

impl DocumentCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }
}

impl QueryCompiler for DocumentCompiler {
    type Output = DocumentQuery;

    fn backend(&self) -> &'static str {
        "document"
    }

    fn compile(
        &self,
        criteria: Option<&dyn CriteriaNode>,
        pageable: Option<&Pageable>,
    ) -> Result<DocumentQuery, Error> {
        timed(self.backend(), || {
            let mut query = DocumentQuery {
                filter: JsonValue::Object(Map::new()),
                ..Default::default()
            };

            if let Some(criteria) = criteria {
                let leaves = collect_leaves(criteria)?;
                let clauses = leaves
                    .iter()
                    .map(|leaf| self.leaf_clause(leaf))
                    .collect::<Result<Vec<_>, _>>()?;
                query.filter = and_documents(clauses);
                query.projection = self.projection(&criteria.projection());
                debug!(
                    criteria = criteria.criteria_name(),
                    backend = self.backend(),
                    leaves = leaves.len(),
                    "compiled criteria"
                );
            }

            if let Some(pageable) = pageable {
                query.sort = pageable
                    .sort
                    .iter()
                    .map(|s| {
                        let order = match s.direction {
                            Direction::Asc => 1,
                            Direction::Desc => -1,
                        };
                        (self.config.naming.apply_path(&s.field), order)
                    })
                    .collect();
                query.skip = pageable.offset();
                query.limit = pageable.limit();
            }

            Ok(query)
        })
    }
}

impl DocumentCompiler {
    fn leaf_clause(&self, leaf: &Leaf) -> Result<Map<String, JsonValue>, Error> {
        let path = self.config.document_path(&leaf.path);
        let mut groups = leaf
            .predicate
            .groups
            .iter()
            .map(|group| group_clause(&path, group, leaf))
            .collect::<Result<Vec<_>, _>>()?;

        if groups.len() == 1 {
            return Ok(groups.remove(0));
        }
        let mut clause = Map::new();
        clause.insert(
            "$or".to_string(),
            JsonValue::Array(groups.into_iter().map(JsonValue::Object).collect()),
        );
        Ok(clause)
    }

    fn projection(&self, projection: &Projection) -> Option<JsonValue> {
        let fields = projection.fields()?;
        let mut doc = Map::new();
        for field in fields {
            doc.insert(self.config.naming.apply_path(field), json!(1));
        }
        Some(JsonValue::Object(doc))
    }
}

/// `{path: {$op: v, ...}}` when the operators use distinct keys, otherwise
/// one `$and` entry per operator.
fn group_clause(
    path: &str,
    group: &Conjunction,
    leaf: &Leaf,
) -> Result<Map<String, JsonValue>, Error> {
    let ops = group
        .operators()
        .iter()
        .map(|op| operator_entry(op, leaf))
        .collect::<Result<Vec<_>, _>>()?;

    let mut merged = Map::new();
    let mut collides = false;
    for (key, value) in &ops {
        if merged.insert(key.to_string(), value.clone()).is_some() {
            collides = true;
        }
    }

    if !collides {
        let mut clause = Map::new();
        clause.insert(path.to_string(), JsonValue::Object(merged));
        return Ok(clause);
    }

    let parts = ops
        .into_iter()
        .map(|(key, value)| {
            let mut condition = Map::new();
            condition.insert(key.to_string(), value);
            let mut clause = Map::new();
            clause.insert(path.to_string(), JsonValue::Object(condition));
            clause
        })
        .collect();
    Ok(and_clauses(parts))
}

fn operator_entry(op: &Operator, leaf: &Leaf) -> Result<(&'static str, JsonValue), Error> {
    let entry = match op {
        Operator::Eq(v) => ("$eq", document_value(v)),
        // null is never "not equal" on the other paths either
        Operator::Ne(v) => ("$nin", json!([document_value(v), null])),
        Operator::Pattern(pattern) => {
            Regex::new(pattern).map_err(|e| Error::InvalidPattern {
                field: leaf.dotted(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            ("$regex", json!(pattern))
        }
        Operator::Range(range, v) => {
            let key = match range {
                RangeOp::Gte => "$gte",
                RangeOp::Gt => "$gt",
                RangeOp::Lte => "$lte",
                RangeOp::Lt => "$lt",
            };
            (key, document_value(v))
        }
        Operator::Exists(true) => ("$ne", JsonValue::Null),
        Operator::Exists(false) => ("$eq", JsonValue::Null),
        Operator::In(set) => ("$in", set.iter().map(document_value).collect()),
        Operator::NotIn(set) => {
            let mut values: Vec<JsonValue> = set.iter().map(document_value).collect();
            values.push(JsonValue::Null);
            ("$nin", JsonValue::Array(values))
        }
    };
    Ok(entry)
}

/// Extended JSON encoding of a scalar.
pub fn document_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Uuid(u) => json!(u.to_string()),
        Value::Timestamp(t) => json!({ "$date": t.to_rfc3339() }),
        Value::String(s) => json!(s),
    }
}

fn and_clauses(mut clauses: Vec<Map<String, JsonValue>>) -> Map<String, JsonValue> {
    if clauses.len() == 1 {
        return clauses.remove(0);
    }
    let mut doc = Map::new();
    doc.insert(
        "$and".to_string(),
        JsonValue::Array(clauses.into_iter().map(JsonValue::Object).collect()),
    );
    doc
}

/// Merges field clauses into one filter document, falling back to `$and`
/// when two clauses share a key.
fn and_documents(clauses: Vec<Map<String, JsonValue>>) -> JsonValue {
    let mut merged = Map::new();
    for clause in &clauses {
        for (key, value) in clause {
            if merged.contains_key(key) {
                return JsonValue::Object(and_clauses(clauses));
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    JsonValue::Object(merged)
}
