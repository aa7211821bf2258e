use regex::Regex;
use tracing::debug;

use super::{Leaf, QueryCompiler, collect_leaves, timed};
use crate::{
    config::{CompilerConfig, Dialect},
    criteria::CriteriaNode,
    error::Error,
    filter::{Conjunction, Operator, RangeOp},
    query::{Direction, Pageable, Value},
};

/// Relational predicate tree. Values stay out of the SQL text until
/// rendering turns them into positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlPredicate {
    True,
    False,
    IsNull(String),
    IsNotNull(String),
    Compare {
        column: String,
        op: &'static str,
        value: Value,
    },
    /// PostgreSQL POSIX regex match on the text form of the column.
    Matches { column: String, pattern: String },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    And(Vec<SqlPredicate>),
    Or(Vec<SqlPredicate>),
}

impl SqlPredicate {
    /// Conjunction, dropping `True` terms and splicing nested conjunctions.
    pub fn and(terms: Vec<SqlPredicate>) -> SqlPredicate {
        let mut terms: Vec<_> = terms
            .into_iter()
            .flat_map(|t| match t {
                SqlPredicate::And(inner) => inner,
                other => vec![other],
            })
            .filter(|t| *t != SqlPredicate::True)
            .collect();
        match terms.len() {
            0 => SqlPredicate::True,
            1 => terms.remove(0),
            _ => SqlPredicate::And(terms),
        }
    }

    /// Disjunction, dropping `False` terms and splicing nested disjunctions.
    pub fn or(terms: Vec<SqlPredicate>) -> SqlPredicate {
        let mut terms: Vec<_> = terms
            .into_iter()
            .flat_map(|t| match t {
                SqlPredicate::Or(inner) => inner,
                other => vec![other],
            })
            .filter(|t| *t != SqlPredicate::False)
            .collect();
        match terms.len() {
            0 => SqlPredicate::False,
            1 => terms.remove(0),
            _ => SqlPredicate::Or(terms),
        }
    }
}

/// Rendered SQL plus the values for its placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationalQuery {
    pub dialect: Dialect,
    pub predicate: SqlPredicate,
    /// Selected columns, `None` for `*`.
    pub columns: Option<Vec<String>>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RelationalQuery {
    /// The boolean condition alone, without the `WHERE` keyword.
    pub fn condition(&self) -> SqlFragment {
        let mut writer = SqlWriter::new(self.dialect);
        writer.predicate(&self.predicate, false);
        writer.finish()
    }

    /// `WHERE ...`, or an empty fragment when nothing is constrained.
    pub fn where_clause(&self) -> SqlFragment {
        if self.predicate == SqlPredicate::True {
            return SqlFragment::default();
        }
        let mut writer = SqlWriter::new(self.dialect);
        writer.push("WHERE ");
        writer.predicate(&self.predicate, false);
        writer.finish()
    }

    /// Complete `SELECT` over `table` with projection, ordering and paging.
    pub fn select(&self, table: &str) -> SqlFragment {
        let mut writer = SqlWriter::new(self.dialect);
        writer.push("SELECT ");
        match &self.columns {
            Some(columns) => {
                let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
                writer.push(&columns.join(", "));
            }
            None => writer.push("*"),
        }
        writer.push(" FROM ");
        writer.push(&quote_ident(table));

        if self.predicate != SqlPredicate::True {
            writer.push(" WHERE ");
            writer.predicate(&self.predicate, false);
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| {
                    let direction = match direction {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", quote_ident(column), direction)
                })
                .collect();
            writer.push(" ORDER BY ");
            writer.push(&order.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                writer.push(" LIMIT ");
                writer.param(count_value(limit));
            }
            // sqlite only accepts OFFSET after a LIMIT
            (None, Some(_)) if self.dialect == Dialect::Sqlite => writer.push(" LIMIT -1"),
            (None, _) => {}
        }
        if let Some(offset) = self.offset {
            writer.push(" OFFSET ");
            writer.param(count_value(offset));
        }

        writer.finish()
    }
}

fn count_value(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Double-quoted identifier with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

struct SqlWriter {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn param(&mut self, value: Value) {
        self.params.push(value);
        match self.dialect {
            Dialect::Postgres => {
                let placeholder = format!("${}", self.params.len());
                self.sql.push_str(&placeholder);
            }
            Dialect::Sqlite => self.sql.push('?'),
        }
    }

    fn predicate(&mut self, predicate: &SqlPredicate, nested: bool) {
        match predicate {
            SqlPredicate::True => self.push("1 = 1"),
            SqlPredicate::False => self.push("1 = 0"),
            SqlPredicate::IsNull(column) => {
                self.push(&quote_ident(column));
                self.push(" IS NULL");
            }
            SqlPredicate::IsNotNull(column) => {
                self.push(&quote_ident(column));
                self.push(" IS NOT NULL");
            }
            SqlPredicate::Compare { column, op, value } => {
                self.push(&quote_ident(column));
                self.push(" ");
                self.push(op);
                self.push(" ");
                self.param(value.clone());
            }
            SqlPredicate::Matches { column, pattern } => {
                self.push("CAST(");
                self.push(&quote_ident(column));
                self.push(" AS TEXT) ~ ");
                self.param(Value::String(pattern.clone()));
            }
            SqlPredicate::In {
                column,
                values,
                negated,
            } => {
                self.push(&quote_ident(column));
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.param(value.clone());
                }
                self.push(")");
            }
            SqlPredicate::And(terms) => self.join(terms, " AND ", nested),
            SqlPredicate::Or(terms) => self.join(terms, " OR ", true),
        }
    }

    fn join(&mut self, terms: &[SqlPredicate], separator: &str, parenthesize: bool) {
        if parenthesize {
            self.push("(");
        }
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            self.predicate(term, true);
        }
        if parenthesize {
            self.push(")");
        }
    }

    fn finish(self) -> SqlFragment {
        SqlFragment {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// -----------------------------
/// Compiler
/// -----------------------------

#[derive(Debug, Clone)]
pub struct RelationalCompiler {
    dialect: Dialect,
    config: CompilerConfig,
}

impl RelationalCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            config: CompilerConfig::default(),
        }
    }

    pub fn with_config(self, config: CompilerConfig) -> Self {
        let mut consumed_self = self;
        consumed_self.config = config;
        consumed_self
    }

    fn leaf_predicate(&self, leaf: &Leaf) -> Result<SqlPredicate, Error> {
        let column = self.config.column_name(&leaf.path);
        let groups = leaf
            .predicate
            .groups
            .iter()
            .map(|group| self.group_predicate(&column, group, leaf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SqlPredicate::or(groups))
    }

    fn group_predicate(
        &self,
        column: &str,
        group: &Conjunction,
        leaf: &Leaf,
    ) -> Result<SqlPredicate, Error> {
        let terms = group
            .operators()
            .iter()
            .map(|op| self.operator_predicate(column, op, leaf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SqlPredicate::and(terms))
    }

    fn operator_predicate(
        &self,
        column: &str,
        op: &Operator,
        leaf: &Leaf,
    ) -> Result<SqlPredicate, Error> {
        let compare = |op: &'static str, value: &Value| SqlPredicate::Compare {
            column: column.to_string(),
            op,
            value: value.clone(),
        };

        let predicate = match op {
            Operator::Eq(v) => compare("=", v),
            Operator::Ne(v) => compare("<>", v),
            Operator::Pattern(pattern) => {
                if self.dialect == Dialect::Sqlite {
                    return Err(Error::UnsupportedOperator {
                        field: leaf.dotted(),
                        operator: op.name(),
                        backend: self.dialect.name(),
                    });
                }
                Regex::new(pattern).map_err(|e| Error::InvalidPattern {
                    field: leaf.dotted(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                SqlPredicate::Matches {
                    column: column.to_string(),
                    pattern: pattern.clone(),
                }
            }
            Operator::Range(range, v) => {
                let op = match range {
                    RangeOp::Gte => ">=",
                    RangeOp::Gt => ">",
                    RangeOp::Lte => "<=",
                    RangeOp::Lt => "<",
                };
                compare(op, v)
            }
            Operator::Exists(true) => SqlPredicate::IsNotNull(column.to_string()),
            Operator::Exists(false) => SqlPredicate::IsNull(column.to_string()),
            Operator::In(values) if values.is_empty() => SqlPredicate::False,
            Operator::In(values) => SqlPredicate::In {
                column: column.to_string(),
                values: values.clone(),
                negated: false,
            },
            // NOT IN over an empty list still excludes NULL, as a non-empty one does
            Operator::NotIn(values) if values.is_empty() => {
                SqlPredicate::IsNotNull(column.to_string())
            }
            Operator::NotIn(values) => SqlPredicate::In {
                column: column.to_string(),
                values: values.clone(),
                negated: true,
            },
        };
        Ok(predicate)
    }
}

impl QueryCompiler for RelationalCompiler {
    type Output = RelationalQuery;

    fn backend(&self) -> &'static str {
        self.dialect.name()
    }

    fn compile(
        &self,
        criteria: Option<&dyn CriteriaNode>,
        pageable: Option<&Pageable>,
    ) -> Result<RelationalQuery, Error> {
        timed(self.backend(), || {
            let mut query = RelationalQuery {
                dialect: self.dialect,
                predicate: SqlPredicate::True,
                columns: None,
                order_by: Vec::new(),
                limit: None,
                offset: None,
            };

            if let Some(criteria) = criteria {
                let leaves = collect_leaves(criteria)?;
                let terms = leaves
                    .iter()
                    .map(|leaf| self.leaf_predicate(leaf))
                    .collect::<Result<Vec<_>, _>>()?;
                query.predicate = SqlPredicate::and(terms);
                query.columns = criteria.projection().fields().map(|fields| {
                    fields
                        .iter()
                        .map(|f| self.config.column_for_dotted(f))
                        .collect()
                });
                debug!(
                    criteria = criteria.criteria_name(),
                    backend = self.backend(),
                    leaves = leaves.len(),
                    "compiled criteria"
                );
            }

            if let Some(pageable) = pageable {
                query.order_by = pageable
                    .sort
                    .iter()
                    .map(|s| (self.config.column_for_dotted(&s.field), s.direction))
                    .collect();
                query.limit = pageable.limit();
                query.offset = pageable.offset();
            }

            Ok(query)
        })
    }
}
