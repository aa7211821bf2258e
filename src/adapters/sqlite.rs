use sqlx::{
    Sqlite,
    query::Query as SqlxQuery,
    sqlite::SqliteArguments,
};

use crate::{adapters::SqlFragment, query::Value};

/// Binds compiled parameters onto a SQLite query, in placeholder order.
/// Timestamps are bound as RFC 3339 text.
pub fn bind_params<'a>(
    mut query: SqlxQuery<'a, Sqlite, SqliteArguments<'a>>,
    params: &'a [Value],
) -> SqlxQuery<'a, Sqlite, SqliteArguments<'a>> {
    for param in params {
        query = match param {
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Uuid(uid) => query.bind(*uid),
            Value::Timestamp(t) => query.bind(t.to_rfc3339()),
            Value::String(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Ready-to-execute query for a rendered fragment.
pub fn query(fragment: &SqlFragment) -> SqlxQuery<'_, Sqlite, SqliteArguments<'_>> {
    bind_params(sqlx::query(&fragment.sql), &fragment.params)
}
