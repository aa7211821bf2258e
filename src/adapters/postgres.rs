use sqlx::{
    Postgres,
    postgres::PgArguments,
    query::Query as PgQuery,
};

use crate::{adapters::SqlFragment, query::Value};

/// Binds compiled parameters onto a PostgreSQL query, in placeholder order.
pub fn bind_params<'a>(
    mut query: PgQuery<'a, Postgres, PgArguments>,
    params: &'a [Value],
) -> PgQuery<'a, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Uuid(uid) => query.bind(*uid),
            Value::Timestamp(t) => query.bind(*t),
            Value::String(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Ready-to-execute query for a rendered fragment.
pub fn query(fragment: &SqlFragment) -> PgQuery<'_, Postgres, PgArguments> {
    bind_params(sqlx::query(&fragment.sql), &fragment.params)
}
