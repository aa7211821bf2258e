pub mod test_postgres;
pub mod test_sqlite;

use krino::{Backend, CompiledQuery, Dialect, Pageable, RelationalQuery};

use crate::fixtures::PersonCriteria;

pub const PEOPLE_TABLE: &str = "people";

pub fn compile_relational(
    dialect: Dialect,
    criteria: &PersonCriteria,
    pageable: Option<&Pageable>,
) -> Result<RelationalQuery, krino::Error> {
    match krino::compile(Some(criteria), pageable, Backend::Relational(dialect))? {
        CompiledQuery::Relational(query) => Ok(query),
        CompiledQuery::Document(_) => panic!("relational backend produced a document query"),
    }
}

/// `SELECT "id" ...` for the criteria, ordered by id.
pub fn select_ids(query: &RelationalQuery) -> krino::SqlFragment {
    let mut fragment = query.where_clause();
    fragment.sql = format!(
        r#"SELECT "id" FROM "{}" {} ORDER BY "id""#,
        PEOPLE_TABLE, fragment.sql
    );
    fragment
}
