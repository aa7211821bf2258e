use krino::{Dialect, Error, Pageable, Sort, adapters::sqlite};
use sqlx::{
    Row, SqlitePool,
    sqlite::SqlitePoolOptions,
};

use super::*;
use crate::fixtures::{Person, evaluated_ids, pattern_cases, people, portable_cases};

async fn setup_db(people: &[Person]) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            name TEXT,
            age INTEGER,
            status TEXT,
            email TEXT,
            score REAL,
            valid_for_start_date TEXT,
            valid_for_end_date TEXT
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    // timestamps stored the way the sqlite binder encodes them
    for person in people {
        let period = person.valid_for.unwrap_or_default();
        sqlx::query("INSERT INTO people VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(person.id)
            .bind(&person.name)
            .bind(person.age)
            .bind(&person.status)
            .bind(&person.email)
            .bind(person.score)
            .bind(period.start_date.map(|t| t.to_rfc3339()))
            .bind(period.end_date.map(|t| t.to_rfc3339()))
            .execute(&pool)
            .await
            .unwrap();
    }

    pool
}

async fn fetch_ids(pool: &SqlitePool, fragment: &krino::SqlFragment) -> Vec<i64> {
    let rows = match sqlite::query(fragment).fetch_all(pool).await {
        Ok(rows) => rows,
        Err(err) => panic!("query {} failed: {:#?}", fragment.sql, err),
    };
    rows.iter().map(|row| row.get::<i64, _>("id")).collect()
}

#[tokio::test]
async fn test_sqlite_matches_evaluator() {
    let people = people();
    let pool = setup_db(&people).await;

    for (label, criteria) in portable_cases() {
        let query = compile_relational(Dialect::Sqlite, &criteria, None).unwrap();
        let sql_ids = fetch_ids(&pool, &select_ids(&query)).await;
        let expected = evaluated_ids(&criteria, &people);
        assert_eq!(sql_ids, expected, "case `{}` diverged", label);
    }
}

#[tokio::test]
async fn test_sqlite_concrete_scenarios() {
    let people = people();
    let pool = setup_db(&people).await;
    let cases = portable_cases();
    let find = |label: &str| {
        cases
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| c.clone())
            .unwrap()
    };

    let pool = &pool;
    let ids = |criteria: PersonCriteria| async move {
        let query = compile_relational(Dialect::Sqlite, &criteria, None).unwrap();
        fetch_ids(pool, &select_ids(&query)).await
    };

    assert_eq!(ids(find("empty")).await, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ids(find("name eq")).await, vec![1]);
    assert_eq!(ids(find("age range")).await, vec![1, 5, 6]);
    assert_eq!(ids(find("status in")).await, vec![1, 2, 5, 6]);
    assert_eq!(ids(find("email absent")).await, vec![2, 5]);
    assert_eq!(ids(find("status ne")).await, vec![1, 2, 5, 6]);
    assert_eq!(ids(find("age alternative")).await, vec![1, 4]);
    assert_eq!(ids(find("active period")).await, vec![1]);
    assert_eq!(ids(find("period end absent")).await, vec![1, 3, 4, 5, 6]);
    assert_eq!(ids(find("empty in")).await, Vec::<i64>::new());
    assert_eq!(ids(find("empty not in")).await, vec![1, 2, 3, 5, 6]);
    assert_eq!(ids(find("contradiction")).await, Vec::<i64>::new());
}

#[tokio::test]
async fn test_sqlite_rejects_pattern() {
    for (label, criteria) in pattern_cases() {
        match compile_relational(Dialect::Sqlite, &criteria, None) {
            Err(Error::UnsupportedOperator {
                operator, backend, ..
            }) => {
                assert_eq!(operator, "pattern", "case `{}`", label);
                assert_eq!(backend, "sqlite");
            }
            other => panic!("case `{}` should be unsupported, got {:?}", label, other),
        }
    }
}

#[tokio::test]
async fn test_sqlite_paging() {
    let people = people();
    let pool = setup_db(&people).await;

    let criteria = PersonCriteria {
        status: Some(krino::FilterValue::exists(true)),
        ..Default::default()
    };
    let pageable = Pageable::of(1, 2).sorted(Sort::desc("age"));
    let query = compile_relational(Dialect::Sqlite, &criteria, Some(&pageable)).unwrap();
    let fragment = query.select(PEOPLE_TABLE);

    let rows = sqlite::query(&fragment).fetch_all(&pool).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|row| row.get::<i64, _>("id")).collect();
    // ages: 3 -> 65, 6 -> 42, 1 -> 30, 5 -> 18, 2 -> 17
    assert_eq!(ids, vec![1, 5]);
}
