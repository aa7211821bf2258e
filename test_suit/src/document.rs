use std::cmp::Ordering;

use krino::{
    Backend, CompilerConfig, DocumentCompiler, DocumentQuery, FilterValue, Pageable,
    QueryCompiler, Sort,
};
use regex::Regex;
use serde_json::{Value as JsonValue, json};

use crate::fixtures::{Person, PersonCriteria, evaluated_ids, pattern_cases, people, portable_cases};

/// Just enough of the MongoDB find semantics to run compiled filters
/// against plain JSON documents.
fn doc_matches(filter: &JsonValue, doc: &JsonValue) -> bool {
    let Some(filter) = filter.as_object() else {
        panic!("filter must be a document, got {}", filter);
    };
    filter.iter().all(|(key, cond)| match key.as_str() {
        "$and" => clauses(cond).iter().all(|c| doc_matches(c, doc)),
        "$or" => clauses(cond).iter().any(|c| doc_matches(c, doc)),
        path => field_matches(lookup(doc, path), cond),
    })
}

fn clauses(cond: &JsonValue) -> &Vec<JsonValue> {
    match cond.as_array() {
        Some(clauses) => clauses,
        None => panic!("logical operator expects an array, got {}", cond),
    }
}

/// Dotted lookup; a missing or null step yields null.
fn lookup<'a>(doc: &'a JsonValue, path: &str) -> &'a JsonValue {
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
        .unwrap_or(&JsonValue::Null)
}

fn field_matches(value: &JsonValue, cond: &JsonValue) -> bool {
    let Some(ops) = cond.as_object().filter(|o| o.keys().all(|k| k.starts_with('$'))) else {
        return equals(value, cond);
    };
    ops.iter().all(|(op, arg)| match op.as_str() {
        "$eq" => equals(value, arg),
        "$ne" => !equals(value, arg),
        "$in" => clauses(arg).iter().any(|a| equals(value, a)),
        "$nin" => !clauses(arg).iter().any(|a| equals(value, a)),
        "$gt" => compare(value, arg) == Some(Ordering::Greater),
        "$gte" => matches!(
            compare(value, arg),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "$lt" => compare(value, arg) == Some(Ordering::Less),
        "$lte" => matches!(compare(value, arg), Some(Ordering::Less | Ordering::Equal)),
        "$regex" => match (value.as_str(), arg.as_str()) {
            (Some(s), Some(pattern)) => Regex::new(pattern).unwrap().is_match(s),
            _ => false,
        },
        other => panic!("unsupported operator {}", other),
    })
}

fn equals(a: &JsonValue, b: &JsonValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering within one type bracket; `None` across brackets or with null.
fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            let (x, y) = (x.get("$date")?.as_str()?, y.get("$date")?.as_str()?);
            Some(x.cmp(y))
        }
        _ => None,
    }
}

fn compile_document(criteria: &PersonCriteria, pageable: Option<&Pageable>) -> DocumentQuery {
    let compiled = krino::compile(Some(criteria), pageable, Backend::Document).unwrap();
    match compiled.as_document() {
        Some(query) => query.clone(),
        None => panic!("document backend produced a relational query"),
    }
}

fn found_ids(query: &DocumentQuery, people: &[Person]) -> Vec<i64> {
    people
        .iter()
        .filter(|p| doc_matches(&query.filter, &p.to_document()))
        .map(|p| p.id)
        .collect()
}

#[test]
fn test_interpreter_null_semantics() {
    let doc = json!({"a": 1, "b": null, "nested": {"c": "x"}});
    assert!(doc_matches(&json!({"b": {"$eq": null}}), &doc));
    assert!(doc_matches(&json!({"missing": {"$eq": null}}), &doc));
    assert!(doc_matches(&json!({"nested.c": {"$ne": null}}), &doc));
    assert!(!doc_matches(&json!({"b": {"$nin": [2, null]}}), &doc));
    assert!(doc_matches(&json!({"a": {"$nin": [2, null]}}), &doc));
    assert!(!doc_matches(&json!({"b": {"$gte": 0}}), &doc));
    assert!(!doc_matches(&json!({"a": {"$in": []}}), &doc));
}

#[test]
fn test_document_matches_evaluator() {
    let people = people();
    for (label, criteria) in portable_cases().into_iter().chain(pattern_cases()) {
        let query = compile_document(&criteria, None);
        assert_eq!(
            found_ids(&query, &people),
            evaluated_ids(&criteria, &people),
            "case `{}` diverged, filter {}",
            label,
            query.filter
        );
    }
}

#[test]
fn test_document_nested_period() {
    let people = people();
    let criteria = PersonCriteria {
        valid_for: Some(krino::TimePeriodFilters::active_at(crate::fixtures::ts(
            "2023-06-01T00:00:00Z",
        ))),
        ..Default::default()
    };
    let query = compile_document(&criteria, None);
    assert!(query.filter.to_string().contains("valid_for.start_date"));
    assert_eq!(found_ids(&query, &people), vec![2]);
}

#[test]
fn test_document_paging_and_projection() {
    let mut criteria = PersonCriteria {
        name: Some(FilterValue::ne("Bob")),
        ..Default::default()
    };
    criteria.base = criteria.base.with_includes(["name", "age"]);
    let pageable = Pageable::of(2, 10).sorted(Sort::desc("age"));

    let query = compile_document(&criteria, Some(&pageable));
    assert_eq!(query.projection, Some(json!({"age": 1, "name": 1})));
    assert_eq!(query.sort_document(), Some(json!({"age": -1})));
    assert_eq!(query.skip, Some(20));
    assert_eq!(query.limit, Some(10));
}

#[test]
fn test_document_compiler_is_deterministic() {
    let compiler = DocumentCompiler::new(CompilerConfig::default());
    for (label, criteria) in portable_cases() {
        let first = compiler.compile(Some(&criteria), None).unwrap();
        let second = compiler.compile(Some(&criteria), None).unwrap();
        assert_eq!(first, second, "case `{}`", label);
    }
}
