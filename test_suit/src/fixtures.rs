use chrono::{DateTime, Utc};
use krino::{
    BaseCriteria, Criteria, FilterValue, Record, TimePeriod, TimePeriodFilters,
    adapters::document::document_value,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Example: criteria over people, with the identity criteria embedded
#[derive(Criteria, Default, Debug, Clone, Serialize, Deserialize)]
#[criteria(init = "Self::normalize")]
#[serde(rename_all = "camelCase")]
pub struct PersonCriteria {
    #[criteria(flatten)]
    #[serde(flatten)]
    pub base: BaseCriteria<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FilterValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<FilterValue<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FilterValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<FilterValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<FilterValue<f64>>,

    #[criteria(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_for: Option<TimePeriodFilters>,
}

impl PersonCriteria {
    /// Statuses are stored upper case.
    fn normalize(&mut self) {
        if let Some(status) = self.status.as_mut() {
            if let Some(eq) = status.eq.as_mut() {
                *eq = eq.to_uppercase();
            }
        }
    }
}

#[derive(Record, Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub score: Option<f64>,
    #[record(nested)]
    pub valid_for: Option<TimePeriod>,
}

impl Person {
    /// The person as stored in a document collection.
    pub fn to_document(&self) -> JsonValue {
        let date = |t: Option<DateTime<Utc>>| t.map(|t| document_value(&krino::Value::Timestamp(t)));
        json!({
            "id": self.id,
            "name": self.name,
            "age": self.age,
            "status": self.status,
            "email": self.email,
            "score": self.score,
            "valid_for": self.valid_for.map(|period| json!({
                "start_date": date(period.start_date),
                "end_date": date(period.end_date),
            })),
        })
    }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    match s.parse() {
        Ok(t) => t,
        Err(err) => panic!("bad timestamp {}: {}", s, err),
    }
}

pub fn people() -> Vec<Person> {
    vec![
        Person {
            id: 1,
            name: Some("Alice".to_string()),
            age: Some(30),
            status: Some("ACTIVE".to_string()),
            email: Some("alice@example.com".to_string()),
            score: Some(2.5),
            valid_for: Some(TimePeriod {
                start_date: Some(ts("2024-01-01T00:00:00Z")),
                end_date: None,
            }),
        },
        Person {
            id: 2,
            name: Some("Bob".to_string()),
            age: Some(17),
            status: Some("PENDING".to_string()),
            email: None,
            score: Some(1.0),
            valid_for: Some(TimePeriod {
                start_date: Some(ts("2023-01-01T00:00:00Z")),
                end_date: Some(ts("2023-12-31T00:00:00Z")),
            }),
        },
        Person {
            id: 3,
            name: Some("Carol".to_string()),
            age: Some(65),
            status: Some("CLOSED".to_string()),
            email: Some("carol@example.org".to_string()),
            score: None,
            valid_for: None,
        },
        Person {
            id: 4,
            name: Some("Dave".to_string()),
            age: None,
            status: None,
            email: Some(String::new()),
            score: Some(3.5),
            valid_for: Some(TimePeriod {
                start_date: Some(ts("2025-01-01T00:00:00Z")),
                end_date: None,
            }),
        },
        Person {
            id: 5,
            name: Some("Erin".to_string()),
            age: Some(18),
            status: Some("ACTIVE".to_string()),
            email: None,
            score: Some(0.5),
            valid_for: Some(TimePeriod::default()),
        },
        Person {
            id: 6,
            name: None,
            age: Some(42),
            status: Some("PENDING".to_string()),
            email: Some("frank@example.com".to_string()),
            score: None,
            valid_for: None,
        },
    ]
}

/// Criteria every backend can express, with a label for failure messages.
pub fn portable_cases() -> Vec<(&'static str, PersonCriteria)> {
    vec![
        ("empty", PersonCriteria::default()),
        (
            "name eq",
            PersonCriteria {
                name: Some(FilterValue::eq("Alice")),
                ..Default::default()
            },
        ),
        (
            "age range",
            PersonCriteria {
                age: Some(FilterValue::gte(18).and_lt(65)),
                ..Default::default()
            },
        ),
        (
            "status in",
            PersonCriteria {
                status: Some(FilterValue::is_in(["ACTIVE", "PENDING"])),
                ..Default::default()
            },
        ),
        (
            "email absent",
            PersonCriteria {
                email: Some(FilterValue::exists(false)),
                ..Default::default()
            },
        ),
        (
            "email present",
            PersonCriteria {
                email: Some(FilterValue::exists(true)),
                ..Default::default()
            },
        ),
        (
            "status ne",
            PersonCriteria {
                status: Some(FilterValue::ne("CLOSED")),
                ..Default::default()
            },
        ),
        (
            "status not in",
            PersonCriteria {
                status: Some(FilterValue::not_in(["CLOSED", "PENDING"])),
                ..Default::default()
            },
        ),
        (
            "age alternative",
            PersonCriteria {
                age: Some(FilterValue::eq(30).or(FilterValue::exists(false))),
                ..Default::default()
            },
        ),
        (
            "alternative only",
            PersonCriteria {
                age: Some(FilterValue::default().or(FilterValue::lt(18))),
                ..Default::default()
            },
        ),
        (
            "active period",
            PersonCriteria {
                valid_for: Some(TimePeriodFilters::active_at(ts("2024-06-01T00:00:00Z"))),
                ..Default::default()
            },
        ),
        (
            "period end absent",
            PersonCriteria {
                valid_for: Some(TimePeriodFilters {
                    start_date: None,
                    end_date: Some(FilterValue::exists(false)),
                }),
                ..Default::default()
            },
        ),
        (
            "ids",
            PersonCriteria {
                base: BaseCriteria::by_ids([1, 3, 5]),
                ..Default::default()
            },
        ),
        (
            "score gt",
            PersonCriteria {
                score: Some(FilterValue::gt(1.5)),
                ..Default::default()
            },
        ),
        (
            "empty in",
            PersonCriteria {
                status: Some(FilterValue::is_in(Vec::<String>::new())),
                ..Default::default()
            },
        ),
        (
            "empty not in",
            PersonCriteria {
                status: Some(FilterValue::not_in(Vec::<String>::new())),
                ..Default::default()
            },
        ),
        (
            "combined",
            PersonCriteria {
                name: Some(FilterValue::ne("Bob")),
                age: Some(FilterValue::lt(40)),
                ..Default::default()
            },
        ),
        (
            "contradiction",
            PersonCriteria {
                age: Some(FilterValue::gt(50).and_lt(20)),
                ..Default::default()
            },
        ),
    ]
}

/// Criteria using operators that not every relational dialect supports.
pub fn pattern_cases() -> Vec<(&'static str, PersonCriteria)> {
    vec![
        (
            "name pattern",
            PersonCriteria {
                name: Some(FilterValue::pattern("^[AB]")),
                ..Default::default()
            },
        ),
        (
            "email domain or absent",
            PersonCriteria {
                email: Some(FilterValue::pattern("@example\\.com$").or(FilterValue::exists(false))),
                ..Default::default()
            },
        ),
    ]
}

/// Ids the in-memory evaluator accepts, ascending.
pub fn evaluated_ids(criteria: &PersonCriteria, people: &[Person]) -> Vec<i64> {
    people
        .iter()
        .filter(|p| krino::evaluate(criteria, Some(*p)))
        .map(|p| p.id)
        .collect()
}
