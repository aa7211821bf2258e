use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Criteria, fields::AccessorTable};
use crate::{
    filter::{FieldFilter, FilterValue},
    query::Value,
    record::{FieldRef, Record},
};

/// Reusable sub-criteria over a validity window, nested under a field such
/// as `valid_for`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<FilterValue<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<FilterValue<DateTime<Utc>>>,
}

impl TimePeriodFilters {
    /// Periods that have started at or before `at` and have not ended before it.
    /// An open end date counts as still running.
    pub fn active_at(at: DateTime<Utc>) -> Self {
        Self {
            start_date: Some(FilterValue::lte(at)),
            end_date: Some(FilterValue::gte(at).or(FilterValue::exists(false))),
        }
    }
}

impl Criteria for TimePeriodFilters {
    const NAME: &'static str = "TimePeriodFilters";

    fn accessor_table() -> AccessorTable<Self> {
        let mut table = AccessorTable::new(Self::NAME);
        table
            .filter("start_date", |c: &Self| {
                c.start_date.as_ref().map(|f| f as &dyn FieldFilter)
            })
            .filter("end_date", |c: &Self| {
                c.end_date.as_ref().map(|f| f as &dyn FieldFilter)
            });
        table
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriod {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Record for TimePeriod {
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "start_date" | "startDate" => self.start_date.map(|t| FieldRef::Value(Value::Timestamp(t))),
            "end_date" | "endDate" => self.end_date.map(|t| FieldRef::Value(Value::Timestamp(t))),
            _ => None,
        }
    }
}
