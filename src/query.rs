//! Query options understood by every storage provider.
//!
//! Filters are a conjunction of per-field conditions. The JSON form is what
//! the `query` handler accepts in a request body:
//!
//! ```json
//! {
//!   "filter": [{ "field": "price", "op": { "gte": 10 } },
//!              { "field": "archived_at", "op": "is_null" }],
//!   "order_by": [{ "field": "price", "direction": "desc" }],
//!   "limit": 20,
//!   "offset": 40,
//!   "select": ["id", "title"]
//! }
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::Row;

/// Comparison applied to one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    IsNull,
    IsNotNull,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Check the condition against a row. A missing field reads as null.
    pub fn matches(&self, row: &Row) -> bool {
        let value = row.get(&self.field).unwrap_or(&Value::Null);
        match &self.op {
            Operator::Eq(expected) => values_equal(value, expected),
            Operator::Ne(expected) => !values_equal(value, expected),
            Operator::Gt(bound) => ordered(value, bound, |o| o == Ordering::Greater),
            Operator::Gte(bound) => ordered(value, bound, |o| o != Ordering::Less),
            Operator::Lt(bound) => ordered(value, bound, |o| o == Ordering::Less),
            Operator::Lte(bound) => ordered(value, bound, |o| o != Ordering::Greater),
            Operator::In(set) => set.iter().any(|v| values_equal(value, v)),
            Operator::NotIn(set) => !set.iter().any(|v| values_equal(value, v)),
            Operator::IsNull => value.is_null(),
            Operator::IsNotNull => !value.is_null(),
        }
    }
}

// Range operators never match null or values of a different kind.
fn ordered(value: &Value, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    if value.is_null() || bound.is_null() || kind(value) != kind(bound) {
        return false;
    }
    accept(compare_values(value, bound))
}

/// Conjunction of conditions. An empty filter matches every row.
pub type Filter = Vec<Condition>;

/// Check every condition of `filter` against `row`.
pub fn matches_all(filter: &[Condition], row: &Row) -> bool {
    filter.iter().all(|condition| condition.matches(row))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Options for `find_many`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryOptions {
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Columns to keep. `None` keeps every column.
    pub select: Option<Vec<String>>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: Operator) -> Self {
        self.filter.push(Condition::new(field, op));
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Compare two rows by the configured sort keys, in order.
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.order_by {
            let left = a.get(&key.field).unwrap_or(&Value::Null);
            let right = b.get(&key.field).unwrap_or(&Value::Null);
            let ordering = match key.direction {
                Direction::Asc => compare_values(left, right),
                Direction::Desc => compare_values(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Keep only the selected columns of `row`.
    pub fn project(&self, row: Row) -> Row {
        match &self.select {
            None => row,
            Some(columns) => row
                .into_iter()
                .filter(|(column, _)| columns.iter().any(|c| c == column))
                .collect(),
        }
    }

    /// Apply filter, ordering, pagination and projection to an in-memory row set.
    pub fn apply<I>(&self, rows: I) -> Vec<Row>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut rows: Vec<Row> = rows
            .into_iter()
            .filter(|row| matches_all(&self.filter, row))
            .collect();
        if !self.order_by.is_empty() {
            rows.sort_by(|a, b| self.compare_rows(a, b));
        }
        rows.into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|row| self.project(row))
            .collect()
    }
}

fn kind(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

/// Total order over JSON values.
///
/// Null sorts first, then booleans, numbers, strings, arrays and objects.
/// Numbers compare numerically, strings lexicographically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                let ordering = compare_values(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => kind(a).cmp(&kind(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            row(json!({"id": "a", "price": 30, "tag": "x", "deleted_at": null})),
            row(json!({"id": "b", "price": 10, "tag": "y"})),
            row(json!({"id": "c", "price": 20.5, "tag": "x", "deleted_at": "2024-01-01"})),
            row(json!({"id": "d", "price": 5, "tag": "z"})),
        ]
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_equality_and_set_filters() {
        let options = QueryOptions::new().filter("tag", Operator::Eq(json!("x")));
        assert_eq!(ids(&options.apply(rows())), vec!["a", "c"]);

        let options = QueryOptions::new().filter("tag", Operator::NotIn(vec![json!("x"), json!("y")]));
        assert_eq!(ids(&options.apply(rows())), vec!["d"]);

        let options = QueryOptions::new().filter("price", Operator::Eq(json!(10.0)));
        assert_eq!(ids(&options.apply(rows())), vec!["b"]);
    }

    #[test]
    fn test_range_and_null_filters() {
        let options = QueryOptions::new()
            .filter("price", Operator::Gte(json!(10)))
            .filter("price", Operator::Lt(json!(30)));
        assert_eq!(ids(&options.apply(rows())), vec!["b", "c"]);

        let options = QueryOptions::new().filter("deleted_at", Operator::IsNull);
        assert_eq!(ids(&options.apply(rows())), vec!["a", "b", "d"]);

        // Strings never satisfy a numeric range.
        let options = QueryOptions::new().filter("tag", Operator::Gt(json!(0)));
        assert!(options.apply(rows()).is_empty());
    }

    #[test]
    fn test_order_pagination_and_projection() {
        let options = QueryOptions::new()
            .order_by(OrderBy::desc("price"))
            .offset(1)
            .limit(2)
            .select(["id"]);
        let result = options.apply(rows());

        assert_eq!(ids(&result), vec!["c", "b"]);
        assert!(result.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_multi_key_ordering() {
        let options = QueryOptions::new()
            .order_by(OrderBy::asc("tag"))
            .order_by(OrderBy::desc("price"));
        assert_eq!(ids(&options.apply(rows())), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_options_from_json() {
        let options: QueryOptions = serde_json::from_value(json!({
            "filter": [
                {"field": "price", "op": {"in": [5, 10]}},
                {"field": "deleted_at", "op": "is_null"}
            ],
            "order_by": [{"field": "price"}],
            "limit": 1
        }))
        .unwrap();

        assert_eq!(options.order_by[0].direction, Direction::Asc);
        assert_eq!(ids(&options.apply(rows())), vec!["d"]);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let result = serde_json::from_value::<QueryOptions>(json!({"limt": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_values_cross_kind() {
        assert_eq!(compare_values(&Value::Null, &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
