//! Filter and ordering evaluation for the in-memory document store.
//!
//! Comparisons only succeed between values of the same kind (numbers with
//! numbers, strings with strings, booleans with booleans). For ordering,
//! missing and `null` fields sort lowest, followed by booleans, numbers,
//! strings, arrays and objects.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::domain::ports::{
    Comparison, Direction, DocumentStoreError, FieldPath, Filter, IN_FILTER_LIMIT, OrderBy, Query,
};

/// Reject queries the hosted store would refuse.
pub(super) fn validate(query: &Query) -> Result<(), DocumentStoreError> {
    let mut in_filters = 0;
    for filter in &query.filters {
        if let Filter::In { values, .. } = filter {
            in_filters += 1;
            if values.is_empty() {
                return Err(DocumentStoreError::invalid_query(
                    "'in' filter requires at least one value",
                ));
            }
            if values.len() > IN_FILTER_LIMIT {
                return Err(DocumentStoreError::invalid_query(format!(
                    "'in' filter accepts at most {IN_FILTER_LIMIT} values, got {}",
                    values.len()
                )));
            }
        }
    }
    if in_filters > 1 {
        return Err(DocumentStoreError::invalid_query(
            "a query may contain at most one 'in' filter",
        ));
    }
    Ok(())
}

fn resolve(id: &str, fields: &Map<String, Value>, path: &FieldPath) -> Option<Value> {
    match path {
        FieldPath::DocumentId => Some(Value::String(id.to_owned())),
        FieldPath::Field(name) => fields.get(name).cloned(),
    }
}

fn compare_same_kind(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Whether the document satisfies `filter`.
pub(super) fn matches(id: &str, fields: &Map<String, Value>, filter: &Filter) -> bool {
    match filter {
        Filter::Equal { field, value } => resolve(id, fields, field).as_ref() == Some(value),
        Filter::In { field, values } => {
            resolve(id, fields, field).is_some_and(|actual| values.contains(&actual))
        }
        Filter::ArrayContains { field, value } => match resolve(id, fields, field) {
            Some(Value::Array(items)) => items.contains(value),
            _ => false,
        },
        Filter::Compare { field, op, value } => resolve(id, fields, field)
            .and_then(|actual| compare_same_kind(&actual, value))
            .is_some_and(|ordering| match op {
                Comparison::LessThan => ordering == Ordering::Less,
                Comparison::LessThanOrEqual => ordering != Ordering::Greater,
                Comparison::GreaterThan => ordering == Ordering::Greater,
                Comparison::GreaterThanOrEqual => ordering != Ordering::Less,
            }),
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn total_order(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let by_kind = kind_rank(left).cmp(&kind_rank(right));
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (left, right) {
        (Some(a), Some(b)) => compare_same_kind(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Compare two documents under `order`.
pub(super) fn compare(
    order: &OrderBy,
    left: (&str, &Map<String, Value>),
    right: (&str, &Map<String, Value>),
) -> Ordering {
    let a = resolve(left.0, left.1, &order.field);
    let b = resolve(right.0, right.1, &order.field);
    let ordering = total_order(a.as_ref(), b.as_ref());
    match order.direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Collection;
    use rstest::rstest;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[rstest]
    #[case(Vec::new())]
    #[case((0..=IN_FILTER_LIMIT).map(|n| json!(n)).collect())]
    fn rejects_unusable_in_filters(#[case] values: Vec<Value>) {
        let query = Query::new(Collection::Zines).where_in(FieldPath::DocumentId, values);
        let err = validate(&query).expect_err("query rejected");
        assert!(matches!(err, DocumentStoreError::InvalidQuery { .. }));
    }

    #[rstest]
    fn rejects_two_in_filters() {
        let query = Query::new(Collection::Zines)
            .where_in(FieldPath::DocumentId, vec![json!("z1")])
            .where_in("artistId", vec![json!("a1")]);
        assert!(validate(&query).is_err());
    }

    #[rstest]
    #[case(Filter::Equal { field: "artistId".into(), value: json!("a1") }, true)]
    #[case(Filter::Equal { field: "artistId".into(), value: json!("a2") }, false)]
    #[case(Filter::In { field: FieldPath::DocumentId, values: vec![json!("z0"), json!("z1")] }, true)]
    #[case(Filter::ArrayContains { field: "tags".into(), value: json!("comics") }, true)]
    #[case(Filter::ArrayContains { field: "artistId".into(), value: json!("a1") }, false)]
    #[case(Filter::Compare { field: "pages".into(), op: Comparison::GreaterThan, value: json!(10) }, true)]
    #[case(Filter::Compare { field: "pages".into(), op: Comparison::LessThanOrEqual, value: json!(10) }, false)]
    #[case(Filter::Compare { field: "pages".into(), op: Comparison::GreaterThan, value: json!("10") }, false)]
    #[case(Filter::Equal { field: "missing".into(), value: Value::Null }, false)]
    fn evaluates_filters(#[case] filter: Filter, #[case] expected: bool) {
        let fields = doc(json!({ "artistId": "a1", "tags": ["comics"], "pages": 24 }));
        assert_eq!(matches("z1", &fields, &filter), expected);
    }

    #[rstest]
    fn missing_fields_sort_lowest() {
        let order = OrderBy {
            field: "createdAt".into(),
            direction: Direction::Ascending,
        };
        let stamped = doc(json!({ "createdAt": "2024-01-01T00:00:00.000000000Z" }));
        let bare = doc(json!({}));
        assert_eq!(
            compare(&order, ("a", &bare), ("b", &stamped)),
            Ordering::Less
        );
    }

    #[rstest]
    fn descending_reverses_string_order() {
        let order = OrderBy {
            field: "createdAt".into(),
            direction: Direction::Descending,
        };
        let older = doc(json!({ "createdAt": "2024-01-01T00:00:00.000000000Z" }));
        let newer = doc(json!({ "createdAt": "2024-06-01T00:00:00.000000000Z" }));
        assert_eq!(
            compare(&order, ("n", &newer), ("o", &older)),
            Ordering::Less
        );
    }
}
