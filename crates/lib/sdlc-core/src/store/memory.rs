use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use sdlc_store::Row;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Direction, Order, Query, RecordStore, StoreResult};

/// In-memory record store with PostgREST-like filtering, ordering, and projection.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to `table`. Non-object values are ignored.
    pub async fn insert(&self, table: &str, row: Value) {
        let Value::Object(row) = row else {
            return;
        };
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, expected)| matches_filter(row.get(column), expected))
            })
            .collect();

        if let Some(order) = &query.order {
            matched.sort_by(|left, right| compare_rows(left, right, order));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .take(limit)
            .map(|row| project(row, &query.select))
            .collect())
    }
}

fn matches_filter(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(text)) => text == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn compare_rows(left: &Row, right: &Row, order: &Order) -> Ordering {
    let left = left.get(&order.column).filter(|value| !value.is_null());
    let right = right.get(&order.column).filter(|value| !value.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) if order.nulls_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) if order.nulls_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = compare_values(left, right);
            match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

fn project(row: &Row, select: &str) -> Row {
    if select.trim() == "*" {
        return row.clone();
    }
    select
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .filter_map(|column| row.get(column).map(|value| (column.to_string(), value.clone())))
        .collect()
}
