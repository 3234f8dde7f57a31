//! Filter, order and limit predicates for table reads.
//!
//! A [`Query`] renders to `PostgREST` query parameters for the HTTP client and
//! evaluates directly against JSON rows for the in-memory backend, so both
//! implementations agree on semantics.

use std::cmp::Ordering;

use serde_json::Value;

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value` (`is null` when the value is JSON null).
    Eq(String, Value),
    /// `column >= value`.
    Gte(String, Value),
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Read predicates for a table: filters, sort keys and an optional limit.
///
/// ```
/// use siddha_clinic_web::supabase::Query;
///
/// let query = Query::new()
///     .eq("is_active", true)
///     .order_desc("created_at")
///     .limit(5);
/// assert_eq!(
///     query.to_params(),
///     vec![
///         ("select".to_string(), "*".to_string()),
///         ("is_active".to_string(), "eq.true".to_string()),
///         ("order".to_string(), "created_at.desc".to_string()),
///         ("limit".to_string(), "5".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Query {
    /// An unfiltered, unordered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    /// Add a greater-than-or-equal filter.
    #[must_use]
    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    /// Append an ascending sort key.
    #[must_use]
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    /// Append a descending sort key.
    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    /// Limit the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as `PostgREST` query-string pairs.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];

        for filter in &self.filters {
            let (column, rendered) = match filter {
                Filter::Eq(column, Value::Null) => (column, "is.null".to_string()),
                Filter::Eq(column, value) => (column, format!("eq.{}", render_value(value))),
                Filter::Gte(column, value) => (column, format!("gte.{}", render_value(value))),
            };
            params.push((column.clone(), rendered));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// True when the row satisfies every filter.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(column, expected) => {
                row.get(column).unwrap_or(&Value::Null) == expected
            }
            Filter::Gte(column, bound) => row
                .get(column)
                .and_then(|actual| compare_values(actual, bound))
                .is_some_and(|ord| ord != Ordering::Less),
        })
    }

    /// Filter, stably sort and limit rows in memory.
    ///
    /// Rows with equal sort keys keep their input (insertion) order.
    #[must_use]
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut selected: Vec<Value> = rows.iter().filter(|r| self.matches(r)).cloned().collect();

        if !self.order.is_empty() {
            selected.sort_by(|a, b| {
                for key in &self.order {
                    let left = a.get(&key.column).unwrap_or(&Value::Null);
                    let right = b.get(&key.column).unwrap_or(&Value::Null);
                    let ord = compare_values(left, right).unwrap_or(Ordering::Equal);
                    let ord = if key.ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare two JSON scalars of the same kind. Nulls sort first.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows() -> Vec<Value> {
        vec![
            json!({"name": "a", "sort_order": 1, "created_at": "2026-01-01T00:00:00Z"}),
            json!({"name": "b", "sort_order": 0, "created_at": "2026-01-02T00:00:00Z"}),
            json!({"name": "c", "sort_order": 1, "created_at": "2026-01-03T00:00:00Z"}),
            json!({"name": "d", "sort_order": 0, "created_at": "2026-01-04T00:00:00Z"}),
        ]
    }

    fn names(rows: &[Value]) -> Vec<&str> {
        rows.iter().filter_map(|r| r["name"].as_str()).collect()
    }

    #[test]
    fn test_params_rendering() {
        let params = Query::new()
            .eq("section_key", "seo")
            .eq("deleted_at", Value::Null)
            .gte("created_at", "2026-01-01T00:00:00Z")
            .order_asc("sort_order")
            .order_desc("created_at")
            .to_params();

        assert!(params.contains(&("section_key".to_string(), "eq.seo".to_string())));
        assert!(params.contains(&("deleted_at".to_string(), "is.null".to_string())));
        assert!(params.contains(&(
            "created_at".to_string(),
            "gte.2026-01-01T00:00:00Z".to_string()
        )));
        assert!(params.contains(&(
            "order".to_string(),
            "sort_order.asc,created_at.desc".to_string()
        )));
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let sorted = Query::new().order_asc("sort_order").apply(&rows());
        assert_eq!(names(&sorted), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_descending_and_limit() {
        let latest = Query::new().order_desc("created_at").limit(2).apply(&rows());
        assert_eq!(names(&latest), vec!["d", "c"]);
    }

    #[test]
    fn test_gte_on_timestamps() {
        let recent = Query::new()
            .gte("created_at", "2026-01-03T00:00:00Z")
            .apply(&rows());
        assert_eq!(names(&recent), vec!["c", "d"]);
    }

    #[test]
    fn test_eq_on_missing_column_matches_null_only() {
        assert!(Query::new().eq("notes", Value::Null).matches(&json!({"name": "x"})));
        assert!(!Query::new().eq("notes", "hi").matches(&json!({"name": "x"})));
    }
}
