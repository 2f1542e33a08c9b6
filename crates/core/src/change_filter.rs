//! Row filters for realtime change subscriptions.
//!
//! Subscribers narrow a table's change feed with a single column filter in
//! the `column=op.value` form used by the realtime protocol, e.g.
//! `user_id=eq.3f1c...`. Supported operators: `eq`, `neq`, `in`.
//! Filters are evaluated against the JSON form of a row.

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq(String),
    Neq(String),
    In(Vec<String>),
}

/// A parsed `column=op.value` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub column: String,
    pub op: FilterOp,
}

impl ChangeFilter {
    /// Parse a filter expression.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (column, expr) = raw
            .split_once('=')
            .ok_or_else(|| CoreError::Validation(format!("Invalid filter '{raw}'")))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(CoreError::Validation(format!(
                "Invalid filter '{raw}': missing column"
            )));
        }

        let (op, value) = expr
            .split_once('.')
            .ok_or_else(|| CoreError::Validation(format!("Invalid filter '{raw}': missing operator")))?;

        let op = match op {
            "eq" => FilterOp::Eq(value.to_string()),
            "neq" => FilterOp::Neq(value.to_string()),
            "in" => {
                let inner = value
                    .strip_prefix('(')
                    .and_then(|v| v.strip_suffix(')'))
                    .ok_or_else(|| {
                        CoreError::Validation(format!(
                            "Invalid filter '{raw}': 'in' expects (a,b,...)"
                        ))
                    })?;
                FilterOp::In(
                    inner
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                )
            }
            other => {
                return Err(CoreError::Validation(format!(
                    "Unsupported filter operator '{other}'. Valid: eq, neq, in"
                )))
            }
        };

        Ok(Self {
            column: column.to_string(),
            op,
        })
    }

    /// Evaluate the filter against a row rendered as a JSON object.
    ///
    /// A missing column never matches `eq`/`in` and always matches `neq`.
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        let actual = record.get(&self.column).and_then(scalar_text);
        match (&self.op, actual) {
            (FilterOp::Eq(expected), Some(actual)) => &actual == expected,
            (FilterOp::Neq(expected), Some(actual)) => &actual != expected,
            (FilterOp::In(values), Some(actual)) => values.iter().any(|v| v == &actual),
            (FilterOp::Neq(_), None) => true,
            (_, None) => false,
        }
    }

    /// The value an `eq` filter pins the column to, if any.
    pub fn eq_value(&self) -> Option<&str> {
        match &self.op {
            FilterOp::Eq(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// Render a scalar JSON value as the text the filter compares against.
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
