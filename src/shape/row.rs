use crate::error::{GatewayError, Result};
use crate::shape::Amount;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::types::{TimeUnit, Value};

/// A record type built from one positional result row.
///
/// `COLUMNS` is the contract between the SELECT list and the record: the
/// dispatcher reads exactly that many values per row and `from_row` looks
/// them up by name.
pub trait Record: Sized {
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &RowView<'_>) -> Result<Self>;
}

/// Maps raw rows to records, preserving query order.
pub fn shape<R: Record>(rows: &[Vec<Value>]) -> Result<Vec<R>> {
    rows.iter()
        .map(|values| {
            if values.len() != R::COLUMNS.len() {
                return Err(GatewayError::Internal(format!(
                    "row has {} values, expected {} ({})",
                    values.len(),
                    R::COLUMNS.len(),
                    R::COLUMNS.join(", ")
                )));
            }
            R::from_row(&RowView {
                columns: R::COLUMNS,
                values,
            })
        })
        .collect()
}

pub struct RowView<'a> {
    columns: &'static [&'static str],
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    fn value(&self, column: &str) -> Result<&'a Value> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| GatewayError::Internal(format!("column '{}' is not declared", column)))
    }

    fn mismatch(column: &str, expected: &str, found: &Value) -> GatewayError {
        GatewayError::Internal(format!(
            "column '{}': expected {}, found {:?}",
            column, expected, found
        ))
    }

    fn null(column: &str) -> GatewayError {
        GatewayError::Internal(format!("column '{}' is unexpectedly NULL", column))
    }

    pub fn opt_i64(&self, column: &str) -> Result<Option<i64>> {
        let value = self.value(column)?;
        let converted = match value {
            Value::Null => return Ok(None),
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::HugeInt(v) => i64::try_from(*v).ok(),
            Value::UTinyInt(v) => Some(i64::from(*v)),
            Value::USmallInt(v) => Some(i64::from(*v)),
            Value::UInt(v) => Some(i64::from(*v)),
            Value::UBigInt(v) => i64::try_from(*v).ok(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        };
        converted
            .map(Some)
            .ok_or_else(|| Self::mismatch(column, "64-bit integer", value))
    }

    pub fn i64(&self, column: &str) -> Result<i64> {
        self.opt_i64(column)?.ok_or_else(|| Self::null(column))
    }

    pub fn opt_f64(&self, column: &str) -> Result<Option<f64>> {
        let value = self.value(column)?;
        match value {
            Value::Null => Ok(None),
            Value::Float(v) => Ok(Some(f64::from(*v))),
            Value::Double(v) => Ok(Some(*v)),
            _ => self.opt_i64(column).map(|v| v.map(|v| v as f64)),
        }
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(Self::mismatch(column, "text", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<String> {
        self.opt_text(column)?.ok_or_else(|| Self::null(column))
    }

    pub fn bool(&self, column: &str) -> Result<bool> {
        match self.value(column)? {
            Value::Boolean(b) => Ok(*b),
            Value::Null => Err(Self::null(column)),
            other => Err(Self::mismatch(column, "boolean", other)),
        }
    }

    /// Integer stroops as an `Amount`.
    pub fn amount(&self, column: &str) -> Result<Amount> {
        self.i64(column).map(Amount::from_stroops)
    }

    /// Timestamps render as RFC 3339 in UTC.
    pub fn opt_timestamp(&self, column: &str) -> Result<Option<String>> {
        let value = self.value(column)?;
        match value {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Timestamp(unit, raw) => {
                let micros = match unit {
                    TimeUnit::Second => raw.saturating_mul(1_000_000),
                    TimeUnit::Millisecond => raw.saturating_mul(1_000),
                    TimeUnit::Microsecond => *raw,
                    TimeUnit::Nanosecond => raw / 1_000,
                };
                let secs = micros.div_euclid(1_000_000);
                let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
                DateTime::<Utc>::from_timestamp(secs, nanos)
                    .map(|ts| Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true)))
                    .ok_or_else(|| Self::mismatch(column, "timestamp in range", value))
            }
            other => Err(Self::mismatch(column, "timestamp", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        id: i64,
        label: Option<String>,
    }

    impl Record for Pair {
        const COLUMNS: &'static [&'static str] = &["id", "label"];

        fn from_row(row: &RowView<'_>) -> Result<Self> {
            Ok(Pair {
                id: row.i64("id")?,
                label: row.opt_text("label")?,
            })
        }
    }

    #[test]
    fn test_shape_preserves_order() {
        let rows = vec![
            vec![Value::BigInt(3), Value::Text("c".to_string())],
            vec![Value::Int(1), Value::Null],
        ];
        let pairs: Vec<Pair> = shape(&rows).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, 3);
        assert_eq!(pairs[0].label.as_deref(), Some("c"));
        assert_eq!(pairs[1].id, 1);
        assert!(pairs[1].label.is_none());
    }

    #[test]
    fn test_shape_rejects_wrong_width() {
        let rows = vec![vec![Value::BigInt(3)]];
        assert!(shape::<Pair>(&rows).is_err());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let rows = vec![vec![Value::Boolean(true), Value::Null]];
        assert!(shape::<Pair>(&rows).is_err());
    }

    #[test]
    fn test_timestamp_rendering() {
        let values = [Value::Timestamp(TimeUnit::Microsecond, 1_735_689_600_000_000)];
        let view = RowView {
            columns: &["closed_at"],
            values: &values,
        };
        assert_eq!(
            view.opt_timestamp("closed_at").unwrap().as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
    }
}
