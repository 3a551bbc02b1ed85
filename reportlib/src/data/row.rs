//! Report rows and datasets.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::column::{order_columns, Column, ColumnSpec};
use super::value::CellValue;
use crate::Result;

/// Key under which the backend sends a row's identifier.
pub const ID_KEY: &str = "id";

/// One record of a report: a numeric identifier plus dynamically keyed cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            cells: BTreeMap::new(),
        }
    }

    /// Builder: set a cell
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(key.into(), value.into());
        self
    }

    /// Cell for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.get(key)
    }

    /// Build a row from a JSON object.
    ///
    /// A numeric `id` becomes the row id; otherwise the row is numbered by
    /// its 1-based position and any `id` value stays a regular cell.
    pub fn from_json_object(position: usize, mut object: Map<String, Value>) -> Self {
        let numeric_id = object.get(ID_KEY).and_then(json_id);
        let id = match numeric_id {
            Some(id) => {
                object.remove(ID_KEY);
                id
            }
            None => position as i64 + 1,
        };
        let cells = object
            .into_iter()
            .map(|(key, value)| (key, CellValue::from_json(value)))
            .collect();
        Row { id, cells }
    }
}

fn json_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Wire shape of a query result: column keys (or descriptors) plus row
/// objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}

/// A complete row set with its resolved, ordered columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from resolved columns and rows. Columns are put in
    /// display order (company, date, rest).
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            columns: order_columns(columns),
            rows,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build from a query result. When the result names no columns they are
    /// taken from the first row's keys, in order, without `id`.
    pub fn from_query_result(result: QueryResult) -> Self {
        let specs: Vec<ColumnSpec> = if result.columns.is_empty() {
            result
                .rows
                .first()
                .map(|first| {
                    first
                        .keys()
                        .filter(|k| k.as_str() != ID_KEY)
                        .map(|k| ColumnSpec::Key(k.clone()))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            result
                .columns
                .into_iter()
                .filter(|spec| spec.key() != ID_KEY)
                .collect()
        };

        let rows: Vec<Row> = result
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, object)| Row::from_json_object(i, object))
            .collect();

        let columns = specs
            .iter()
            .map(|spec| Column::resolve(spec, &rows))
            .collect();

        Dataset::new(columns, rows)
    }

    /// Build from JSON: `null`, an array of row objects, or a
    /// `{columns, rows}` object.
    pub fn from_json(value: Value) -> Result<Self> {
        let result = match value {
            Value::Null => return Ok(Dataset::empty()),
            Value::Array(items) => {
                let rows = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<Vec<Map<String, Value>>, _>>()?;
                QueryResult {
                    columns: Vec::new(),
                    rows,
                }
            }
            other => serde_json::from_value::<QueryResult>(other)?,
        };
        Ok(Dataset::from_query_result(result))
    }

    /// Load a JSON dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&text)?;
        Dataset::from_json(value)
    }

    /// Column keys in display order.
    pub fn column_keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }
}
