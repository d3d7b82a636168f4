use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Row},
};

/// Table schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Lower-cased canonical table name
    pub table_name: String,
    pub columns: Vec<Column>,
    pub created_at: DateTime<Utc>,
}

impl TableSchema {
    pub fn new(table_name: &str, columns: Vec<Column>) -> Self {
        Self {
            table_name: table_name.to_lowercase(),
            columns,
            created_at: Utc::now(),
        }
    }

    /// Validates a column list: non-empty, every column named, names unique
    /// ignoring case
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Validation("Table must have at least one column".into()));
        }

        let mut seen = HashSet::new();
        for (i, col) in self.columns.iter().enumerate() {
            if col.name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Column {} must have a valid name",
                    i + 1
                )));
            }
            if !seen.insert(col.name.to_lowercase()) {
                return Err(Error::Validation(format!(
                    "Duplicate column name: '{}'",
                    col.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the column index for a given column name (case-sensitive)
    pub fn get_col_index(&self, col_name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == col_name)
            .ok_or(Error::Validation(format!(
                "Column '{}' does not exist in table '{}'",
                col_name, self.table_name
            )))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

/// Durable contents of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub schema: TableSchema,
    /// Rows in insertion order
    pub rows: Vec<Row>,
}

impl TableData {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }
}
