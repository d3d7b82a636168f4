use std::collections::HashSet;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Session,
        executor::{Executor, Explanation, ResultSet, check_columns, evaluate},
        parser::ast::{Assignment, Condition, Literal, Statement},
        schema::TableSchema,
        types::{Row, Value},
    },
    storage::engine::Backend,
};

/// INSERT executor, one or many rows
pub struct Insert {
    table_name: String,
    values: Vec<Vec<Literal>>,
}

impl Insert {
    pub fn new(table_name: String, values: Vec<Vec<Literal>>) -> Box<Self> {
        Box::new(Self { table_name, values })
    }
}

// Builds a stored row from literals in schema order
fn make_row(schema: &TableSchema, values: &[Literal]) -> Result<Row> {
    if values.len() != schema.columns.len() {
        return Err(Error::Validation(format!(
            "Column count mismatch: expected {} values, got {}",
            schema.columns.len(),
            values.len()
        )));
    }
    schema
        .columns
        .iter()
        .zip(values)
        .map(|(col, literal)| {
            let value = Value::from_literal(literal);
            let type_name = value.type_name();
            col.datatype.coerce(value).ok_or_else(|| {
                Error::Validation(format!(
                    "Type mismatch for column '{}': expected {}, got {}",
                    col.name, col.datatype, type_name
                ))
            })
        })
        .collect()
}

impl<B: Backend> Executor<B> for Insert {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database();
        let storage = session.storage();
        let lock = storage.lock_table(db, &self.table_name);
        let _guard = lock.lock();

        if !storage.table_exists(db, &self.table_name)? {
            return Err(Error::NotFound(format!(
                "Table '{}' does not exist",
                self.table_name
            )));
        }
        if self.values.is_empty() {
            return Err(Error::Validation("Rows must be a non-empty array".into()));
        }

        // every row is checked before anything is written
        let schema = storage.get_schema(db, &self.table_name)?;
        let mut rows = self
            .values
            .iter()
            .map(|values| make_row(&schema, values))
            .collect::<Result<Vec<_>>>()?;

        let count = rows.len();
        let row = if count == 1 {
            let row = rows.pop();
            if let Some(row) = &row {
                storage.insert_row(db, &self.table_name, row.clone())?;
            }
            row
        } else {
            storage.insert_rows(db, &self.table_name, rows)?;
            None
        };

        Ok(ResultSet::Insert {
            table_name: schema.table_name,
            count,
            row,
        })
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    assignments: Vec<Assignment>,
    where_clause: Option<Condition>,
}

impl Update {
    pub fn new(
        table_name: String,
        assignments: Vec<Assignment>,
        where_clause: Option<Condition>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            assignments,
            where_clause,
        })
    }

    // Resolves assignments to (column index, coerced value)
    fn resolve(&self, schema: &TableSchema) -> Result<Vec<(usize, Value)>> {
        if self.assignments.is_empty() {
            return Err(Error::Validation(
                "UPDATE must specify at least one column to update".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            let index = schema.get_col_index(&assignment.column)?;
            if !seen.insert(index) {
                return Err(Error::Validation(format!(
                    "Column '{}' is assigned more than once",
                    assignment.column
                )));
            }
            let col = &schema.columns[index];
            let value = Value::from_literal(&assignment.value);
            let type_name = value.type_name();
            let value = col.datatype.coerce(value).ok_or_else(|| {
                Error::Validation(format!(
                    "Type mismatch for column '{}': expected {}, got {}",
                    col.name, col.datatype, type_name
                ))
            })?;
            resolved.push((index, value));
        }
        Ok(resolved)
    }
}

impl<B: Backend> Executor<B> for Update {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database();
        let storage = session.storage();
        let lock = storage.lock_table(db, &self.table_name);
        let _guard = lock.lock();

        if !storage.table_exists(db, &self.table_name)? {
            return Err(Error::NotFound(format!(
                "Table '{}' does not exist",
                self.table_name
            )));
        }
        let schema = storage.get_schema(db, &self.table_name)?;
        let resolved = self.resolve(&schema)?;
        if let Some(cond) = &self.where_clause {
            check_columns(cond, &schema)?;
        }

        let count = storage.update_rows(
            db,
            &self.table_name,
            |row| match &self.where_clause {
                Some(cond) => evaluate(cond, &schema, row),
                None => Ok(true),
            },
            |row| {
                let mut row = row.clone();
                for (index, value) in &resolved {
                    if let Some(slot) = row.get_mut(*index) {
                        *slot = value.clone();
                    }
                }
                Ok(row)
            },
        )?;

        Ok(ResultSet::Update {
            table_name: schema.table_name,
            count,
        })
    }
}

/// DELETE executor, truncates when there is no WHERE clause
pub struct Delete {
    table_name: String,
    where_clause: Option<Condition>,
}

impl Delete {
    pub fn new(table_name: String, where_clause: Option<Condition>) -> Box<Self> {
        Box::new(Self {
            table_name,
            where_clause,
        })
    }
}

impl<B: Backend> Executor<B> for Delete {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database();
        let storage = session.storage();
        let lock = storage.lock_table(db, &self.table_name);
        let _guard = lock.lock();

        if !storage.table_exists(db, &self.table_name)? {
            return Err(Error::NotFound(format!(
                "Table '{}' does not exist",
                self.table_name
            )));
        }
        let table_name = self.table_name.to_lowercase();

        match &self.where_clause {
            None => Ok(ResultSet::Delete {
                count: storage.truncate_table(db, &self.table_name)?,
                table_name,
                truncated: true,
            }),
            Some(cond) => {
                let schema = storage.get_schema(db, &self.table_name)?;
                check_columns(cond, &schema)?;
                let count = storage.delete_rows(db, &self.table_name, |row| {
                    evaluate(cond, &schema, row)
                })?;
                Ok(ResultSet::Delete {
                    table_name,
                    count,
                    truncated: false,
                })
            }
        }
    }
}

pub(super) fn explain(stmt: &Statement, explanation: &mut Explanation) {
    match stmt {
        Statement::Insert { table_name, values } => {
            let width = values.first().map_or(0, Vec::len);
            explanation.step(
                "VALIDATE_TABLE",
                format!("Check that table '{}' exists", table_name),
            );
            explanation.step(
                "VALIDATE_SCHEMA",
                format!("Verify {} values match table schema", width),
            );
            explanation.step(
                "VALIDATE_TYPES",
                "Check each value against its column type".into(),
            );
            explanation.step("BUILD_ROW", "Construct row in column order".into());
            let rows = if values.len() == 1 {
                "row".to_string()
            } else {
                format!("{} rows", values.len())
            };
            explanation.step(
                "WRITE_TO_DISK",
                format!("Append {} to table '{}'", rows, table_name),
            );
        }
        Statement::Update {
            table_name,
            assignments,
            where_clause,
        } => {
            let columns: Vec<&str> = assignments.iter().map(|a| a.column.as_str()).collect();
            explanation.step(
                "VALIDATE_TABLE",
                format!("Check that table '{}' exists", table_name),
            );
            explanation.step(
                "VALIDATE_COLUMNS",
                format!("Verify columns exist: {}", columns.join(", ")),
            );
            if let Some(cond) = where_clause {
                explanation.step("FILTER_ROWS", format!("Find rows where {}", cond));
            }
            explanation.step(
                "UPDATE_ROWS",
                format!("Set {} on matching rows", columns.join(", ")),
            );
            explanation.step(
                "WRITE_TO_DISK",
                format!("Write table '{}'", table_name),
            );
        }
        Statement::Delete {
            table_name,
            where_clause,
        } => {
            explanation.step(
                "VALIDATE_TABLE",
                format!("Check that table '{}' exists", table_name),
            );
            match where_clause {
                None => explanation.step("TRUNCATE", "Remove all rows".into()),
                Some(cond) => {
                    explanation.step("FILTER_ROWS", format!("Find rows where {}", cond));
                    explanation.step("DELETE_ROWS", "Remove matching rows".into());
                }
            }
            explanation.step(
                "WRITE_TO_DISK",
                format!("Write table '{}'", table_name),
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        error::{Error, Result},
        sql::{
            engine::Session,
            executor::{ResultSet, explain},
            parser::parse,
            types::Value,
        },
        storage::{DEFAULT_DATABASE, memory::MemoryBackend},
    };

    fn setup() -> Result<Session<MemoryBackend>> {
        let mut session = Session::in_memory();
        session.execute("CREATE TABLE users (id NUMBER, name STRING, age NUMBER, joined DATE)")?;
        session.execute(
            "INSERT INTO users VALUES (1, 'Alice', 30, '2024-01-15'), (2, 'Bob', 25, NULL), (3, 'Carol', 35, NULL)",
        )?;
        Ok(session)
    }

    fn rows(session: &Session<MemoryBackend>) -> Result<Vec<Vec<Value>>> {
        session.storage().get_all_rows(DEFAULT_DATABASE, "users")
    }

    #[test]
    fn test_insert() -> Result<()> {
        let mut session = setup()?;
        let result = session.execute("INSERT INTO users VALUES (4, 'Dan', 41.5, '2023/02/01')")?;
        assert_eq!(
            result,
            ResultSet::Insert {
                table_name: "users".into(),
                count: 1,
                row: Some(vec![
                    Value::Integer(4),
                    Value::String("Dan".into()),
                    Value::Float(41.5),
                    Value::Date(NaiveDate::from_ymd_opt(2023, 2, 1).ok_or(Error::Internal("date".into()))?),
                ]),
            }
        );
        assert_eq!(rows(&session)?.len(), 4);
        assert_eq!(
            rows(&session)?[0][3],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).ok_or(Error::Internal("date".into()))?)
        );
        Ok(())
    }

    #[test]
    fn test_insert_rejects_bad_rows() -> Result<()> {
        let mut session = setup()?;
        assert_eq!(
            session.execute("INSERT INTO users VALUES (1, 'x')"),
            Err(Error::Validation("Column count mismatch: expected 4 values, got 2".into()))
        );
        assert_eq!(
            session.execute("INSERT INTO users VALUES ('one', 'x', 1, NULL)"),
            Err(Error::Validation(
                "Type mismatch for column 'id': expected NUMBER, got string".into()
            ))
        );
        assert_eq!(
            session.execute("INSERT INTO users VALUES (5, 'x', 1, 'someday')"),
            Err(Error::Validation(
                "Type mismatch for column 'joined': expected DATE, got string".into()
            ))
        );

        // one bad row in a batch stores nothing
        assert!(session
            .execute("INSERT INTO users VALUES (5, 'e', 1, NULL), (6, 'f', TRUE, NULL)")
            .is_err());
        assert_eq!(rows(&session)?.len(), 3);

        assert!(session
            .execute("INSERT INTO ghosts VALUES (1)")
            .is_err_and(|e| e.is_not_found()));
        Ok(())
    }

    #[test]
    fn test_update() -> Result<()> {
        let mut session = setup()?;
        assert_eq!(
            session.execute("UPDATE users SET age = 26, name = 'Robert' WHERE name = 'Bob'")?,
            ResultSet::Update {
                table_name: "users".into(),
                count: 1
            }
        );
        assert_eq!(rows(&session)?[1][1], Value::String("Robert".into()));
        assert_eq!(rows(&session)?[1][2], Value::Integer(26));

        assert_eq!(
            session.execute("UPDATE users SET age = 0 WHERE age > 100")?,
            ResultSet::Update {
                table_name: "users".into(),
                count: 0
            }
        );
        assert_eq!(
            session.execute("UPDATE users SET age = 1")?,
            ResultSet::Update {
                table_name: "users".into(),
                count: 3
            }
        );
        Ok(())
    }

    #[test]
    fn test_update_errors() -> Result<()> {
        let mut session = setup()?;
        assert_eq!(
            session.execute("UPDATE users SET email = 'x'"),
            Err(Error::Validation("Column 'email' does not exist in table 'users'".into()))
        );
        assert_eq!(
            session.execute("UPDATE users SET age = 'old'"),
            Err(Error::Validation(
                "Type mismatch for column 'age': expected NUMBER, got string".into()
            ))
        );
        assert!(matches!(
            session.execute("UPDATE users SET age = 1, age = 2"),
            Err(Error::Validation(_))
        ));
        assert_eq!(
            session.execute("UPDATE users SET age = 1 WHERE salary > 1"),
            Err(Error::Validation("Column 'salary' does not exist in table 'users'".into()))
        );
        assert_eq!(
            session.execute("UPDATE users SET age = 1 WHERE age + 1"),
            Err(Error::Operator("+".into()))
        );
        assert_eq!(rows(&session)?[0][2], Value::Integer(30));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let mut session = setup()?;
        assert_eq!(
            session.execute("DELETE FROM users WHERE age >= 30")?,
            ResultSet::Delete {
                table_name: "users".into(),
                count: 2,
                truncated: false
            }
        );
        assert_eq!(rows(&session)?.len(), 1);

        assert_eq!(
            session.execute("DELETE FROM users")?,
            ResultSet::Delete {
                table_name: "users".into(),
                count: 1,
                truncated: true
            }
        );
        assert!(rows(&session)?.is_empty());
        assert!(session.storage().table_exists(DEFAULT_DATABASE, "users")?);
        Ok(())
    }

    #[test]
    fn test_explain_mutations() -> Result<()> {
        let actions = |sql: &str| -> Result<Vec<&'static str>> {
            Ok(explain(&parse(sql)?).steps.iter().map(|s| s.action).collect())
        };
        assert_eq!(
            actions("INSERT INTO users VALUES (1, 'a')")?,
            vec!["VALIDATE_TABLE", "VALIDATE_SCHEMA", "VALIDATE_TYPES", "BUILD_ROW", "WRITE_TO_DISK"]
        );
        assert_eq!(
            actions("UPDATE users SET a = 1 WHERE b = 2")?,
            vec!["VALIDATE_TABLE", "VALIDATE_COLUMNS", "FILTER_ROWS", "UPDATE_ROWS", "WRITE_TO_DISK"]
        );
        assert_eq!(
            actions("DELETE FROM users")?,
            vec!["VALIDATE_TABLE", "TRUNCATE", "WRITE_TO_DISK"]
        );
        assert_eq!(
            actions("DELETE FROM users WHERE a = 1")?,
            vec!["VALIDATE_TABLE", "FILTER_ROWS", "DELETE_ROWS", "WRITE_TO_DISK"]
        );
        Ok(())
    }
}
