use tracing::{info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        executor::{self, Executor, Explanation, ResultSet},
        parser::{ast::Statement, parse},
        plan::{Analysis, ExecutionPlan, Planner},
        types::{Row, Value},
    },
    storage::{
        DEFAULT_DATABASE, StorageManager, disk::DiskBackend, engine::Backend,
        memory::MemoryBackend,
    },
};

/// SQL session for executing statements
///
/// Carries the current database; sessions sharing one `StorageManager` see
/// the same tables but switch databases independently.
pub struct Session<B: Backend> {
    storage: StorageManager<B>,
    database: String,
}

impl<B: Backend> Session<B> {
    pub fn new(storage: StorageManager<B>) -> Self {
        Self {
            storage,
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn storage(&self) -> &StorageManager<B> {
        &self.storage
    }

    pub fn current_database(&self) -> &str {
        &self.database
    }

    pub(crate) fn set_database(&mut self, name: String) {
        self.database = name;
    }

    /// Analyzes a statement without executing it
    pub fn analyze(&self, sql: &str) -> Result<Analysis> {
        Planner::new(&self.storage, &self.database).analyze(&parse(sql)?)
    }

    pub fn plan(&self, sql: &str) -> Result<ExecutionPlan> {
        Ok(Planner::new(&self.storage, &self.database).plan(&parse(sql)?))
    }

    pub fn explain(&self, sql: &str) -> Result<Explanation> {
        Ok(executor::explain(&parse(sql)?))
    }
}

impl<B: Backend + 'static> Session<B> {
    /// Executes a statement and folds the outcome into a `QueryResult`;
    /// failures are reported in the result, never returned
    pub fn execute_sql(&mut self, sql: &str) -> QueryResult {
        match self.execute(sql) {
            Ok(result) => result.into(),
            Err(err) => {
                warn!(error = %err, "statement failed");
                QueryResult::failure(err)
            }
        }
    }

    /// Executes a SQL statement
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let stmt = parse(sql)?;
        self.execute_statement(stmt)
    }

    pub fn execute_statement(&mut self, stmt: Statement) -> Result<ResultSet> {
        let query_type = stmt.query_type();
        let result = <dyn Executor<B>>::build(stmt).execute(self)?;
        match &result {
            ResultSet::Insert { count, .. }
            | ResultSet::Update { count, .. }
            | ResultSet::Delete { count, .. } => {
                info!(db = %self.database, %query_type, rows = *count, "statement executed")
            }
            ResultSet::Scan { rows, .. } => {
                info!(db = %self.database, %query_type, rows = rows.len(), "statement executed")
            }
            _ => info!(db = %self.database, %query_type, "statement executed"),
        }
        Ok(result)
    }
}

impl Session<MemoryBackend> {
    /// Session over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(StorageManager::new(MemoryBackend::new()))
    }
}

impl Session<DiskBackend> {
    /// Opens the data directory named by the config
    pub fn open(config: &Config) -> Result<Self> {
        let backend = DiskBackend::open(&config.data_dir)?;
        Ok(Self::new(StorageManager::with_cache(
            backend,
            config.cache_enabled,
        )))
    }
}

/// Outcome of `Session::execute_sql`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub success: bool,
    pub columns: Option<Vec<String>>,
    pub data: Option<Vec<Row>>,
    pub row_count: Option<usize>,
    pub updated_count: Option<usize>,
    pub deleted_count: Option<usize>,
    pub message: Option<String>,
    pub error: Option<Error>,
}

impl QueryResult {
    fn success(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            ..Default::default()
        }
    }

    fn failure(err: Error) -> Self {
        Self {
            success: false,
            error: Some(err),
            ..Default::default()
        }
    }
}

impl From<ResultSet> for QueryResult {
    fn from(result: ResultSet) -> Self {
        match result {
            ResultSet::CreateTable { table_name, .. } => {
                Self::success(format!("Table '{}' created successfully", table_name))
            }
            ResultSet::DropTable { table_name } => {
                Self::success(format!("Table '{}' dropped successfully", table_name))
            }
            ResultSet::Insert {
                table_name,
                count,
                row,
            } => {
                let noun = if count == 1 { "row" } else { "rows" };
                Self {
                    data: row.map(|row| vec![row]),
                    row_count: Some(count),
                    ..Self::success(format!("Inserted {} {} into '{}'", count, noun, table_name))
                }
            }
            ResultSet::Scan { columns, rows } => Self {
                success: true,
                columns: Some(columns),
                row_count: Some(rows.len()),
                data: Some(rows),
                ..Default::default()
            },
            ResultSet::Update { table_name, count } => Self {
                updated_count: Some(count),
                ..Self::success(format!("Updated {} rows in '{}'", count, table_name))
            },
            ResultSet::Delete {
                table_name,
                count,
                truncated,
            } => {
                let message = if truncated {
                    format!("Deleted all rows from '{}'", table_name)
                } else {
                    format!("Deleted {} rows from '{}'", count, table_name)
                };
                Self {
                    deleted_count: Some(count),
                    ..Self::success(message)
                }
            }
            ResultSet::CreateDatabase { name } => {
                Self::success(format!("Database '{}' created successfully", name))
            }
            ResultSet::DropDatabase { name } => {
                Self::success(format!("Database '{}' dropped successfully", name))
            }
            ResultSet::UseDatabase { name } => {
                Self::success(format!("Using database '{}'", name))
            }
            ResultSet::ShowDatabases { databases } => Self {
                success: true,
                columns: Some(vec!["database".into()]),
                row_count: Some(databases.len()),
                data: Some(
                    databases
                        .into_iter()
                        .map(|name| vec![Value::String(name)])
                        .collect(),
                ),
                ..Default::default()
            },
            ResultSet::ShowTables { tables, .. } => Self {
                success: true,
                columns: Some(vec!["table".into()]),
                row_count: Some(tables.len()),
                data: Some(
                    tables
                        .into_iter()
                        .map(|name| vec![Value::String(name)])
                        .collect(),
                ),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{QueryResult, Session};
    use crate::{
        config::Config,
        error::{Error, Result},
        sql::types::Value,
        storage::{DEFAULT_DATABASE, StorageManager, memory::MemoryBackend},
    };

    fn users() -> Session<MemoryBackend> {
        let mut session = Session::in_memory();
        session.execute_sql("CREATE TABLE users (id NUMBER, name STRING, age NUMBER)");
        session.execute_sql("INSERT INTO users VALUES (1,'Alice',30)");
        session.execute_sql("INSERT INTO users VALUES (2,'Bob',25)");
        session
    }

    fn names(result: &QueryResult) -> Vec<Value> {
        result
            .data
            .iter()
            .flatten()
            .map(|row| row[1].clone())
            .collect()
    }

    #[test]
    fn test_scenario_create() -> Result<()> {
        let mut session = Session::in_memory();
        let result = session.execute_sql("CREATE TABLE users (id NUMBER, name STRING, age NUMBER)");
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("Table 'users' created successfully"));
        assert!(session.storage().table_exists(DEFAULT_DATABASE, "users")?);
        assert_eq!(
            session.storage().column_names(DEFAULT_DATABASE, "users")?,
            vec!["id", "name", "age"]
        );
        Ok(())
    }

    #[test]
    fn test_scenario_insert_select() {
        let mut session = users();
        let result = session.execute_sql("SELECT * FROM users WHERE age > 25");
        assert!(result.success);
        assert_eq!(result.row_count, Some(1));
        assert_eq!(names(&result), vec![Value::String("Alice".into())]);

        let result = session.execute_sql("INSERT INTO users VALUES (3, 'Carol', 41)");
        assert_eq!(result.message.as_deref(), Some("Inserted 1 row into 'users'"));
        assert_eq!(
            result.data,
            Some(vec![vec![
                Value::Integer(3),
                Value::String("Carol".into()),
                Value::Integer(41)
            ]])
        );
    }

    #[test]
    fn test_scenario_update() {
        let mut session = users();
        let result = session.execute_sql("UPDATE users SET age = 26 WHERE name = 'Bob'");
        assert_eq!(result.updated_count, Some(1));
        assert_eq!(result.message.as_deref(), Some("Updated 1 rows in 'users'"));

        let result = session.execute_sql("SELECT age FROM users WHERE name='Bob'");
        assert_eq!(result.data, Some(vec![vec![Value::Integer(26)]]));

        // matched rows count even when the value is unchanged
        let result = session.execute_sql("UPDATE users SET age = 26 WHERE name = 'Bob'");
        assert_eq!(result.updated_count, Some(1));
    }

    #[test]
    fn test_scenario_delete_nothing() {
        let mut session = users();
        let result = session.execute_sql("DELETE FROM users WHERE age < 25");
        assert!(result.success);
        assert_eq!(result.deleted_count, Some(0));
        assert_eq!(session.execute_sql("SELECT * FROM users").row_count, Some(2));
    }

    #[test]
    fn test_scenario_left_to_right() {
        let mut session = users();
        let result =
            session.execute_sql("SELECT * FROM users WHERE age >= 25 AND name = 'Bob' OR age = 30");
        assert_eq!(
            names(&result),
            vec![Value::String("Alice".into()), Value::String("Bob".into())]
        );
    }

    #[test]
    fn test_scenario_count_mismatch() {
        let mut session = users();
        let result = session.execute_sql("INSERT INTO users VALUES (3, 'X')");
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(Error::Validation(
                "Column count mismatch: expected 3 values, got 2".into()
            ))
        );
        assert_eq!(session.execute_sql("SELECT * FROM users").row_count, Some(2));
    }

    #[test]
    fn test_delete_then_select_is_empty() {
        let mut session = users();
        session.execute_sql("INSERT INTO users VALUES (3, 'Carol', 35), (4, 'Dan', 19)");
        let before = session.execute_sql("SELECT * FROM users").row_count;

        let cond = "age > 20 AND age < 31 OR name = 'Dan'";
        let result = session.execute_sql(&format!("DELETE FROM users WHERE {}", cond));
        let after = session.execute_sql("SELECT * FROM users").row_count;
        assert_eq!(result.deleted_count, Some(3));
        assert_eq!(before.zip(after).map(|(b, a)| b - a), result.deleted_count);
        assert_eq!(
            session
                .execute_sql(&format!("SELECT * FROM users WHERE {}", cond))
                .row_count,
            Some(0)
        );

        let result = session.execute_sql("DELETE FROM users");
        assert_eq!(result.message.as_deref(), Some("Deleted all rows from 'users'"));
        assert_eq!(result.deleted_count, Some(1));
    }

    #[test]
    fn test_failures_are_reported() {
        let mut session = users();
        let result = session.execute_sql("SELECT * FROM");
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(Error::syntax("IDENTIFIER", "end of input", 13))
        );

        let result = session.execute_sql("SELECT * FROM orders");
        assert!(result.error.is_some_and(|e| e.is_not_found()));

        let result = session.execute_sql("DELETE FROM users WHERE age % 2");
        assert_eq!(result.error, Some(Error::Operator("%".into())));
    }

    #[test]
    fn test_diagnostics() -> Result<()> {
        let session = users();
        let analysis = session.analyze("SELECT name FROM users WHERE age > 1")?;
        assert_eq!(analysis.estimated_cost, Some(12));
        assert_eq!(session.plan("SELECT name FROM users WHERE age > 1")?.steps.len(), 3);
        assert_eq!(session.explain("SELECT name FROM users WHERE age > 1")?.steps.len(), 3);
        assert!(session.analyze("SELECT FROM").is_err());
        Ok(())
    }

    #[test]
    fn test_databases_are_per_session() -> Result<()> {
        let storage = StorageManager::new(MemoryBackend::new());
        let mut first = Session::new(storage.clone());
        let mut second = Session::new(storage);

        assert!(first.execute_sql("CREATE DATABASE shop").success);
        assert!(first.execute_sql("USE shop").success);
        first.execute_sql("CREATE TABLE items (name TEXT)");
        assert_eq!(first.current_database(), "shop");
        assert_eq!(second.current_database(), DEFAULT_DATABASE);

        let result = second.execute_sql("SHOW TABLES");
        assert_eq!(result.row_count, Some(0));
        let result = second.execute_sql("SHOW DATABASES");
        assert_eq!(result.row_count, Some(2));
        Ok(())
    }

    #[test]
    fn test_concurrent_sessions() -> Result<()> {
        let storage = StorageManager::with_cache(MemoryBackend::new(), true);
        let mut session = Session::new(storage.clone());
        session.execute("CREATE TABLE counters (n NUMBER)")?;

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mut session = Session::new(storage.clone());
                thread::spawn(move || {
                    for i in 0..20 {
                        let result = session
                            .execute_sql(&format!("INSERT INTO counters VALUES ({})", t * 100 + i));
                        assert!(result.success);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .map_err(|_| Error::Internal("thread panicked".into()))?;
        }
        assert_eq!(session.execute_sql("SELECT * FROM counters").row_count, Some(80));
        Ok(())
    }

    #[test]
    fn test_open_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            cache_enabled: true,
        };
        {
            let mut session = Session::open(&config)?;
            session.execute("CREATE TABLE notes (body TEXT, at DATE)")?;
            session.execute("INSERT INTO notes VALUES ('hi', '2024-03-01')")?;
            assert!(session.storage().cache_enabled());
        }

        let mut session = Session::open(&config)?;
        let result = session.execute_sql("SELECT body FROM notes WHERE at > '2024-01-01'");
        assert_eq!(result.data, Some(vec![vec![Value::String("hi".into())]]));
        Ok(())
    }
}
