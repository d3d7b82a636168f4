use tracing::info;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Session,
        executor::{Executor, Explanation, ResultSet},
        parser::ast::{self, Statement},
        schema::{Column, TableSchema},
    },
    storage::{DEFAULT_DATABASE, engine::Backend},
};

/// CREATE TABLE executor
pub struct CreateTable {
    table_name: String,
    columns: Vec<ast::Column>,
}

impl CreateTable {
    pub fn new(table_name: String, columns: Vec<ast::Column>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
        })
    }
}

impl<B: Backend> Executor<B> for CreateTable {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database().to_string();
        let storage = session.storage();
        let lock = storage.lock_table(&db, &self.table_name);
        let _guard = lock.lock();

        if storage.table_exists(&db, &self.table_name)? {
            return Err(Error::Validation(format!(
                "Table '{}' already exists",
                self.table_name
            )));
        }

        let schema = TableSchema::new(
            &self.table_name,
            self.columns
                .into_iter()
                .map(|c| Column::new(c.name, c.datatype))
                .collect(),
        );
        schema.validate()?;
        storage.create_table(&db, schema.clone())?;

        Ok(ResultSet::CreateTable {
            table_name: schema.table_name,
            columns: schema.columns,
        })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    table_name: String,
}

impl DropTable {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl<B: Backend> Executor<B> for DropTable {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database().to_string();
        let storage = session.storage();
        let lock = storage.lock_table(&db, &self.table_name);
        let _guard = lock.lock();

        storage.delete_table(&db, &self.table_name)?;
        Ok(ResultSet::DropTable {
            table_name: self.table_name.to_lowercase(),
        })
    }
}

pub struct CreateDatabase {
    name: String,
}

impl CreateDatabase {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl<B: Backend> Executor<B> for CreateDatabase {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        session.storage().create_database(&self.name)?;
        Ok(ResultSet::CreateDatabase {
            name: self.name.to_lowercase(),
        })
    }
}

/// DROP DATABASE executor, falls back to the default database when the
/// session's current one is dropped
pub struct DropDatabase {
    name: String,
}

impl DropDatabase {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl<B: Backend> Executor<B> for DropDatabase {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let name = self.name.to_lowercase();
        session.storage().drop_database(&name)?;
        if session.current_database() == name {
            info!(db = %name, "current database dropped, switching to default");
            session.set_database(DEFAULT_DATABASE.to_string());
        }
        Ok(ResultSet::DropDatabase { name })
    }
}

pub struct UseDatabase {
    name: String,
}

impl UseDatabase {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl<B: Backend> Executor<B> for UseDatabase {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let name = session.storage().use_database(&self.name)?;
        session.set_database(name.clone());
        Ok(ResultSet::UseDatabase { name })
    }
}

pub struct ShowDatabases;

impl ShowDatabases {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl<B: Backend> Executor<B> for ShowDatabases {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        Ok(ResultSet::ShowDatabases {
            databases: session.storage().list_databases()?,
        })
    }
}

pub struct ShowTables;

impl ShowTables {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl<B: Backend> Executor<B> for ShowTables {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let database = session.current_database().to_string();
        let tables = session.storage().list_all_tables(&database)?;
        Ok(ResultSet::ShowTables { database, tables })
    }
}

pub(super) fn explain_create(stmt: &Statement, explanation: &mut Explanation) {
    let Statement::CreateTable {
        table_name,
        columns,
    } = stmt
    else {
        return;
    };
    let types: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.datatype))
        .collect();

    explanation.step(
        "VALIDATE_TABLE_NAME",
        format!("Check that table name '{}' is valid and unused", table_name),
    );
    explanation.step(
        "VALIDATE_COLUMNS",
        format!("Validate {} column definitions", columns.len()),
    );
    explanation.step("CHECK_TYPES", format!("Verify column types: {}", types.join(", ")));
    explanation.step("CHECK_DUPLICATES", "Ensure column names are unique".into());
    explanation.step(
        "CREATE_SCHEMA",
        format!("Build schema for table '{}'", table_name),
    );
    explanation.step(
        "WRITE_TO_DISK",
        format!("Write table file for '{}'", table_name),
    );
}

pub(super) fn explain_admin(stmt: &Statement, explanation: &mut Explanation) {
    match stmt {
        Statement::DropTable { table_name } => {
            explanation.step(
                "VALIDATE_TABLE",
                format!("Check that table '{}' exists", table_name),
            );
            explanation.step(
                "REMOVE_FILE",
                format!("Delete table file for '{}'", table_name),
            );
        }
        Statement::CreateDatabase { database } => {
            explanation.step(
                "CREATE_DATABASE",
                format!("Create database directory '{}'", database),
            );
        }
        Statement::DropDatabase { database } => {
            explanation.step(
                "DROP_DATABASE",
                format!("Remove database '{}' and all its tables", database),
            );
        }
        Statement::Use { database } => {
            explanation.step(
                "SWITCH_DATABASE",
                format!("Make '{}' the current database", database),
            );
        }
        Statement::ShowDatabases => {
            explanation.step("LIST_DATABASES", "List all databases".into());
        }
        Statement::ShowTables => {
            explanation.step("LIST_TABLES", "List tables in the current database".into());
        }
        _ => {}
    }
}
