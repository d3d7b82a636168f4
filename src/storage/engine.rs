use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::{error::Result, sql::schema::TableData};

/// Persistence backend contract.
///
/// Operates on whole tables: a table is read and written wholesale. Names
/// passed in are already lower-cased by the storage manager. Different from
/// `StorageManager`, which adds caching, existence checks and locking.
pub trait Backend {
    fn exists(&self, db: &str, table: &str) -> Result<bool>;
    fn read(&self, db: &str, table: &str) -> Result<TableData>;
    fn write(&mut self, db: &str, table: &str, data: &TableData) -> Result<()>;
    fn remove(&mut self, db: &str, table: &str) -> Result<()>;
    fn list(&self, db: &str) -> Result<BTreeSet<String>>;
    fn metadata(&self, db: &str, table: &str) -> Result<TableMetadata>;

    fn create_db(&mut self, name: &str) -> Result<()>;
    fn remove_db(&mut self, name: &str) -> Result<()>;
    fn list_dbs(&self) -> Result<BTreeSet<String>>;

    fn db_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_dbs()?.contains(name))
    }
}

/// Size and modification time of a table's durable representation
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::Backend;
    use crate::{
        error::Result,
        sql::{
            schema::{Column, TableData, TableSchema},
            types::{DataType, Value},
        },
        storage::{disk::DiskBackend, memory::MemoryBackend},
    };

    fn sample() -> TableData {
        let mut data = TableData::new(TableSchema::new(
            "users",
            vec![Column::new("id", DataType::Number), Column::new("name", DataType::String)],
        ));
        data.rows.push(vec![Value::Integer(1), Value::String("Alice".into())]);
        data
    }

    fn test_table_ops(mut backend: impl Backend) -> Result<()> {
        assert!(!backend.exists("default", "users")?);
        assert!(backend.read("default", "users").is_err());

        let data = sample();
        backend.write("default", "users", &data)?;
        assert!(backend.exists("default", "users")?);
        assert_eq!(backend.read("default", "users")?, data);
        assert!(backend.metadata("default", "users")?.size_bytes > 0);

        let mut changed = data.clone();
        changed.rows.clear();
        backend.write("default", "users", &changed)?;
        assert_eq!(backend.read("default", "users")?.rows.len(), 0);

        backend.write("default", "orders", &data)?;
        assert_eq!(
            backend.list("default")?.into_iter().collect::<Vec<_>>(),
            vec!["orders".to_string(), "users".to_string()]
        );

        backend.remove("default", "users")?;
        assert!(!backend.exists("default", "users")?);
        assert!(backend.remove("default", "users").is_err());
        Ok(())
    }

    fn test_database_ops(mut backend: impl Backend) -> Result<()> {
        assert!(backend.db_exists("default")?);
        assert!(!backend.db_exists("shop")?);

        backend.create_db("shop")?;
        assert!(backend.db_exists("shop")?);
        backend.write("shop", "items", &sample())?;
        assert!(backend.exists("shop", "items")?);
        assert!(!backend.exists("default", "items")?);

        backend.remove_db("shop")?;
        assert!(!backend.db_exists("shop")?);
        assert!(backend.write("shop", "items", &sample()).is_err());
        Ok(())
    }

    #[test]
    fn test_memory() -> Result<()> {
        test_table_ops(MemoryBackend::new())?;
        test_database_ops(MemoryBackend::new())?;
        Ok(())
    }

    #[test]
    fn test_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        test_table_ops(DiskBackend::open(dir.path().join("tables"))?)?;
        test_database_ops(DiskBackend::open(dir.path().join("dbs"))?)?;
        Ok(())
    }
}
