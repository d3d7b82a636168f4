use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    sql::{
        schema::{TableData, TableSchema},
        types::Row,
    },
};

use self::{cache::TableCache, engine::Backend};

pub mod cache;
pub mod disk;
pub mod engine;
pub mod memory;

/// Database every session starts in; it always exists and cannot be dropped
pub const DEFAULT_DATABASE: &str = "default";

/// Summary of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    pub table_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Table-level storage manager
///
/// Wraps a `Backend` with name normalization, the table cache and per-table
/// write locks. Cloning shares all of them. Every mutation holds the backend
/// lock across read, modify, write and cache eviction, so concurrent
/// mutations of one table never lose updates.
pub struct StorageManager<B: Backend> {
    backend: Arc<Mutex<B>>,
    cache: Arc<Mutex<TableCache>>,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<B: Backend> Clone for StorageManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            cache: self.cache.clone(),
            locks: self.locks.clone(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn table_not_found(table: &str) -> Error {
    Error::NotFound(format!("Table '{}' does not exist", table))
}

fn database_not_found(db: &str) -> Error {
    Error::NotFound(format!("Database '{}' does not exist", db))
}

impl<B: Backend> StorageManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_cache(backend, false)
    }

    pub fn with_cache(backend: B, cache_enabled: bool) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            cache: Arc::new(Mutex::new(TableCache::new(cache_enabled))),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the write lock for a table, created on first use.
    ///
    /// Locks no caller holds any more are dropped from the map here, so
    /// dropped or never-created tables don't accumulate entries.
    pub fn lock_table(&self, db: &str, table: &str) -> Arc<Mutex<()>> {
        let key = format!("{}.{}", normalize(db), normalize(table));
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn table_exists(&self, db: &str, table: &str) -> Result<bool> {
        self.backend.lock().exists(&normalize(db), &normalize(table))
    }

    /// Reads a whole table, served from the cache when enabled
    pub fn get_table(&self, db: &str, table: &str) -> Result<TableData> {
        let (db, table) = (normalize(db), normalize(table));
        let cached = self.cache.lock().get(&db, &table);
        if let Some(data) = cached {
            debug!(db = %db, table = %table, "table cache hit");
            return Ok(data);
        }

        let backend = self.backend.lock();
        if !backend.exists(&db, &table)? {
            return Err(table_not_found(&table));
        }
        debug!(db = %db, table = %table, "reading table");
        let data = backend.read(&db, &table)?;
        self.cache.lock().put(&db, &table, data.clone());
        Ok(data)
    }

    pub fn get_schema(&self, db: &str, table: &str) -> Result<TableSchema> {
        Ok(self.get_table(db, table)?.schema)
    }

    pub fn get_all_rows(&self, db: &str, table: &str) -> Result<Vec<Row>> {
        Ok(self.get_table(db, table)?.rows)
    }

    pub fn column_names(&self, db: &str, table: &str) -> Result<Vec<String>> {
        Ok(self.get_schema(db, table)?.column_names())
    }

    pub fn row_count(&self, db: &str, table: &str) -> Result<usize> {
        Ok(self.get_table(db, table)?.rows.len())
    }

    pub fn get_table_stats(&self, db: &str, table: &str) -> Result<TableStats> {
        let data = self.get_table(db, table)?;
        let meta = self
            .backend
            .lock()
            .metadata(&normalize(db), &data.schema.table_name)?;
        Ok(TableStats {
            row_count: data.rows.len(),
            column_count: data.schema.columns.len(),
            size_bytes: meta.size_bytes,
            created_at: data.schema.created_at,
            last_modified: meta.modified_at,
            table_name: data.schema.table_name,
        })
    }

    pub fn get_all_tables_stats(&self, db: &str) -> Result<Vec<TableStats>> {
        self.list_all_tables(db)?
            .iter()
            .map(|table| self.get_table_stats(db, table))
            .collect()
    }

    pub fn list_all_tables(&self, db: &str) -> Result<Vec<String>> {
        let db = normalize(db);
        let backend = self.backend.lock();
        if !backend.db_exists(&db)? {
            return Err(database_not_found(&db));
        }
        Ok(backend.list(&db)?.into_iter().collect())
    }

    pub fn create_table(&self, db: &str, schema: TableSchema) -> Result<()> {
        let db = normalize(db);
        let table = schema.table_name.clone();
        let mut backend = self.backend.lock();
        if !backend.db_exists(&db)? {
            return Err(database_not_found(&db));
        }
        if backend.exists(&db, &table)? {
            return Err(Error::Validation(format!("Table '{}' already exists", table)));
        }
        let written = backend.write(&db, &table, &TableData::new(schema));
        self.cache.lock().evict(&db, &table);
        written?;
        info!(db = %db, table = %table, "created table");
        Ok(())
    }

    pub fn delete_table(&self, db: &str, table: &str) -> Result<()> {
        let (db, table) = (normalize(db), normalize(table));
        let mut backend = self.backend.lock();
        if !backend.exists(&db, &table)? {
            return Err(table_not_found(&table));
        }
        let removed = backend.remove(&db, &table);
        self.cache.lock().evict(&db, &table);
        removed?;
        info!(db = %db, table = %table, "dropped table");
        Ok(())
    }

    /// Appends a row, returns the new row count
    pub fn insert_row(&self, db: &str, table: &str, row: Row) -> Result<usize> {
        self.modify(db, table, |data| {
            data.rows.push(row);
            Ok(data.rows.len())
        })
    }

    /// Appends several rows with a single write, returns the new row count
    pub fn insert_rows(&self, db: &str, table: &str, rows: Vec<Row>) -> Result<usize> {
        if rows.is_empty() {
            return Err(Error::Validation("Rows must be a non-empty array".into()));
        }
        self.modify(db, table, |data| {
            data.rows.extend(rows);
            Ok(data.rows.len())
        })
    }

    /// Replaces every row matching `predicate` with `transform(row)`, returns
    /// the number of rows replaced
    pub fn update_rows(
        &self,
        db: &str,
        table: &str,
        mut predicate: impl FnMut(&Row) -> Result<bool>,
        mut transform: impl FnMut(&Row) -> Result<Row>,
    ) -> Result<usize> {
        self.modify(db, table, |data| {
            let mut count = 0;
            for row in data.rows.iter_mut() {
                if predicate(row)? {
                    *row = transform(row)?;
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    /// Removes every row matching `predicate`, returns the number removed
    pub fn delete_rows(
        &self,
        db: &str,
        table: &str,
        mut predicate: impl FnMut(&Row) -> Result<bool>,
    ) -> Result<usize> {
        self.modify(db, table, |data| {
            let before = data.rows.len();
            let mut kept = Vec::with_capacity(before);
            for row in std::mem::take(&mut data.rows) {
                if !predicate(&row)? {
                    kept.push(row);
                }
            }
            data.rows = kept;
            Ok(before - data.rows.len())
        })
    }

    /// Removes all rows, returns the number removed
    pub fn truncate_table(&self, db: &str, table: &str) -> Result<usize> {
        self.modify(db, table, |data| {
            let count = data.rows.len();
            data.rows.clear();
            Ok(count)
        })
    }

    // Read, modify and write one table under the backend lock. Nothing is
    // written when `f` fails; the cache entry is evicted either way.
    fn modify<T>(
        &self,
        db: &str,
        table: &str,
        f: impl FnOnce(&mut TableData) -> Result<T>,
    ) -> Result<T> {
        let (db, table) = (normalize(db), normalize(table));
        let mut backend = self.backend.lock();
        if !backend.exists(&db, &table)? {
            return Err(table_not_found(&table));
        }
        let mut data = backend.read(&db, &table)?;
        let out = f(&mut data)?;
        let written = backend.write(&db, &table, &data);
        self.cache.lock().evict(&db, &table);
        written?;
        debug!(db = %db, table = %table, rows = data.rows.len(), "wrote table");
        Ok(out)
    }

    pub fn database_exists(&self, name: &str) -> Result<bool> {
        self.backend.lock().db_exists(&normalize(name))
    }

    pub fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.backend.lock().list_dbs()?.into_iter().collect())
    }

    pub fn create_database(&self, name: &str) -> Result<()> {
        let name = normalize(name);
        let mut backend = self.backend.lock();
        if backend.db_exists(&name)? {
            return Err(Error::Validation(format!("Database '{}' already exists", name)));
        }
        backend.create_db(&name)?;
        info!(db = %name, "created database");
        Ok(())
    }

    pub fn drop_database(&self, name: &str) -> Result<()> {
        let name = normalize(name);
        if name == DEFAULT_DATABASE {
            return Err(Error::Validation(format!(
                "Cannot drop the '{}' database",
                DEFAULT_DATABASE
            )));
        }
        let mut backend = self.backend.lock();
        if !backend.db_exists(&name)? {
            return Err(database_not_found(&name));
        }
        let removed = backend.remove_db(&name);
        self.cache.lock().clear();
        removed?;
        info!(db = %name, "dropped database");
        Ok(())
    }

    /// Checks that a database exists and clears the cache, returns the
    /// normalized name to switch to
    pub fn use_database(&self, name: &str) -> Result<String> {
        let name = normalize(name);
        if !self.backend.lock().db_exists(&name)? {
            return Err(database_not_found(&name));
        }
        self.cache.lock().clear();
        debug!(db = %name, "switched database");
        Ok(name)
    }

    pub fn enable_cache(&self) {
        self.cache.lock().enable();
    }

    pub fn disable_cache(&self) {
        self.cache.lock().disable();
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.lock().is_enabled()
    }

    pub fn cached_tables(&self) -> usize {
        self.cache.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{DEFAULT_DATABASE, StorageManager};
    use crate::{
        error::{Error, Result},
        sql::{
            schema::{Column, TableSchema},
            types::{DataType, Value},
        },
        storage::{disk::DiskBackend, memory::MemoryBackend},
    };

    fn users() -> TableSchema {
        TableSchema::new(
            "Users",
            vec![Column::new("id", DataType::Number), Column::new("name", DataType::String)],
        )
    }

    fn row(id: i64, name: &str) -> Vec<Value> {
        vec![Value::Integer(id), Value::String(name.into())]
    }

    #[test]
    fn test_table_lifecycle() -> Result<()> {
        let storage = StorageManager::new(MemoryBackend::new());
        storage.create_table(DEFAULT_DATABASE, users())?;
        assert!(storage.table_exists(DEFAULT_DATABASE, "USERS")?);
        assert_eq!(
            storage.create_table(DEFAULT_DATABASE, users()),
            Err(Error::Validation("Table 'users' already exists".into()))
        );

        assert_eq!(storage.insert_row(DEFAULT_DATABASE, "users", row(1, "Alice"))?, 1);
        assert_eq!(
            storage.insert_rows(DEFAULT_DATABASE, "users", vec![row(2, "Bob"), row(3, "Carol")])?,
            3
        );
        assert!(storage.insert_rows(DEFAULT_DATABASE, "users", vec![]).is_err());

        let updated = storage.update_rows(
            DEFAULT_DATABASE,
            "users",
            |r| Ok(r[0] == Value::Integer(2)),
            |r| {
                let mut r = r.clone();
                r[1] = Value::String("Robert".into());
                Ok(r)
            },
        )?;
        assert_eq!(updated, 1);
        assert_eq!(storage.get_all_rows(DEFAULT_DATABASE, "users")?[1], row(2, "Robert"));

        let deleted = storage.delete_rows(DEFAULT_DATABASE, "users", |r| {
            Ok(r[0] == Value::Integer(1))
        })?;
        assert_eq!(deleted, 1);
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 2);

        let stats = storage.get_table_stats(DEFAULT_DATABASE, "users")?;
        assert_eq!((stats.row_count, stats.column_count), (2, 2));
        assert!(stats.size_bytes > 0);

        assert_eq!(storage.truncate_table(DEFAULT_DATABASE, "users")?, 2);
        assert_eq!(storage.list_all_tables(DEFAULT_DATABASE)?, vec!["users".to_string()]);

        storage.delete_table(DEFAULT_DATABASE, "users")?;
        assert!(storage.get_table(DEFAULT_DATABASE, "users").is_err_and(|e| e.is_not_found()));
        Ok(())
    }

    #[test]
    fn test_failed_mutation_writes_nothing() -> Result<()> {
        let storage = StorageManager::new(MemoryBackend::new());
        storage.create_table(DEFAULT_DATABASE, users())?;
        storage.insert_rows(DEFAULT_DATABASE, "users", vec![row(1, "a"), row(2, "b")])?;

        let result = storage.delete_rows(DEFAULT_DATABASE, "users", |r| {
            if r[0] == Value::Integer(2) {
                Err(Error::Operator("+".into()))
            } else {
                Ok(true)
            }
        });
        assert!(result.is_err());
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 2);
        Ok(())
    }

    #[test]
    fn test_cache_invalidation() -> Result<()> {
        let storage = StorageManager::with_cache(MemoryBackend::new(), true);
        storage.create_table(DEFAULT_DATABASE, users())?;
        storage.get_table(DEFAULT_DATABASE, "users")?;
        assert_eq!(storage.cached_tables(), 1);

        storage.insert_row(DEFAULT_DATABASE, "users", row(1, "Alice"))?;
        assert_eq!(storage.cached_tables(), 0);
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 1);
        assert_eq!(storage.cached_tables(), 1);

        storage.disable_cache();
        assert_eq!(storage.cached_tables(), 0);
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 1);
        assert_eq!(storage.cached_tables(), 0);
        Ok(())
    }

    #[test]
    fn test_databases() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = StorageManager::with_cache(DiskBackend::open(dir.path())?, true);
        storage.create_database("Shop")?;
        assert!(matches!(storage.create_database("shop"), Err(Error::Validation(_))));
        assert_eq!(storage.list_databases()?, vec!["default".to_string(), "shop".to_string()]);

        storage.create_table("shop", users())?;
        storage.create_table(DEFAULT_DATABASE, users())?;
        storage.insert_row("shop", "users", row(1, "Alice"))?;
        assert_eq!(storage.row_count("shop", "users")?, 1);
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 0);

        assert_eq!(storage.use_database("SHOP")?, "shop");
        assert!(storage.use_database("nope").is_err_and(|e| e.is_not_found()));

        assert!(matches!(storage.drop_database(DEFAULT_DATABASE), Err(Error::Validation(_))));
        storage.drop_database("shop")?;
        assert!(!storage.database_exists("shop")?);
        assert!(storage.drop_database("shop").is_err_and(|e| e.is_not_found()));
        assert!(storage.get_table("shop", "users").is_err());
        Ok(())
    }

    #[test]
    fn test_unused_locks_are_dropped() -> Result<()> {
        let storage = StorageManager::new(MemoryBackend::new());
        storage.create_table(DEFAULT_DATABASE, users())?;

        let held = storage.lock_table(DEFAULT_DATABASE, "users");
        for i in 0..10 {
            drop(storage.lock_table(DEFAULT_DATABASE, &format!("ghost{}", i)));
        }
        assert_eq!(storage.lock_count(), 2);

        // the same table always maps to the same lock while it is held
        let again = storage.lock_table(DEFAULT_DATABASE, "USERS");
        assert!(std::sync::Arc::ptr_eq(&held, &again));

        drop(held);
        drop(again);
        drop(storage.lock_table(DEFAULT_DATABASE, "other"));
        assert_eq!(storage.lock_count(), 1);
        Ok(())
    }

    #[test]
    fn test_concurrent_inserts() -> Result<()> {
        let storage = StorageManager::new(MemoryBackend::new());
        storage.create_table(DEFAULT_DATABASE, users())?;

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let storage = storage.clone();
                thread::spawn(move || -> Result<()> {
                    for i in 0..25 {
                        storage.insert_row(DEFAULT_DATABASE, "users", row(t * 100 + i, "x"))?;
                    }
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            handle.join().map_err(|_| Error::Internal("thread panicked".into()))??;
        }
        assert_eq!(storage.row_count(DEFAULT_DATABASE, "users")?, 200);
        Ok(())
    }
}
