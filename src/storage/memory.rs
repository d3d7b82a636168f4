use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    sql::schema::TableData,
    storage::{
        DEFAULT_DATABASE,
        engine::{Backend, TableMetadata},
    },
};

/// In-memory backend.
///
/// Tables are kept bincode-encoded, so every read yields an independent
/// copy just like reading a file would.
pub struct MemoryBackend {
    databases: BTreeMap<String, BTreeMap<String, StoredTable>>,
}

struct StoredTable {
    bytes: Vec<u8>,
    modified_at: DateTime<Utc>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut databases = BTreeMap::new();
        databases.insert(DEFAULT_DATABASE.to_string(), BTreeMap::new());
        Self { databases }
    }

    fn stored(&self, db: &str, table: &str) -> Result<&StoredTable> {
        self.databases
            .get(db)
            .and_then(|tables| tables.get(table))
            .ok_or_else(|| Error::NotFound(format!("Table '{}' does not exist", table)))
    }

    fn database_mut(&mut self, db: &str) -> Result<&mut BTreeMap<String, StoredTable>> {
        self.databases
            .get_mut(db)
            .ok_or_else(|| Error::NotFound(format!("Database '{}' does not exist", db)))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn exists(&self, db: &str, table: &str) -> Result<bool> {
        Ok(self
            .databases
            .get(db)
            .is_some_and(|tables| tables.contains_key(table)))
    }

    fn read(&self, db: &str, table: &str) -> Result<TableData> {
        Ok(bincode::deserialize(&self.stored(db, table)?.bytes)?)
    }

    fn write(&mut self, db: &str, table: &str, data: &TableData) -> Result<()> {
        let bytes = bincode::serialize(data)?;
        self.database_mut(db)?.insert(
            table.to_string(),
            StoredTable {
                bytes,
                modified_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn remove(&mut self, db: &str, table: &str) -> Result<()> {
        self.database_mut(db)?
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Table '{}' does not exist", table)))
    }

    fn list(&self, db: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .databases
            .get(db)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn metadata(&self, db: &str, table: &str) -> Result<TableMetadata> {
        let stored = self.stored(db, table)?;
        Ok(TableMetadata {
            size_bytes: stored.bytes.len() as u64,
            modified_at: stored.modified_at,
        })
    }

    fn create_db(&mut self, name: &str) -> Result<()> {
        self.databases.entry(name.to_string()).or_default();
        Ok(())
    }

    fn remove_db(&mut self, name: &str) -> Result<()> {
        self.databases
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Database '{}' does not exist", name)))
    }

    fn list_dbs(&self) -> Result<BTreeSet<String>> {
        Ok(self.databases.keys().cloned().collect())
    }
}
