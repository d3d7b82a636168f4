use std::{
    collections::BTreeSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::schema::TableData,
    storage::{
        DEFAULT_DATABASE,
        engine::{Backend, TableMetadata},
    },
};

const TABLE_EXTENSION: &str = "tbl";

/// File-per-table backend.
///
/// Layout: `<root>/<database>/<table>.tbl`, each file one bincode-encoded
/// `TableData`. Writes go to a temporary file in the same directory which is
/// then renamed over the target, so a table file is always complete.
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    /// Opens the data directory, creating it and the default database if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(DEFAULT_DATABASE))?;
        debug!(root = %root.display(), "opened disk backend");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn db_path(&self, db: &str) -> Result<PathBuf> {
        Ok(self.root.join(checked_name(db)?))
    }

    fn table_path(&self, db: &str, table: &str) -> Result<PathBuf> {
        Ok(self
            .db_path(db)?
            .join(format!("{}.{}", checked_name(table)?, TABLE_EXTENSION)))
    }

    fn missing_table(table: &str) -> Error {
        Error::NotFound(format!("Table '{}' does not exist", table))
    }
}

// Names become path components and must stay inside the data directory
fn checked_name(name: &str) -> Result<&str> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(Error::Validation(format!("Invalid name '{}'", name)));
    }
    Ok(name)
}

impl Backend for DiskBackend {
    fn exists(&self, db: &str, table: &str) -> Result<bool> {
        Ok(self.table_path(db, table)?.is_file())
    }

    fn read(&self, db: &str, table: &str) -> Result<TableData> {
        let path = self.table_path(db, table)?;
        if !path.is_file() {
            return Err(Self::missing_table(table));
        }
        let bytes = fs::read(&path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    fn write(&mut self, db: &str, table: &str, data: &TableData) -> Result<()> {
        let dir = self.db_path(db)?;
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("Database '{}' does not exist", db)));
        }
        let bytes = bincode::serialize(data)?;
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(self.table_path(db, table)?)?;
        debug!(db, table, bytes = bytes.len(), "wrote table file");
        Ok(())
    }

    fn remove(&mut self, db: &str, table: &str) -> Result<()> {
        let path = self.table_path(db, table)?;
        if !path.is_file() {
            return Err(Self::missing_table(table));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn list(&self, db: &str) -> Result<BTreeSet<String>> {
        let dir = self.db_path(db)?;
        if !dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let mut tables = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == TABLE_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.insert(stem.to_string());
                }
            }
        }
        Ok(tables)
    }

    fn metadata(&self, db: &str, table: &str) -> Result<TableMetadata> {
        let path = self.table_path(db, table)?;
        if !path.is_file() {
            return Err(Self::missing_table(table));
        }
        let meta = fs::metadata(path)?;
        Ok(TableMetadata {
            size_bytes: meta.len(),
            modified_at: DateTime::<Utc>::from(meta.modified()?),
        })
    }

    fn create_db(&mut self, name: &str) -> Result<()> {
        fs::create_dir_all(self.db_path(name)?)?;
        Ok(())
    }

    fn remove_db(&mut self, name: &str) -> Result<()> {
        let dir = self.db_path(name)?;
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("Database '{}' does not exist", name)));
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn list_dbs(&self) -> Result<BTreeSet<String>> {
        let mut dbs = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    dbs.insert(name.to_string());
                }
            }
        }
        Ok(dbs)
    }
}

#[cfg(test)]
mod tests {
    use super::DiskBackend;
    use crate::{
        error::{Error, Result},
        sql::schema::{Column, TableData, TableSchema},
        sql::types::DataType,
        storage::engine::Backend,
    };

    #[test]
    fn test_reopen_keeps_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let data = TableData::new(TableSchema::new(
            "events",
            vec![Column::new("at", DataType::Date)],
        ));
        {
            let mut backend = DiskBackend::open(dir.path())?;
            backend.write("default", "events", &data)?;
        }

        let backend = DiskBackend::open(dir.path())?;
        assert_eq!(backend.read("default", "events")?, data);
        assert!(dir.path().join("default").join("events.tbl").is_file());
        Ok(())
    }

    #[test]
    fn test_rejects_path_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("data");
        let mut backend = DiskBackend::open(&root)?;
        let data = TableData::new(TableSchema::new("t", vec![Column::new("a", DataType::Text)]));

        for name in ["../escape", "a/b", "..", "", "a\\b"] {
            assert!(matches!(
                backend.write("default", name, &data),
                Err(Error::Validation(_))
            ));
            assert!(matches!(backend.create_db(name), Err(Error::Validation(_))));
        }
        assert!(backend.exists("..", "default").is_err());
        assert!(!dir.path().join("escape.tbl").exists());
        assert_eq!(backend.list_dbs()?.into_iter().collect::<Vec<_>>(), vec!["default".to_string()]);
        Ok(())
    }

    #[test]
    fn test_list_ignores_stray_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = DiskBackend::open(dir.path())?;
        std::fs::write(dir.path().join("default").join("notes.txt"), b"x")?;
        assert!(backend.list("default")?.is_empty());
        assert!(backend.list("missing")?.is_empty());
        Ok(())
    }
}
