use std::collections::HashMap;

use crate::sql::schema::TableData;

/// Table cache keyed by (database, table).
///
/// Holds whole tables. Disabled caches never store anything; disabling clears
/// existing entries.
#[derive(Debug, Default)]
pub struct TableCache {
    enabled: bool,
    entries: HashMap<(String, String), TableData>,
}

impl TableCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.entries.clear();
    }

    pub fn get(&self, db: &str, table: &str) -> Option<TableData> {
        if !self.enabled {
            return None;
        }
        self.entries
            .get(&(db.to_string(), table.to_string()))
            .cloned()
    }

    pub fn put(&mut self, db: &str, table: &str, data: TableData) {
        if self.enabled {
            self.entries.insert((db.to_string(), table.to_string()), data);
        }
    }

    /// Drops one entry, returns whether it was present
    pub fn evict(&mut self, db: &str, table: &str) -> bool {
        self.entries
            .remove(&(db.to_string(), table.to_string()))
            .is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::TableCache;
    use crate::sql::{
        schema::{Column, TableData, TableSchema},
        types::DataType,
    };

    fn table(name: &str) -> TableData {
        TableData::new(TableSchema::new(name, vec![Column::new("id", DataType::Integer)]))
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let mut cache = TableCache::new(false);
        cache.put("default", "users", table("users"));
        assert!(cache.is_empty());
        assert_eq!(cache.get("default", "users"), None);
    }

    #[test]
    fn test_entries_are_per_database() {
        let mut cache = TableCache::new(true);
        cache.put("default", "users", table("users"));
        cache.put("shop", "users", table("users"));
        assert_eq!(cache.len(), 2);

        assert!(cache.evict("shop", "users"));
        assert!(!cache.evict("shop", "users"));
        assert!(cache.get("default", "users").is_some());

        cache.disable();
        assert!(cache.is_empty());
        cache.enable();
        assert!(cache.get("default", "users").is_none());
    }
}
