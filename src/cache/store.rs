// Cache store backed by redb.
// Items live in one table per token; the cached profile lives in a shared "user" table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use redb::{Database, DatabaseError, ReadableTable, TableDefinition, TableError};
use tracing::warn;

use crate::error::{Result, StarError};
use crate::model::{Item, UserProfile};

use super::paths::starred_partition;

const USER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("user");

/// Pause between attempts to open a store held by another process.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

fn items_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

/// Whether the item partition was just created or held earlier data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Created,
    Existing,
}

/// Transactional key/value cache of starred items and profiles.
pub struct CacheStore {
    db: Database,
}

impl CacheStore {
    /// Open or create the store, waiting up to `timeout` for another process to release it.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match Database::create(path) {
                Ok(db) => {
                    return Ok(Self { db });
                }
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    if Instant::now() >= deadline {
                        return Err(StarError::StoreLocked(path.to_path_buf()));
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Create the item partition for `token` unless it exists.
    pub fn ensure_partition(&self, token: &str) -> Result<Partition> {
        let name = starred_partition(token);
        let exists = {
            let read_txn = self.db.begin_read()?;
            match read_txn.open_table(items_table(&name)) {
                Ok(_) => true,
                Err(TableError::TableDoesNotExist(_)) => false,
                Err(err) => return Err(err.into()),
            }
        };
        if exists {
            return Ok(Partition::Existing);
        }

        let write_txn = self.db.begin_write()?;
        write_txn.open_table(items_table(&name))?;
        write_txn.commit()?;
        Ok(Partition::Created)
    }

    /// Load every item of the partition. Entries that no longer decode are skipped.
    pub fn load_items(&self, token: &str) -> Result<Vec<Item>> {
        let name = starred_partition(token);
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(items_table(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut items = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            match serde_json::from_slice::<Item>(value.value()) {
                Ok(item) => items.push(item),
                Err(err) => warn!(key = key.value(), error = %err, "skipping undecodable item"),
            }
        }
        Ok(items)
    }

    /// Look up items by identity in one read transaction. Missing keys are left out.
    pub fn get_items(&self, token: &str, keys: &[&str]) -> Result<HashMap<String, Item>> {
        let name = starred_partition(token);
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(items_table(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            let Some(value) = table.get(*key)? else {
                continue;
            };
            match serde_json::from_slice::<Item>(value.value()) {
                Ok(item) => {
                    found.insert(key.to_string(), item);
                }
                Err(err) => warn!(key, error = %err, "skipping undecodable item"),
            }
        }
        Ok(found)
    }

    /// Identities stored in the partition, sorted.
    pub fn item_keys(&self, token: &str) -> Result<Vec<String>> {
        let name = starred_partition(token);
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(items_table(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    /// Write a batch of items in one transaction, returning how many were written.
    ///
    /// Items carrying a fetch error are skipped.
    pub fn put_items(&self, token: &str, items: &[Item]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let name = starred_partition(token);
        let write_txn = self.db.begin_write()?;
        let mut written = 0;
        {
            let mut table = write_txn.open_table(items_table(&name))?;
            for item in items {
                if let Some(err) = &item.error {
                    warn!(full_name = %item.full_name, error = %err, "not caching item without readme");
                    continue;
                }
                let bytes = serde_json::to_vec(item)?;
                table.insert(item.full_name.as_str(), bytes.as_slice())?;
                written += 1;
            }
        }
        write_txn.commit()?;
        Ok(written)
    }

    /// Delete a batch of items in one transaction, returning how many existed.
    pub fn delete_items(&self, token: &str, keys: &[&str]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let name = starred_partition(token);
        let write_txn = self.db.begin_write()?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(items_table(&name))?;
            for key in keys {
                if table.remove(*key)?.is_some() {
                    removed += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(removed)
    }

    /// Read the cached profile for `token`.
    ///
    /// A profile that no longer decodes is deleted and reported as absent.
    pub fn load_user(&self, token: &str) -> Result<Option<UserProfile>> {
        let bytes = {
            let read_txn = self.db.begin_read()?;
            let table = match read_txn.open_table(USER_TABLE) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            match table.get(token)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(None),
            }
        };

        match serde_json::from_slice::<UserProfile>(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(error = %err, "cached profile is unreadable, discarding it");
                self.delete_user(token)?;
                Ok(None)
            }
        }
    }

    /// Store the profile for `token`.
    pub fn put_user(&self, token: &str, user: &UserProfile) -> Result<()> {
        let bytes = serde_json::to_vec(user)?;
        self.put_user_bytes(token, &bytes)
    }

    fn put_user_bytes(&self, token: &str, bytes: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_TABLE)?;
            table.insert(token, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_user(&self, token: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_TABLE)?;
            table.remove(token)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Delete the store file. The index is always rebuilt from the store, so this clears
/// everything that is cached.
pub fn clear_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
