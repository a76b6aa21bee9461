//! In-process table storage.
//!
//! A [`Table`] keeps rows in id order behind a read/write lock and maintains
//! unique secondary indexes. Each operation runs in a single critical
//! section, so index checks and writes are atomic with respect to each other.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use thiserror::Error;
use tokio::sync::RwLock;

/// Row identifier allocated by a [`Table`].
pub type RowId = i64;

/// Identifies one unique index of a record type.
pub trait UniqueIndex: Copy + Eq + Hash + Send + Sync + 'static {
    /// Index name used in logs and errors.
    fn name(self) -> &'static str;
}

/// A value stored in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Table name used in logs and errors.
    const TABLE: &'static str;

    type Index: UniqueIndex;

    /// Every unique index maintained for this record type.
    const UNIQUE_INDEXES: &'static [Self::Index];

    fn id(&self) -> RowId;

    fn set_id(&mut self, id: RowId);

    /// Key of this row in `index`. `None` means the row is not indexed there.
    fn unique_key(&self, index: Self::Index) -> Option<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DbError {
    #[error("{table}: row {id} not found")]
    RowNotFound { table: &'static str, id: RowId },

    #[error("{table}: duplicate value '{value}' for unique index '{index}'")]
    UniqueViolation {
        table: &'static str,
        index: &'static str,
        value: String,
    },
}

struct Inner<R: Record> {
    next_id: RowId,
    rows: BTreeMap<RowId, R>,
    indexes: HashMap<R::Index, HashMap<String, RowId>>,
}

impl<R: Record> Inner<R> {
    /// Reject `row` if any of its unique keys is held by a different row.
    fn check_unique(&self, row: &R, own_id: Option<RowId>) -> Result<(), DbError> {
        for &index in R::UNIQUE_INDEXES {
            let Some(key) = row.unique_key(index) else {
                continue;
            };
            let holder = self.indexes.get(&index).and_then(|keys| keys.get(&key));
            if let Some(&holder) = holder {
                if Some(holder) != own_id {
                    return Err(DbError::UniqueViolation {
                        table: R::TABLE,
                        index: index.name(),
                        value: key,
                    });
                }
            }
        }
        Ok(())
    }

    fn index_row(&mut self, row: &R) {
        for &index in R::UNIQUE_INDEXES {
            if let Some(key) = row.unique_key(index) {
                self.indexes.entry(index).or_default().insert(key, row.id());
            }
        }
    }

    fn unindex_row(&mut self, row: &R) {
        for &index in R::UNIQUE_INDEXES {
            if let Some(key) = row.unique_key(index) {
                if let Some(keys) = self.indexes.get_mut(&index) {
                    keys.remove(&key);
                }
            }
        }
    }
}

/// A table of records with allocated ids and unique indexes.
pub struct Table<R: Record> {
    inner: RwLock<Inner<R>>,
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
                indexes: HashMap::new(),
            }),
        }
    }

    /// Insert a row, assigning it a fresh id. The id set on `row` is ignored.
    pub async fn insert(&self, mut row: R) -> Result<R, DbError> {
        let mut inner = self.inner.write().await;

        inner.check_unique(&row, None)?;

        let id = inner.next_id;
        inner.next_id += 1;
        row.set_id(id);
        inner.index_row(&row);
        inner.rows.insert(id, row.clone());

        tracing::debug!(table = R::TABLE, id, "row inserted");
        Ok(row)
    }

    pub async fn get(&self, id: RowId) -> Option<R> {
        self.inner.read().await.rows.get(&id).cloned()
    }

    /// Look a row up through one of its unique indexes.
    pub async fn find_unique(&self, index: R::Index, key: &str) -> Option<R> {
        let inner = self.inner.read().await;
        inner
            .indexes
            .get(&index)
            .and_then(|keys| keys.get(key))
            .and_then(|id| inner.rows.get(id))
            .cloned()
    }

    /// All rows in id order.
    pub async fn all(&self) -> Vec<R> {
        self.inner.read().await.rows.values().cloned().collect()
    }

    /// Rows matching `predicate`, in id order.
    pub async fn scan<F>(&self, predicate: F) -> Vec<R>
    where
        F: Fn(&R) -> bool,
    {
        self.inner
            .read()
            .await
            .rows
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    /// Apply `change` to a copy of the row and store it if every unique
    /// index still holds. On error the stored row is left untouched.
    pub async fn update<F>(&self, id: RowId, change: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut R),
    {
        let mut inner = self.inner.write().await;

        let current = inner.rows.get(&id).cloned().ok_or(DbError::RowNotFound {
            table: R::TABLE,
            id,
        })?;

        let mut updated = current.clone();
        change(&mut updated);
        // The id is owned by the table.
        updated.set_id(id);

        inner.check_unique(&updated, Some(id))?;

        inner.unindex_row(&current);
        inner.index_row(&updated);
        inner.rows.insert(id, updated.clone());

        tracing::debug!(table = R::TABLE, id, "row updated");
        Ok(updated)
    }

    /// Remove a row permanently. Its id is never reused.
    pub async fn delete(&self, id: RowId) -> Result<R, DbError> {
        let mut inner = self.inner.write().await;

        let row = inner.rows.remove(&id).ok_or(DbError::RowNotFound {
            table: R::TABLE,
            id,
        })?;
        inner.unindex_row(&row);

        tracing::debug!(table = R::TABLE, id, "row deleted");
        Ok(row)
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}
