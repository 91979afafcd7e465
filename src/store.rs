use std::fmt;
use thiserror::Error;

use crate::models::{JobRecord, SheetRow};

const LINK_COLUMN: usize = 4;

// Row 0 is always the most recent record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowPosition(pub usize);

impl RowPosition {
    pub const TOP: RowPosition = RowPosition(0);
}

impl fmt::Display for RowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0 + 1)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{position} out of range ({len} rows)")]
    RowOutOfRange { position: RowPosition, len: usize },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{url} is already saved at {position}")]
    DuplicateUrl { url: String, position: RowPosition },

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Rows are full [`SheetRow`]s in `COLUMNS` order, newest first.
pub trait TabularStore {
    fn list_urls(&self) -> Result<Vec<String>, StoreError>;
    fn row_count(&self) -> Result<usize, StoreError>;
    fn read_row(&self, position: RowPosition) -> Result<SheetRow, StoreError>;
    fn insert_row_at_top(&mut self, row: &SheetRow) -> Result<(), StoreError>;
    fn delete_row(&mut self, position: RowPosition) -> Result<(), StoreError>;
    fn append_to_archive(&mut self, row: &SheetRow) -> Result<(), StoreError>;
    fn archive_count(&self) -> Result<usize, StoreError>;

    fn begin(&mut self) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;
}

pub struct RecordGateway<S: TabularStore> {
    store: S,
}

impl<S: TabularStore> RecordGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// With `replace_most_recent` the top row is archived first and is not
    /// counted as a duplicate.
    pub fn persist(&mut self, record: &JobRecord, replace_most_recent: bool) -> Result<RowPosition, PersistError> {
        let urls = self.store.list_urls()?;
        let replacing = replace_most_recent && !urls.is_empty();
        if replace_most_recent && !replacing {
            tracing::info!("live store is empty, nothing to replace");
        }

        let url = record.url.trim();
        if !url.is_empty() {
            let skip = usize::from(replacing);
            if let Some(index) = urls.iter().skip(skip).position(|u| u.trim() == url) {
                let position = RowPosition(index + skip);
                tracing::info!(url, %position, "duplicate url, not saving");
                return Err(PersistError::DuplicateUrl {
                    url: url.to_string(),
                    position,
                });
            }
        }

        let row = record.to_row();
        self.store.begin()?;
        let result = self.write(&row, replacing).and_then(|()| self.store.commit());
        if let Err(e) = result {
            tracing::warn!(error = %e, "persist failed, rolling back");
            if let Err(rollback) = self.store.rollback() {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            return Err(e.into());
        }

        tracing::info!(url, replaced = replacing, "saved job");
        Ok(RowPosition::TOP)
    }

    fn write(&mut self, row: &SheetRow, replacing: bool) -> Result<(), StoreError> {
        if replacing {
            let previous = self.store.read_row(RowPosition::TOP)?;
            self.store.append_to_archive(&previous)?;
            self.store.delete_row(RowPosition::TOP)?;
            tracing::debug!(url = %previous[LINK_COLUMN], "archived top row");
        }
        self.store.insert_row_at_top(row)
    }

    pub fn find_by_url(&self, url: &str) -> Result<Option<RowPosition>, StoreError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }
        let urls = self.store.list_urls()?;
        Ok(urls.iter().position(|u| u.trim() == url).map(RowPosition))
    }
}
