use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};

use crate::models::SheetRow;
use crate::store::{RowPosition, StoreError, TabularStore};

const SELECT_COLUMNS: &str = "date_applied, company, location, position, link, salary, \
                              job_type, remote, status, source, notes";

/// The two sheets: live jobs and the trash archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Jobs,
    Trash,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Jobs => "jobs",
            Table::Trash => "trash",
        }
    }
}

/// SQLite-backed job sheet. Rows come back newest-first (`ORDER BY id DESC`).
pub struct SheetDb {
    conn: Connection,
    path: PathBuf,
}

impl SheetDb {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", "jobclip") {
            Some(proj_dirs) => proj_dirs.data_dir().join("jobclip.db"),
            None => PathBuf::from("jobclip.db"),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_applied TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                position TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT '',
                job_type TEXT NOT NULL DEFAULT '',
                remote TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS trash (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_applied TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                position TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT '',
                job_type TEXT NOT NULL DEFAULT '',
                remote TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                trashed_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_link ON jobs(link);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('jobs', 'trash')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(anyhow!("Database not initialized. Run 'jobclip init' first."));
        }
        Ok(())
    }

    /// Up to `limit` rows of `table`, newest first.
    pub fn list_rows(&self, table: Table, limit: usize) -> Result<Vec<SheetRow>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id DESC LIMIT ?1",
            SELECT_COLUMNS,
            table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([limit as i64], Self::row_to_sheet)?;
        rows.collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list {}", table.name()))
    }

    fn count(&self, table: Table) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn id_at(&self, position: RowPosition) -> Result<i64, StoreError> {
        let result = self.conn.query_row(
            "SELECT id FROM jobs ORDER BY id DESC LIMIT 1 OFFSET ?1",
            [position.0 as i64],
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::RowOutOfRange {
                position,
                len: self.count(Table::Jobs)?,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn insert(&self, table: Table, row: &SheetRow) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            table.name(),
            SELECT_COLUMNS
        );
        self.conn.execute(
            &sql,
            params![row[0], row[1], row[2], row[3], row[4], row[5], row[6], row[7], row[8], row[9], row[10]],
        )?;
        Ok(())
    }

    fn row_to_sheet(row: &rusqlite::Row) -> rusqlite::Result<SheetRow> {
        Ok([
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
        ])
    }
}

impl TabularStore for SheetDb {
    fn list_urls(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT link FROM jobs ORDER BY id DESC")?;
        let urls = stmt.query_map([], |row| row.get(0))?;
        Ok(urls.collect::<Result<Vec<String>, _>>()?)
    }

    fn row_count(&self) -> Result<usize, StoreError> {
        self.count(Table::Jobs)
    }

    fn read_row(&self, position: RowPosition) -> Result<SheetRow, StoreError> {
        let id = self.id_at(position)?;
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", SELECT_COLUMNS);
        Ok(self.conn.query_row(&sql, [id], Self::row_to_sheet)?)
    }

    fn insert_row_at_top(&mut self, row: &SheetRow) -> Result<(), StoreError> {
        self.insert(Table::Jobs, row)
    }

    fn delete_row(&mut self, position: RowPosition) -> Result<(), StoreError> {
        let id = self.id_at(position)?;
        self.conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        Ok(())
    }

    fn append_to_archive(&mut self, row: &SheetRow) -> Result<(), StoreError> {
        self.insert(Table::Trash, row)
    }

    fn archive_count(&self) -> Result<usize, StoreError> {
        self.count(Table::Trash)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::SystemIoFailure,
            ) => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}
