//! Cell storage backends
//!
//! A [`CellTable`] turns any key-value [`CellStore`] into a [`StatusTable`].
//! Supports in-memory and RocksDB backends.

use super::{range_extent, CellRef, StatusTable};
use crate::common::{Error, Result};
use rocksdb::{Options, DB};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Trait for cell storage backends
pub trait CellStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Store a value; an empty value deletes the cell
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store (default)
#[derive(Default)]
pub struct MemCells {
    map: Mutex<HashMap<String, String>>,
}

impl MemCells {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellStore for MemCells {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .map
            .lock()
            .map_err(|_| Error::Internal("cell map poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| Error::Internal("cell map poisoned".into()))?;
        if value.is_empty() {
            map.remove(key);
        } else {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// RocksDB store, one key per cell
pub struct RocksCells {
    db: DB,
}

impl RocksCells {
    /// Open or create the cell database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }
}

impl CellStore for RocksCells {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| Error::Table(format!("cell {} is not UTF-8", key)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            self.db.delete(key.as_bytes())?;
        } else {
            self.db.put(key.as_bytes(), value.as_bytes())?;
        }
        Ok(())
    }
}

/// Spreadsheet semantics over a cell store
pub struct CellTable<S> {
    cells: S,
}

pub type MemTable = CellTable<MemCells>;
pub type RocksTable = CellTable<RocksCells>;

impl<S: CellStore> CellTable<S> {
    pub fn with_store(cells: S) -> Self {
        Self { cells }
    }

    fn read_rect(&self, sheet: &str, from: CellRef, to: CellRef) -> Result<Vec<Vec<String>>> {
        let (cols, rows) = range_extent(from, to)?;
        let mut values = Vec::with_capacity(rows);
        for r in 0..rows as u32 {
            let mut row = Vec::with_capacity(cols);
            for c in 0..cols as u8 {
                let cell = CellRef::new((from.col as u8 + c) as char, from.row + r)?;
                row.push(self.cells.get(&cell.key(sheet))?.unwrap_or_default());
            }
            values.push(row);
        }
        Ok(values)
    }

    fn write_row(&self, sheet: &str, from: CellRef, to: CellRef, values: &[String]) -> Result<()> {
        if from.row != to.row {
            return Err(Error::InvalidCell(format!(
                "{}:{} spans more than one row",
                from, to
            )));
        }
        let (cols, _) = range_extent(from, to)?;
        if values.len() > cols {
            return Err(Error::Table(format!(
                "{} values do not fit in {}:{}",
                values.len(),
                from,
                to
            )));
        }
        for (c, value) in values.iter().enumerate() {
            let cell = CellRef::new((from.col as u8 + c as u8) as char, from.row)?;
            self.cells.put(&cell.key(sheet), value)?;
        }
        Ok(())
    }
}

impl MemTable {
    pub fn new() -> Self {
        Self::with_store(MemCells::new())
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RocksTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_store(RocksCells::open(path)?))
    }
}

#[tonic::async_trait]
impl<S: CellStore> StatusTable for CellTable<S> {
    async fn read_range(
        &self,
        sheet: &str,
        from_col: char,
        from_row: u32,
        to_col: char,
        to_row: u32,
    ) -> Result<Vec<Vec<String>>> {
        self.read_rect(
            sheet,
            CellRef::new(from_col, from_row)?,
            CellRef::new(to_col, to_row)?,
        )
    }

    async fn write_range(
        &self,
        sheet: &str,
        from_col: char,
        row: u32,
        to_col: char,
        values: Vec<String>,
    ) -> Result<()> {
        self.write_row(
            sheet,
            CellRef::new(from_col, row)?,
            CellRef::new(to_col, row)?,
            &values,
        )
    }

    async fn write_cell(&self, sheet: &str, col: char, row: u32, value: &str) -> Result<()> {
        let cell = CellRef::new(col, row)?;
        self.cells.put(&cell.key(sheet), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_pads_missing_cells() {
        let table = MemTable::new();
        table.write_cell("Status", 'c', 6, "node-b").await.unwrap();

        let rows = table.read_range("Status", 'b', 5, 'd', 6).await.unwrap();
        assert_eq!(rows, vec![strings(&["", "", ""]), strings(&["", "node-b", ""])]);
    }

    #[tokio::test]
    async fn test_write_range_is_partial() {
        let table = MemTable::new();
        table
            .write_range("Status", 'b', 5, 'f', strings(&["1", "node-a", "L", "t0", "1"]))
            .await
            .unwrap();
        table
            .write_range("Status", 'c', 5, 'e', strings(&["node-a", "N"]))
            .await
            .unwrap();

        let rows = table.read_range("Status", 'b', 5, 'f', 5).await.unwrap();
        assert_eq!(rows[0], strings(&["1", "node-a", "N", "t0", "1"]));
    }

    #[tokio::test]
    async fn test_write_range_rejects_overflow() {
        let table = MemTable::new();
        let result = table
            .write_range("Status", 'b', 5, 'c', strings(&["1", "a", "extra"]))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sheets_are_isolated() {
        let table = MemTable::new();
        table.write_cell("Status", 'b', 5, "1").await.unwrap();
        let rows = table.read_range("Command", 'b', 5, 'b', 5).await.unwrap();
        assert_eq!(rows, vec![strings(&[""])]);
    }

    #[tokio::test]
    async fn test_rocks_table_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let table = RocksTable::open(dir.path()).unwrap();
            table.write_cell("Status", 'c', 3, "node-a").await.unwrap();
            table.write_cell("Status", 'b', 5, "1").await.unwrap();
            table.write_cell("Status", 'b', 5, "").await.unwrap();
        }

        let table = RocksTable::open(dir.path()).unwrap();
        let rows = table.read_range("Status", 'b', 3, 'c', 5).await.unwrap();
        assert_eq!(rows[0], strings(&["", "node-a"]));
        assert_eq!(rows[2], strings(&["", ""]));
    }
}
