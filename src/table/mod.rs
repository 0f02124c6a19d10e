//! Shared status table
//!
//! A row-oriented, spreadsheet-like store shared by every node. Cells are
//! addressed by sheet name, a single-letter column and a 1-based row.
//! Absent cells read as the empty string and reads always return the full
//! requested rectangle. There is no transactional guard: concurrent writers
//! to the same cell resolve as last-writer-wins.
//!
//! ```text
//!   Status sheet            row
//!   ┌───┬──────────────┐
//!   │ c │ coordinator  │    StatusTableY - 2
//!   ├───┼───┬───┬───┬──┴┐
//!   │ b │ c │ d │ e │ f │   StatusTableY ..
//!   │bit│id │st │tm │cnt│
//!   └───┴───┴───┴───┴───┘
//! ```

pub mod client;
pub mod http;
pub mod store;

pub use client::HttpTable;
pub use store::{CellStore, CellTable, MemCells, MemTable, RocksCells, RocksTable};

use crate::common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Fixed column layout of the status, command and result sheets
pub mod columns {
    pub const CHECK_BIT: char = 'b';
    pub const SERVER_ID: char = 'c';
    pub const STATUS: char = 'd';
    pub const TIME: char = 'e';
    pub const COUNT: char = 'f';

    pub const CMD_ID: char = 'b';
    pub const CMD_TYPE: char = 'c';
    pub const CMD: char = 'd';

    pub const RESULT_CMD_ID: char = 'b';
    pub const RESULT_SERVER_ID: char = 'c';
    pub const RESULT: char = 'd';
    pub const RESULT_TIME: char = 'e';
}

/// A single cell reference such as `c5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: char,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: char, row: u32) -> Result<Self> {
        let col = col.to_ascii_lowercase();
        if !col.is_ascii_lowercase() {
            return Err(Error::InvalidCell(format!("column '{}'", col)));
        }
        if row == 0 {
            return Err(Error::InvalidCell(format!("{}0: rows start at 1", col)));
        }
        Ok(Self { col, row })
    }

    /// Storage key for this cell within `sheet`
    pub fn key(&self, sheet: &str) -> String {
        format!("{}!{}", sheet, self)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let col = chars
            .next()
            .ok_or_else(|| Error::InvalidCell("empty reference".into()))?;
        let row: u32 = chars
            .as_str()
            .parse()
            .map_err(|_| Error::InvalidCell(s.to_string()))?;
        CellRef::new(col, row)
    }
}

/// Largest rectangle a single read or write may cover
pub const MAX_RANGE_CELLS: usize = 26_000;

/// Check a rectangle and return its (columns, rows) extent
pub fn range_extent(from: CellRef, to: CellRef) -> Result<(usize, usize)> {
    if to.col < from.col || to.row < from.row {
        return Err(Error::InvalidCell(format!("range {}:{} is inverted", from, to)));
    }
    let cols = (to.col as u8 - from.col as u8) as usize + 1;
    let rows = (to.row - from.row) as usize + 1;
    if cols.saturating_mul(rows) > MAX_RANGE_CELLS {
        return Err(Error::InvalidCell(format!(
            "range {}:{} exceeds {} cells",
            from, to, MAX_RANGE_CELLS
        )));
    }
    Ok((cols, rows))
}

/// Remote, row-oriented table consumed by the monitor
#[tonic::async_trait]
pub trait StatusTable: Send + Sync {
    /// Read the rectangle `from_col from_row : to_col to_row`
    async fn read_range(
        &self,
        sheet: &str,
        from_col: char,
        from_row: u32,
        to_col: char,
        to_row: u32,
    ) -> Result<Vec<Vec<String>>>;

    /// Write `values` left to right into one row, starting at `from_col`
    async fn write_range(
        &self,
        sheet: &str,
        from_col: char,
        row: u32,
        to_col: char,
        values: Vec<String>,
    ) -> Result<()>;

    async fn write_cell(&self, sheet: &str, col: char, row: u32, value: &str) -> Result<()>;

    /// Write several consecutive rows
    async fn write_rows(
        &self,
        sheet: &str,
        from_col: char,
        from_row: u32,
        to_col: char,
        rows: Vec<Vec<String>>,
    ) -> Result<()> {
        for (i, values) in rows.into_iter().enumerate() {
            self.write_range(sheet, from_col, from_row + i as u32, to_col, values)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        let cell: CellRef = "C5".parse().unwrap();
        assert_eq!(cell, CellRef { col: 'c', row: 5 });
        assert_eq!(cell.to_string(), "c5");
        assert_eq!(cell.key("Status"), "Status!c5");
    }

    #[test]
    fn test_parse_invalid_cell_ref() {
        assert!("".parse::<CellRef>().is_err());
        assert!("5".parse::<CellRef>().is_err());
        assert!("c".parse::<CellRef>().is_err());
        assert!("c0".parse::<CellRef>().is_err());
        assert!("cc5".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_range_extent() {
        let from = CellRef::new('b', 5).unwrap();
        let to = CellRef::new('f', 24).unwrap();
        assert_eq!(range_extent(from, to).unwrap(), (5, 20));
        assert!(range_extent(to, from).is_err());
    }

    #[test]
    fn test_range_extent_is_bounded() {
        let from = CellRef::new('a', 1).unwrap();
        assert_eq!(
            range_extent(from, CellRef::new('z', 1000).unwrap()).unwrap(),
            (26, 1000)
        );
        assert!(matches!(
            range_extent(from, CellRef::new('z', 1001).unwrap()),
            Err(Error::InvalidCell(_))
        ));
        assert!(range_extent(from, CellRef::new('z', 4_000_000_000).unwrap()).is_err());
    }
}
