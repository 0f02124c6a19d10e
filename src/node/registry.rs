//! Node registry on top of the status table
//!
//! Handles:
//! - Registration (first free row, CheckBit, initial status)
//! - Retirement (clearing the CheckBit)
//! - Coordinator announcement cell
//! - Peer discovery for a coordinator round

use std::sync::Arc;

use crate::common::{current_time, Error, MonitorConfig, Result};
use crate::node::ladder::NodeStatusRow;
use crate::table::columns::{CHECK_BIT, COUNT, SERVER_ID};
use crate::table::StatusTable;

#[derive(Clone)]
pub struct StatusRegistry {
    table: Arc<dyn StatusTable>,
    config: MonitorConfig,
}

impl StatusRegistry {
    pub fn new(table: Arc<dyn StatusTable>, config: MonitorConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &Arc<dyn StatusTable> {
        &self.table
    }

    /// Raw `b..f` cells of every row slot
    async fn read_slots(&self) -> Result<Vec<Vec<String>>> {
        self.table
            .read_range(
                &self.config.status_sheet,
                CHECK_BIT,
                self.config.status_table_y,
                COUNT,
                self.config.status_last_row(),
            )
            .await
    }

    /// First row whose CheckBit is not set
    pub async fn find_free_row(&self) -> Result<u32> {
        let slots = self.read_slots().await?;
        slots
            .iter()
            .position(|cells| cells.first().map(String::as_str) != Some("1"))
            .map(|i| self.config.status_table_y + i as u32)
            .ok_or(Error::NoFreeRow(self.config.max_spiders))
    }

    /// Claim a row for `server_id` and write its initial status.
    ///
    /// Returns the claimed row number.
    pub async fn register(&self, server_id: &str) -> Result<u32> {
        let row = self.find_free_row().await?;
        self.set_check_bit(row, true).await?;

        let status = NodeStatusRow::registered(row, server_id, current_time());
        tracing::info!(
            "[{}] {}-{} (row {})",
            status.server_id,
            status.status,
            status.time,
            row
        );
        self.write_status(&status).await?;
        Ok(row)
    }

    pub async fn set_check_bit(&self, row: u32, on: bool) -> Result<()> {
        self.table
            .write_cell(
                &self.config.status_sheet,
                CHECK_BIT,
                row,
                if on { "1" } else { "" },
            )
            .await
    }

    /// Logically remove a row; the slot becomes free for the next node
    pub async fn retire(&self, row: u32) -> Result<()> {
        self.set_check_bit(row, false).await
    }

    /// Record `server_id` as the most recent coordinator (last writer wins)
    pub async fn announce(&self, server_id: &str) -> Result<()> {
        self.table
            .write_cell(
                &self.config.status_sheet,
                SERVER_ID,
                self.config.announcement_row(),
                server_id,
            )
            .await
    }

    pub async fn coordinator(&self) -> Result<Option<String>> {
        let row = self.config.announcement_row();
        let cells = self
            .table
            .read_range(&self.config.status_sheet, SERVER_ID, row, SERVER_ID, row)
            .await?;
        Ok(cells
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .filter(|id| !id.is_empty()))
    }

    /// Every registered row, including the caller's own
    pub async fn active_rows(&self) -> Result<Vec<NodeStatusRow>> {
        let slots = self.read_slots().await?;
        let mut rows = Vec::new();
        for (i, cells) in slots.iter().enumerate() {
            if cells.first().map(String::as_str) != Some("1") {
                continue;
            }
            let row_number = self.config.status_table_y + i as u32;
            match NodeStatusRow::from_cells(row_number, cells) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(row = row_number, "skipping malformed status row: {}", e),
            }
        }
        Ok(rows)
    }

    /// Peers this node must poll: registered rows other than its own
    pub async fn discover_peers(&self, self_id: &str) -> Result<Vec<NodeStatusRow>> {
        let rows = self.active_rows().await?;
        Ok(rows.into_iter().filter(|r| r.server_id != self_id).collect())
    }

    /// Write a row back (`b..f`)
    pub async fn write_status(&self, row: &NodeStatusRow) -> Result<()> {
        self.table
            .write_range(
                &self.config.status_sheet,
                CHECK_BIT,
                row.row_number,
                COUNT,
                row.to_cells(),
            )
            .await
    }
}
