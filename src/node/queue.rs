//! Shared command queue and command results
//!
//! The `Command` sheet holds queued commands (`b`=CMDID, `c`=CMDTYPE,
//! `d`=CMD) starting at `CommandTableY`; the head row is next. Results are
//! written to the `Result` sheet on the executing node's status row.

use std::sync::Arc;

use crate::common::{Error, MonitorConfig, Result};
use crate::node::command::CommandType;
use crate::proto;
use crate::table::columns::{CMD, CMD_ID, RESULT_CMD_ID, RESULT_TIME};
use crate::table::StatusTable;

/// One queued command as stored in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    pub cmd_id: String,
    pub cmd_type: String,
    pub cmd: String,
}

impl QueuedCommand {
    fn from_cells(cells: &[String]) -> Option<Self> {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        let queued = Self {
            cmd_id: cell(0),
            cmd_type: cell(1),
            cmd: cell(2),
        };
        (!queued.is_empty()).then_some(queued)
    }

    fn is_empty(&self) -> bool {
        self.cmd_id.is_empty() && self.cmd_type.is_empty() && self.cmd.is_empty()
    }

    fn to_cells(&self) -> Vec<String> {
        vec![self.cmd_id.clone(), self.cmd_type.clone(), self.cmd.clone()]
    }

    pub fn command_type(&self) -> Result<CommandType> {
        self.cmd_type.parse()
    }

    pub fn to_proto(&self) -> proto::Command {
        proto::Command {
            cmdid: self.cmd_id.clone(),
            cmdtype: self.cmd_type.clone(),
            cmd: self.cmd.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CommandQueue {
    table: Arc<dyn StatusTable>,
    config: MonitorConfig,
}

impl CommandQueue {
    pub fn new(table: Arc<dyn StatusTable>, config: MonitorConfig) -> Self {
        Self { table, config }
    }

    async fn read_slots(&self) -> Result<Vec<Vec<String>>> {
        self.table
            .read_range(
                &self.config.command_sheet,
                CMD_ID,
                self.config.command_table_y,
                CMD,
                self.config.command_last_row(),
            )
            .await
    }

    /// Next command, if the queue is not empty
    pub async fn head(&self) -> Result<Option<QueuedCommand>> {
        let row = self.config.command_table_y;
        let cells = self
            .table
            .read_range(&self.config.command_sheet, CMD_ID, row, CMD, row)
            .await?;
        Ok(cells.first().and_then(|c| QueuedCommand::from_cells(c)))
    }

    /// Queued commands in order
    pub async fn list(&self) -> Result<Vec<QueuedCommand>> {
        let slots = self.read_slots().await?;
        Ok(slots
            .iter()
            .map_while(|c| QueuedCommand::from_cells(c))
            .collect())
    }

    /// Append a command to the first empty slot
    pub async fn enqueue(&self, cmd_type: CommandType, cmd: &str) -> Result<QueuedCommand> {
        let slots = self.read_slots().await?;
        let free = slots
            .iter()
            .position(|c| QueuedCommand::from_cells(c).is_none())
            .ok_or_else(|| {
                Error::Table(format!(
                    "command queue full ({} entries)",
                    self.config.max_commands
                ))
            })?;

        let queued = QueuedCommand {
            cmd_id: uuid::Uuid::new_v4().to_string(),
            cmd_type: cmd_type.to_string(),
            cmd: cmd.to_string(),
        };
        self.table
            .write_range(
                &self.config.command_sheet,
                CMD_ID,
                self.config.command_table_y + free as u32,
                CMD,
                queued.to_cells(),
            )
            .await?;
        Ok(queued)
    }

    /// Remove the head command, shifting the rest up
    pub async fn pop(&self) -> Result<()> {
        let slots = self.read_slots().await?;
        let used = slots
            .iter()
            .rposition(|c| QueuedCommand::from_cells(c).is_some())
            .map(|i| i + 1)
            .unwrap_or(0);
        if used == 0 {
            return Ok(());
        }

        let mut shifted: Vec<Vec<String>> = slots[1..used].to_vec();
        shifted.push(vec![String::new(); 3]);
        self.table
            .write_rows(
                &self.config.command_sheet,
                CMD_ID,
                self.config.command_table_y,
                CMD,
                shifted,
            )
            .await
    }

    /// Record a command outcome on `row` of the result sheet
    pub async fn write_result(
        &self,
        row: u32,
        cmd_id: &str,
        server_id: &str,
        result: &str,
        time: &str,
    ) -> Result<()> {
        self.table
            .write_range(
                &self.config.result_sheet,
                RESULT_CMD_ID,
                row,
                RESULT_TIME,
                vec![
                    cmd_id.to_string(),
                    server_id.to_string(),
                    result.to_string(),
                    time.to_string(),
                ],
            )
            .await
    }
}
