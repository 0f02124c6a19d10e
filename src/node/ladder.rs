//! Per-peer failure ladder
//!
//! ```text
//!   L ──fail──▶ N ──TransCount fails──▶ Z ──TransCount fails──▶ D ──TransCount fails──▶ retired
//!   ▲           │                       │                       │
//!   └───────────┴──────── any success ──┴───────────────────────┘
//! ```
//!
//! `Count` restarts at 1 whenever the status changes and only grows while the
//! status is held.

use crate::common::{parse_count, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node status as stored in the status table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Live,
    NotResponding,
    Zombie,
    Dead,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Live => "L",
            NodeStatus::NotResponding => "N",
            NodeStatus::Zombie => "Z",
            NodeStatus::Dead => "D",
        }
    }

    /// Next rung toward `D`, if any
    pub fn next(&self) -> Option<NodeStatus> {
        match self {
            NodeStatus::Live => Some(NodeStatus::NotResponding),
            NodeStatus::NotResponding => Some(NodeStatus::Zombie),
            NodeStatus::Zombie => Some(NodeStatus::Dead),
            NodeStatus::Dead => None,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "L" => Ok(NodeStatus::Live),
            "N" => Ok(NodeStatus::NotResponding),
            "Z" => Ok(NodeStatus::Zombie),
            "D" => Ok(NodeStatus::Dead),
            other => Err(Error::Table(format!("unknown status '{}'", other))),
        }
    }
}

/// Ladder position after one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub status: NodeStatus,
    pub count: u32,
    /// The row's CheckBit must be cleared
    pub retire: bool,
}

/// Apply one poll outcome to `(status, count)`
pub fn step(status: NodeStatus, count: u32, poll_succeeded: bool, trans_count: u32) -> Step {
    let keep = |count| Step {
        status,
        count,
        retire: false,
    };

    if poll_succeeded {
        return match status {
            NodeStatus::Live => keep(count.saturating_add(1)),
            _ => Step {
                status: NodeStatus::Live,
                count: 1,
                retire: false,
            },
        };
    }

    match status {
        NodeStatus::Live => Step {
            status: NodeStatus::NotResponding,
            count: 1,
            retire: false,
        },
        _ if count < trans_count => keep(count.saturating_add(1)),
        NodeStatus::Dead => Step {
            status,
            count,
            retire: true,
        },
        _ => Step {
            status: status.next().unwrap_or(status),
            count: 1,
            retire: false,
        },
    }
}

/// One registered node's row in the status table (columns `b..f`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatusRow {
    pub row_number: u32,
    pub check_bit: bool,
    pub server_id: String,
    pub status: NodeStatus,
    pub time: String,
    pub count: u32,
}

impl NodeStatusRow {
    /// Fresh row written at registration
    pub fn registered(row_number: u32, server_id: impl Into<String>, time: String) -> Self {
        Self {
            row_number,
            check_bit: true,
            server_id: server_id.into(),
            status: NodeStatus::Live,
            time,
            count: 1,
        }
    }

    /// Parse the `b..f` cells of a table row
    pub fn from_cells(row_number: u32, cells: &[String]) -> Result<Self> {
        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
        Ok(Self {
            row_number,
            check_bit: cell(0) == "1",
            server_id: cell(1).to_string(),
            status: cell(2).parse()?,
            time: cell(3).to_string(),
            count: parse_count(cell(4)),
        })
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            if self.check_bit { "1" } else { "" }.to_string(),
            self.server_id.clone(),
            self.status.to_string(),
            self.time.clone(),
            self.count.to_string(),
        ]
    }

    /// Row after one poll, stamped with `now`
    pub fn apply_poll(&self, poll_succeeded: bool, trans_count: u32, now: String) -> Self {
        let next = step(self.status, self.count, poll_succeeded, trans_count);
        Self {
            row_number: self.row_number,
            check_bit: self.check_bit && !next.retire,
            server_id: self.server_id.clone(),
            status: next.status,
            time: now,
            count: next.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TC: u32 = 3;

    fn rung(s: NodeStatus) -> u8 {
        match s {
            NodeStatus::Live => 0,
            NodeStatus::NotResponding => 1,
            NodeStatus::Zombie => 2,
            NodeStatus::Dead => 3,
        }
    }

    #[test]
    fn test_success_paths() {
        assert_eq!(
            step(NodeStatus::Live, 4, true, TC),
            Step { status: NodeStatus::Live, count: 5, retire: false }
        );
        for s in [NodeStatus::NotResponding, NodeStatus::Zombie, NodeStatus::Dead] {
            assert_eq!(
                step(s, 2, true, TC),
                Step { status: NodeStatus::Live, count: 1, retire: false }
            );
        }
    }

    #[test]
    fn test_failure_paths() {
        assert_eq!(step(NodeStatus::Live, 9, false, TC).status, NodeStatus::NotResponding);
        assert_eq!(step(NodeStatus::Live, 9, false, TC).count, 1);

        assert_eq!(
            step(NodeStatus::NotResponding, 2, false, TC),
            Step { status: NodeStatus::NotResponding, count: 3, retire: false }
        );
        assert_eq!(
            step(NodeStatus::NotResponding, 3, false, TC),
            Step { status: NodeStatus::Zombie, count: 1, retire: false }
        );
        assert_eq!(
            step(NodeStatus::Zombie, 3, false, TC),
            Step { status: NodeStatus::Dead, count: 1, retire: false }
        );
        assert_eq!(
            step(NodeStatus::Dead, 2, false, TC),
            Step { status: NodeStatus::Dead, count: 3, retire: false }
        );
        assert!(step(NodeStatus::Dead, 3, false, TC).retire);
    }

    #[test]
    fn test_count_saturates() {
        assert_eq!(step(NodeStatus::Live, u32::MAX, true, TC).count, u32::MAX);
        assert_eq!(
            step(NodeStatus::Zombie, u32::MAX - 1, false, u32::MAX),
            Step { status: NodeStatus::Zombie, count: u32::MAX, retire: false }
        );

        let cells: Vec<String> = ["1", "node-b:4096-1", "L", "t", "4294967295"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = NodeStatusRow::from_cells(6, &cells).unwrap();
        assert_eq!(row.apply_poll(true, TC, "now".into()).count, u32::MAX);
    }

    #[test]
    fn test_idempotent_recovery_from_dead() {
        let row = NodeStatusRow {
            row_number: 7,
            check_bit: true,
            server_id: "10.0.0.9:4096-20201103093000".into(),
            status: NodeStatus::Dead,
            time: "old".into(),
            count: 2,
        };
        let next = row.apply_poll(true, TC, "now".into());
        assert_eq!(next.status, NodeStatus::Live);
        assert_eq!(next.count, 1);
        assert!(next.check_bit);
        assert_eq!(next.time, "now");
    }

    #[test]
    fn test_hysteresis_never_skips_a_rung() {
        // Exhaustive over all outcome sequences of length 12.
        for mask in 0u32..(1 << 12) {
            let (mut status, mut count) = (NodeStatus::Live, 1);
            let mut same_status_failures = 0;
            for i in 0..12 {
                let ok = mask & (1 << i) != 0;
                let next = step(status, count, ok, TC);
                if next.retire {
                    assert_eq!(status, NodeStatus::Dead);
                    break;
                }
                if ok {
                    assert_eq!(next.status, NodeStatus::Live);
                    same_status_failures = 0;
                } else if next.status != status {
                    assert_eq!(rung(next.status), rung(status) + 1);
                    if status != NodeStatus::Live {
                        assert!(same_status_failures >= TC);
                    }
                    same_status_failures = 1;
                } else {
                    same_status_failures += 1;
                }
                if next.status != status {
                    assert_eq!(next.count, 1);
                }
                status = next.status;
                count = next.count;
            }
        }
    }

    #[test]
    fn test_row_cells() {
        let cells: Vec<String> = ["1", "node-b:4096-1", "Z", "t", "2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = NodeStatusRow::from_cells(6, &cells).unwrap();
        assert!(row.check_bit);
        assert_eq!(row.status, NodeStatus::Zombie);
        assert_eq!(row.count, 2);
        assert_eq!(row.to_cells(), cells);

        let bad: Vec<String> = vec!["1".into(), "x".into(), "Q".into()];
        assert!(NodeStatusRow::from_cells(6, &bad).is_err());
    }

    #[test]
    fn test_retire_clears_check_bit() {
        let row = NodeStatusRow {
            row_number: 5,
            check_bit: true,
            server_id: "gone".into(),
            status: NodeStatus::Dead,
            time: String::new(),
            count: 3,
        };
        let next = row.apply_poll(false, TC, "t".into());
        assert!(!next.check_bit);
        assert_eq!(next.to_cells()[0], "");
    }
}
