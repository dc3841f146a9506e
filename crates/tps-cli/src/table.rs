//! Value-trace table
//!
//! Replays a schedule against the database values and every transaction's
//! local copies, one row per step.

use serde::Serialize;
use std::fmt;
use tps_scheduler::{Attribute, BaseValues, OpKind, Schedule, Step, TxId};

const HEADERS: [&str; 9] = ["#", "T1", "T2", "A", "a1", "a2", "B", "b1", "b2"];

/// State after one step
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceRow {
    /// 1-based step number
    pub index: usize,
    /// Acting transaction
    pub tx: TxId,
    /// Human-readable operation text
    pub operation: String,
    /// Database value of A
    pub a: i64,
    /// Local copy of A in T1
    pub a1: Option<i64>,
    /// Local copy of A in T2
    pub a2: Option<i64>,
    /// Database value of B
    pub b: i64,
    /// Local copy of B in T1
    pub b1: Option<i64>,
    /// Local copy of B in T2
    pub b2: Option<i64>,
}

impl TraceRow {
    fn cells(&self) -> [String; 9] {
        let local = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        let (t1, t2) = match self.tx {
            TxId::T1 => (self.operation.clone(), String::new()),
            TxId::T2 => (String::new(), self.operation.clone()),
        };
        [
            self.index.to_string(),
            t1,
            t2,
            self.a.to_string(),
            local(self.a1),
            local(self.a2),
            self.b.to_string(),
            local(self.b1),
            local(self.b2),
        ]
    }
}

/// Operation text shown in the acting transaction's column
pub fn operation_text(step: &Step) -> String {
    let Some(attr) = step.attr() else {
        return match step.kind() {
            OpKind::Begin => "BOT".to_string(),
            _ => "commit".to_string(),
        };
    };
    let local = attr.local_name();
    match step.kind() {
        OpKind::Lock => format!("lock({attr})"),
        OpKind::Read => format!("read({attr},{local})"),
        OpKind::Compute => match step.compute {
            Some(compute) => format!(
                "{local} = {local} {} {}",
                compute.operator.symbol(),
                compute.operand
            ),
            None => format!("compute({local})"),
        },
        OpKind::Write => format!("write({attr},{local})"),
        _ => format!("unlock({attr})"),
    }
}

/// Per-step replay of a schedule
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValueTrace {
    rows: Vec<TraceRow>,
}

impl ValueTrace {
    /// Replay `schedule` starting from `base`
    ///
    /// Read copies the database value into the local copy, compute updates
    /// the local copy (starting from the database value if nothing was read),
    /// write stores the local copy and clears it.
    pub fn new(schedule: &Schedule, base: BaseValues) -> Self {
        let mut db = [base.a, base.b];
        let mut locals: [[Option<i64>; 2]; 2] = [[None; 2]; 2];

        let rows = schedule
            .iter()
            .enumerate()
            .map(|(i, step)| {
                if let Some(attr) = step.attr() {
                    let d = attr_slot(attr);
                    let local = &mut locals[tx_slot(step.tx())][d];
                    match step.kind() {
                        OpKind::Read => *local = Some(db[d]),
                        OpKind::Compute => {
                            let current = local.unwrap_or(db[d]);
                            *local = Some(step.compute.map_or(current, |c| c.apply(current)));
                        }
                        OpKind::Write => {
                            if let Some(value) = local.take() {
                                db[d] = value;
                            }
                        }
                        _ => {}
                    }
                }

                TraceRow {
                    index: i + 1,
                    tx: step.tx(),
                    operation: operation_text(step),
                    a: db[0],
                    a1: locals[0][0],
                    a2: locals[1][0],
                    b: db[1],
                    b1: locals[0][1],
                    b2: locals[1][1],
                }
            })
            .collect();

        Self { rows }
    }

    /// Rows in step order
    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }
}

fn tx_slot(tx: TxId) -> usize {
    usize::from(tx.number() - 1)
}

fn attr_slot(attr: Attribute) -> usize {
    match attr {
        Attribute::A => 0,
        Attribute::B => 1,
    }
}

impl fmt::Display for ValueTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 9]> = self.rows.iter().map(TraceRow::cells).collect();

        let mut widths = HEADERS.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, row: &[String]| -> fmt::Result {
            let padded: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &HEADERS.map(String::from))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &cells {
            line(f, row)?;
        }
        Ok(())
    }
}
