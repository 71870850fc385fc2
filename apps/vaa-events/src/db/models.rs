use std::collections::BTreeMap;

pub const MESSAGE_PUBLICATION: &str = "MessagePublication";
pub const VAA_STATE: &str = "VAAState";
pub const QUORUM_STATE: &str = "QuorumState";

/// One versioned value. `column` is the qualifier within its family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub column: String,
    pub value: Vec<u8>,
    pub timestamp_micros: i64,
}

/// A row as read from the event table: family name to its cells.
///
/// Cells in a family are ordered by column, newest version first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub families: BTreeMap<String, Vec<Cell>>,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    pub fn family(&self, name: &str) -> Option<&[Cell]> {
        self.families.get(name).map(Vec::as_slice)
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.families.get(name).is_some_and(|cells| !cells.is_empty())
    }

    /// Timestamp of the oldest cell, i.e. when the row was first written.
    pub fn first_written_micros(&self) -> Option<i64> {
        self.families
            .values()
            .flatten()
            .map(|cell| cell.timestamp_micros)
            .min()
    }

    /// Builder used by tests and seeders.
    pub fn with_cell(
        mut self,
        family: &str,
        column: &str,
        value: impl Into<Vec<u8>>,
        timestamp_micros: i64,
    ) -> Self {
        let cells = self.families.entry(family.to_string()).or_default();
        cells.push(Cell {
            column: column.to_string(),
            value: value.into(),
            timestamp_micros,
        });
        cells.sort_by(|a, b| {
            a.column
                .cmp(&b.column)
                .then(b.timestamp_micros.cmp(&a.timestamp_micros))
        });
        self
    }
}
