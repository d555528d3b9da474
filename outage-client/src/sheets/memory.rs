use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

use super::{A1Range, CellRef, CellUpdate, SheetError, SheetStore};
use crate::domain::{Column, OutageRecord};

pub const HEADER: [&str; 12] = [
    "meter_id",
    "customer_id",
    "transformer_id",
    "outage_start",
    "outage_end",
    "outage_date",
    "notes",
    "latitude",
    "longitude",
    "name",
    "location",
    "status",
];

/// In-process worksheet with the same read/write shape as the Sheets API.
///
/// `grid[0]` is spreadsheet row 1.
pub struct InMemorySheet {
    sheet: String,
    grid: Mutex<Vec<Vec<String>>>,
    write_calls: AtomicUsize,
}

impl InMemorySheet {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self::with_rows(sheet, Vec::new())
    }

    pub fn with_rows(sheet: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet: sheet.into(),
            grid: Mutex::new(rows),
            write_calls: AtomicUsize::new(0),
        }
    }

    /// Header row followed by one row per record.
    pub fn from_records(sheet: impl Into<String>, records: &[OutageRecord]) -> Self {
        let mut rows = vec![HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        rows.extend(records.iter().map(OutageRecord::to_row));
        Self::with_rows(sheet, rows)
    }

    fn grid(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.grid.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cell(&self, cell: &CellRef) -> Option<String> {
        let grid = self.grid();
        grid.get((cell.row as usize).checked_sub(1)?)?
            .get(cell.column as usize)
            .cloned()
    }

    /// Record on a one-based sheet row.
    pub fn record_at(&self, row: u32) -> Option<OutageRecord> {
        let grid = self.grid();
        grid.get((row as usize).checked_sub(1)?)
            .map(|r| OutageRecord::from_row(r))
    }

    pub fn status_cell(&self, row: u32) -> Option<String> {
        self.cell(&CellRef::new(self.sheet.clone(), Column::Status.index(), row))
    }

    /// Number of `write_cells` calls that reached the grid.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn check_sheet(&self, sheet: &str, shown: &dyn std::fmt::Display) -> Result<(), SheetError> {
        if sheet == self.sheet {
            Ok(())
        } else {
            Err(SheetError::Status {
                status: 400,
                body: format!("Unable to parse range: {shown}"),
            })
        }
    }
}

#[async_trait::async_trait]
impl SheetStore for InMemorySheet {
    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<String>>, SheetError> {
        self.check_sheet(&range.sheet, range)?;

        let grid = self.grid();
        let first = (range.start_row as usize).saturating_sub(1);
        let last = range
            .end_row
            .map(|r| r as usize)
            .unwrap_or(grid.len())
            .min(grid.len());

        let mut out: Vec<Vec<String>> = grid
            .get(first..last)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = (range.start_column..=range.end_column)
                    .map(|c| row.get(c as usize).cloned().unwrap_or_default())
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();

        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<(), SheetError> {
        for u in updates {
            self.check_sheet(&u.cell.sheet, &u.cell)?;
            if u.cell.row == 0 {
                return Err(SheetError::InvalidRange(u.cell.to_string()));
            }
        }

        let mut grid = self.grid();
        for u in updates {
            let row = u.cell.row as usize - 1;
            let col = u.cell.column as usize;
            if grid.len() <= row {
                grid.resize_with(row + 1, Vec::new);
            }
            let cells = &mut grid[row];
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = u.value.clone();
        }
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
