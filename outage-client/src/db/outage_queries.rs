use std::collections::HashSet;

use crate::domain::{Column, OutageRecord};
use crate::sheets::{A1Range, CellRef, CellUpdate, SheetError, SheetStore};

/// Where the outage table lives inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub worksheet: String,
    /// One-based row of the first record; row 1 holds the header.
    pub first_data_row: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            worksheet: "Sheet1".to_string(),
            first_data_row: 2,
        }
    }
}

impl SheetLayout {
    /// `Sheet1!A2:L`
    pub fn records_range(&self) -> A1Range {
        A1Range::columns(
            self.worksheet.clone(),
            Column::first().index(),
            Column::last().index(),
            self.first_data_row,
        )
    }

    /// Single column from the first data row down, e.g. `Sheet1!C2:C`.
    pub fn column_range(&self, column: Column) -> A1Range {
        A1Range::columns(self.worksheet.clone(), column.index(), column.index(), self.first_data_row)
    }

    /// Cell of `column` on the sheet row that holds the `offset`-th record.
    pub fn cell(&self, column: Column, offset: usize) -> CellRef {
        CellRef::new(self.worksheet.clone(), column.index(), self.first_data_row + offset as u32)
    }
}

/// Operator-supplied status change for every row of one transformer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub transformer_id: String,
    pub status: String,
    pub outage_date: Option<String>,
    pub outage_start: Option<String>,
    pub outage_end: Option<String>,
}

impl StatusUpdate {
    pub fn new(transformer_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            transformer_id: transformer_id.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    /// Columns written for each matching row, status first.
    fn assignments(&self) -> Vec<(Column, &str)> {
        let mut out = vec![(Column::Status, self.status.as_str())];
        let optional = [
            (Column::OutageDate, &self.outage_date),
            (Column::OutageStart, &self.outage_start),
            (Column::OutageEnd, &self.outage_end),
        ];
        for (column, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                out.push((column, v));
            }
        }
        out
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// All records in sheet order.
pub async fn fetch_all(store: &dyn SheetStore, layout: &SheetLayout) -> Result<Vec<OutageRecord>, SheetError> {
    let rows = store.read_range(&layout.records_range()).await?;
    Ok(rows.iter().map(|r| OutageRecord::from_row(r)).collect())
}

/// First row in sheet order whose meter_id or customer_id equals the given
/// identifier. Empty identifiers count as absent; with neither present the
/// sheet is not read at all.
pub fn first_match<'a>(
    records: &'a [OutageRecord],
    meter_id: Option<&str>,
    customer_id: Option<&str>,
) -> Option<&'a OutageRecord> {
    let meter_id = non_empty(meter_id);
    let customer_id = non_empty(customer_id);

    records.iter().find(|r| {
        meter_id.is_some_and(|m| r.meter_id == m) || customer_id.is_some_and(|c| r.customer_id == c)
    })
}

pub async fn find_by_meter_or_customer(
    store: &dyn SheetStore,
    layout: &SheetLayout,
    meter_id: Option<&str>,
    customer_id: Option<&str>,
) -> Result<Option<OutageRecord>, SheetError> {
    if non_empty(meter_id).is_none() && non_empty(customer_id).is_none() {
        return Ok(None);
    }
    let records = fetch_all(store, layout).await?;
    Ok(first_match(&records, meter_id, customer_id).cloned())
}

/// Unique non-blank values in first-seen order. Values keep their original
/// spelling; only the blank check trims.
pub fn distinct_non_blank<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

pub async fn distinct_transformers(store: &dyn SheetStore, layout: &SheetLayout) -> Result<Vec<String>, SheetError> {
    let rows = store.read_range(&layout.column_range(Column::TransformerId)).await?;
    Ok(distinct_non_blank(
        rows.iter().filter_map(|r| r.first()).map(String::as_str),
    ))
}

/// Cell writes that apply `update` to every row whose transformer_id cell
/// equals it exactly. `rows` starts at `layout.first_data_row`.
pub fn plan_status_update(rows: &[Vec<String>], layout: &SheetLayout, update: &StatusUpdate) -> Vec<CellUpdate> {
    let col = Column::TransformerId.index() as usize;
    let assignments = update.assignments();

    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.get(col).is_some_and(|v| *v == update.transformer_id))
        .flat_map(|(offset, _)| {
            assignments
                .iter()
                .map(move |(column, value)| CellUpdate::new(layout.cell(*column, offset), *value))
        })
        .collect()
}

/// Overwrite the status (and any supplied timing fields) of every row of the
/// transformer in one batch write. Returns how many rows matched; zero means
/// nothing was written.
pub async fn update_transformer_status(
    store: &dyn SheetStore,
    layout: &SheetLayout,
    update: &StatusUpdate,
) -> Result<usize, SheetError> {
    let rows = store.read_range(&layout.records_range()).await?;
    let writes = plan_status_update(&rows, layout, update);
    if writes.is_empty() {
        return Ok(0);
    }

    let matched = writes.len() / update.assignments().len();
    store.write_cells(&writes).await?;

    tracing::info!(
        transformer_id = %update.transformer_id,
        status = %update.status,
        rows = matched,
        "transformer status updated"
    );
    Ok(matched)
}
