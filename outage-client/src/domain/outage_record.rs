use serde::{Deserialize, Serialize};

/// Positional columns of the outage worksheet.
///
/// The sheet carries no schema; every operation addresses cells through this
/// single mapping (A = meter_id ... L = status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    MeterId,
    CustomerId,
    TransformerId,
    OutageStart,
    OutageEnd,
    OutageDate,
    Notes,
    Latitude,
    Longitude,
    Name,
    Location,
    Status,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::MeterId,
        Column::CustomerId,
        Column::TransformerId,
        Column::OutageStart,
        Column::OutageEnd,
        Column::OutageDate,
        Column::Notes,
        Column::Latitude,
        Column::Longitude,
        Column::Name,
        Column::Location,
        Column::Status,
    ];

    /// Zero-based column index (A = 0).
    pub const fn index(self) -> u32 {
        self as u32
    }

    pub const fn first() -> Column {
        Column::MeterId
    }

    pub const fn last() -> Column {
        Column::Status
    }
}

/// One worksheet row describing a transformer outage as seen by a meter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub meter_id: String,
    pub customer_id: String,
    pub transformer_id: String,
    pub outage_start: String,
    pub outage_end: String,
    pub outage_date: String,
    pub notes: String,
    pub latitude: String,
    pub longitude: String,
    pub name: String,
    pub location: String,
    pub status: String,
}

impl OutageRecord {
    /// Map a raw row onto a record. Cells beyond the end of the row read as
    /// empty strings; cells past column L are ignored.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |c: Column| row.get(c.index() as usize).cloned().unwrap_or_default();

        OutageRecord {
            meter_id: cell(Column::MeterId),
            customer_id: cell(Column::CustomerId),
            transformer_id: cell(Column::TransformerId),
            outage_start: cell(Column::OutageStart),
            outage_end: cell(Column::OutageEnd),
            outage_date: cell(Column::OutageDate),
            notes: cell(Column::Notes),
            latitude: cell(Column::Latitude),
            longitude: cell(Column::Longitude),
            name: cell(Column::Name),
            location: cell(Column::Location),
            status: cell(Column::Status),
        }
    }

    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::MeterId => &self.meter_id,
            Column::CustomerId => &self.customer_id,
            Column::TransformerId => &self.transformer_id,
            Column::OutageStart => &self.outage_start,
            Column::OutageEnd => &self.outage_end,
            Column::OutageDate => &self.outage_date,
            Column::Notes => &self.notes,
            Column::Latitude => &self.latitude,
            Column::Longitude => &self.longitude,
            Column::Name => &self.name,
            Column::Location => &self.location,
            Column::Status => &self.status,
        }
    }

    /// Row in column order, suitable for seeding a sheet.
    pub fn to_row(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.get(*c).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn column_indices_follow_sheet_letters() {
        assert_eq!(Column::MeterId.index(), 0);
        assert_eq!(Column::TransformerId.index(), 2);
        assert_eq!(Column::OutageDate.index(), 5);
        assert_eq!(Column::Status.index(), 11);
        assert_eq!(Column::last().index() as usize, Column::ALL.len() - 1);
    }

    #[test]
    fn short_row_fills_missing_cells_with_empty_strings() {
        let rec = OutageRecord::from_row(&row(&["m-1", "c-1", "TX-7"]));
        assert_eq!(rec.meter_id, "m-1");
        assert_eq!(rec.transformer_id, "TX-7");
        assert_eq!(rec.outage_start, "");
        assert_eq!(rec.status, "");
    }

    #[test]
    fn extra_cells_past_status_are_ignored() {
        let mut cells = row(&[
            "m-1", "c-1", "TX-7", "08:00", "12:00", "2024-05-01", "n", "13.7", "100.5", "Somchai",
            "Village 3", "1",
        ]);
        cells.push("stray".to_string());

        let rec = OutageRecord::from_row(&cells);
        assert_eq!(rec.status, "1");
        assert_eq!(rec.to_row().len(), 12);
        assert_eq!(rec.to_row()[..], cells[..12]);
    }
}
