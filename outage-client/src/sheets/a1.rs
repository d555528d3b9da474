//! A1 notation for worksheet ranges and cells.
//!
//! Columns are zero-based internally (A = 0); rows are one-based, as in the
//! spreadsheet UI.

use std::fmt;

use super::SheetError;

/// Convert a zero-based column index to its letter form (0 -> A, 26 -> AA).
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Parse column letters (case-insensitive) into a zero-based index.
pub fn parse_column_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut acc: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        acc = acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(acc - 1)
}

fn write_sheet_name(f: &mut fmt::Formatter<'_>, sheet: &str) -> fmt::Result {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        write!(f, "{sheet}")
    } else {
        write!(f, "'{}'", sheet.replace('\'', "''"))
    }
}

/// Split `Sheet1!A2:L` into the unquoted sheet name and the cell part.
fn split_sheet(input: &str) -> Result<(String, &str), SheetError> {
    let invalid = || SheetError::InvalidRange(input.to_string());

    if let Some(rest) = input.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                let tail = &rest[i + 1..];
                let cells = tail.strip_prefix('!').ok_or_else(invalid)?;
                return Ok((name, cells));
            }
            name.push(c);
        }
        return Err(invalid());
    }

    let (sheet, cells) = input.split_once('!').ok_or_else(invalid)?;
    if sheet.is_empty() {
        return Err(invalid());
    }
    Ok((sheet.to_string(), cells))
}

/// Split `AB12` into (column, optional row).
fn split_cell(cell: &str) -> Option<(u32, Option<u32>)> {
    let digits_at = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(digits_at);
    let column = parse_column_letters(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(row)
    };
    Some((column, row))
}

/// A single cell, e.g. `Sheet1!L7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub sheet: String,
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(sheet: impl Into<String>, column: u32, row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            column,
            row,
        }
    }

    pub fn parse(input: &str) -> Result<Self, SheetError> {
        let (sheet, cell) = split_sheet(input)?;
        match split_cell(cell) {
            Some((column, Some(row))) => Ok(Self { sheet, column, row }),
            _ => Err(SheetError::InvalidRange(input.to_string())),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheet_name(f, &self.sheet)?;
        write!(f, "!{}{}", column_letters(self.column), self.row)
    }
}

/// A rectangular range. `end_row == None` means "to the last populated row",
/// as in `Sheet1!A2:L`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start_column: u32,
    pub start_row: u32,
    pub end_column: u32,
    pub end_row: Option<u32>,
}

impl A1Range {
    /// Open-ended range from `start_row` down, spanning the given columns.
    pub fn columns(sheet: impl Into<String>, start_column: u32, end_column: u32, start_row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            start_column,
            start_row,
            end_column,
            end_row: None,
        }
    }

    pub fn parse(input: &str) -> Result<Self, SheetError> {
        let invalid = || SheetError::InvalidRange(input.to_string());
        let (sheet, cells) = split_sheet(input)?;

        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_column, start_row) = split_cell(start).ok_or_else(invalid)?;
        let (end_column, end_row) = split_cell(end).ok_or_else(invalid)?;

        let start_row = start_row.unwrap_or(1);
        if end_column < start_column || end_row.is_some_and(|r| r < start_row) {
            return Err(invalid());
        }

        Ok(Self {
            sheet,
            start_column,
            start_row,
            end_column,
            end_row,
        })
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheet_name(f, &self.sheet)?;
        write!(
            f,
            "!{}{}:{}",
            column_letters(self.start_column),
            self.start_row,
            column_letters(self.end_column)
        )?;
        if let Some(row) = self.end_row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}
