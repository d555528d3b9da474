pub mod a1;
pub mod auth;
pub mod google;
pub mod memory;

pub use a1::{A1Range, CellRef};
pub use auth::{AccessTokenSource, ServiceAccountCredentials, ServiceAccountTokenSource, StaticToken};
pub use google::{GoogleSheetsClient, GoogleSheetsConfig};
pub use memory::InMemorySheet;

#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheets api returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid range '{0}'")]
    InvalidRange(String),
}

/// One cell write within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub cell: CellRef,
    pub value: String,
}

impl CellUpdate {
    pub fn new(cell: CellRef, value: impl Into<String>) -> Self {
        Self {
            cell,
            value: value.into(),
        }
    }
}

/// Range-addressed access to a worksheet.
///
/// Reads return rows as strings with trailing empty cells trimmed, the way
/// the Sheets API reports them. A batch write is a single upstream call; there
/// is no atomicity across the cells it contains.
#[async_trait::async_trait]
pub trait SheetStore: Send + Sync {
    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<String>>, SheetError>;

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<(), SheetError>;

    async fn write_cell(&self, cell: &CellRef, value: &str) -> Result<(), SheetError> {
        self.write_cells(&[CellUpdate::new(cell.clone(), value)]).await
    }
}
