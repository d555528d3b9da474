pub mod db;
pub mod domain;
pub mod sheets;

pub use domain::{Column, OutageRecord};
pub use sheets::{SheetError, SheetStore};
