pub mod outage_record;

pub use outage_record::{Column, OutageRecord};
