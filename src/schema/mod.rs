//! Export readers
//!
//! This module turns the supported input forms into records or tables:
//! XML health exports (streamed into hierarchical records), CSV record dumps,
//! and structured values previously stored in a cache.

mod cached;
mod csv_dump;
mod xml;

pub use cached::CachedValue;
pub use csv_dump::read_csv_table;
pub use xml::XmlExportReader;
