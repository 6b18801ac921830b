//! Flattening route XML exports into spreadsheet-friendly tables.

pub mod batch;
pub mod convert;
pub mod error;
pub mod geo_distance;
pub mod inputs;
pub mod route;
pub mod source_text;
pub mod table_writer;
pub mod xml_fields;

pub use convert::{ConvertOptions, run_convert};
pub use error::{ConvertError, SourceError};
