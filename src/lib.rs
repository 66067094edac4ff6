//! Dependency-ordered parsing of OpenType and TrueType font files.
//!
//! [`FontFile::from_bytes`] reads the table directory, orders the table
//! parsers by their declared dependencies and returns an immutable model of
//! every table that parsed, together with the diagnostics collected for the
//! ones that did not.

use buffer::VeroBufReaderError;
use tables::TableEncodingError;
use thiserror::Error;

pub mod buffer;
pub mod font;
pub mod layout;
pub mod registry;
pub mod tables;
pub mod types;

pub use font::{FontFile, ParseOptions};
pub use registry::{Diagnostic, ParseContext, ParserRegistry, TableParser};
pub use tables::{FontTable, TableVariant};
pub use types::{F2Dot14, Fixed, GlyphId, Tag};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VeroTypeError {
    #[error(transparent)]
    TableEncodingError(#[from] TableEncodingError),

    #[error(transparent)]
    VeroBufReaderError(#[from] VeroBufReaderError),
}
