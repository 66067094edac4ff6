//! OpenType layout structures shared by GDEF, GSUB, GPOS and JSTF.
//!
//! Every `read` function takes the absolute position of the structure it
//! reads (its *base*). Offsets found inside a structure are turned into the
//! base of the child with [`VeroBufReader::resolve`] against the parent's
//! base, never against the start of the table or file.

mod class_def;
mod context;
mod coverage;
mod device;
mod lookup;
mod script;
mod table;
mod value_record;

pub use class_def::{ClassDefinitionTable, ClassRangeRecord};
pub use context::{
    ChainedSequenceContext, ChainedSequenceRule, SequenceContext, SequenceLookupRecord,
    SequenceRule,
};
pub use coverage::{CoverageTable, RangeRecord};
pub use device::DeviceTable;
pub use lookup::{LookupFlag, LookupKind, LookupListTable, LookupTable, SubtableConstructor};
pub use script::{
    FeatureListTable, FeatureRecord, FeatureTable, LangSysRecord, LangSysTable, ScriptListTable,
    ScriptRecord, ScriptTable,
};
pub use table::LayoutTable;
pub use value_record::{ValueFormat, ValueRecord};

use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader},
    registry::ParseContext,
    tables::TableEncodingError,
};

/// Reads a u16 count followed by that many values
pub(crate) fn read_counted<T: ReadBe>(reader: &mut VeroBufReader<'_>) -> Result<Vec<T>, VeroTypeError> {
    let count = usize::from(reader.read_u16()?);

    Ok(reader.read_array(count)?)
}

/// Resolves a 16-bit offset where zero means "not present"
pub(crate) fn resolve_nullable(
    reader: &VeroBufReader<'_>,
    base: usize,
    offset: u16,
) -> Result<Option<usize>, VeroTypeError> {
    if offset == 0 {
        return Ok(None);
    }

    Ok(Some(reader.resolve(base, usize::from(offset))?))
}

/// Reads a 16-bit offset at the cursor and the coverage table behind it,
/// leaving the cursor after the offset
pub(crate) fn read_coverage_offset(
    reader: &mut VeroBufReader<'_>,
    base: usize,
) -> Result<CoverageTable, VeroTypeError> {
    let offset = usize::from(reader.read_u16()?);
    let end = reader.position();
    let pos = reader.resolve(base, offset)?;
    let coverage = CoverageTable::read(reader, pos)?;
    reader.seek_to(end)?;

    Ok(coverage)
}

/// Reads the format of a subtable that only defines format 1
pub(crate) fn expect_format(reader: &mut VeroBufReader<'_>, kind: &'static str) -> Result<(), VeroTypeError> {
    match reader.read_u16()? {
        1 => Ok(()),
        format => Err(TableEncodingError::UnsupportedSubtableFormat { kind, format }.into()),
    }
}

/// Reads every coverage table behind `offsets`
pub(crate) fn read_coverages(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offsets: &[u16],
) -> Result<Vec<CoverageTable>, VeroTypeError> {
    offsets
        .iter()
        .map(|&offset| {
            let pos = reader.resolve(base, usize::from(offset))?;
            CoverageTable::read(reader, pos)
        })
        .collect()
}

/// Reads the structure behind an optional offset from `base`.
///
/// A null offset yields `None` quietly; a structure that fails to read is
/// reported through `ctx` and also yields `None`.
pub(crate) fn read_reported<T>(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offset: usize,
    ctx: &mut ParseContext<'_>,
    read: impl FnOnce(&mut VeroBufReader<'_>, usize, &mut ParseContext<'_>) -> Result<T, VeroTypeError>,
) -> Option<T> {
    if offset == 0 {
        return None;
    }

    let result = reader
        .resolve(base, offset)
        .map_err(VeroTypeError::from)
        .and_then(|pos| read(reader, pos, ctx));
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            ctx.report(err);
            None
        }
    }
}
