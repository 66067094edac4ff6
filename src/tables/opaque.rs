use super::{FontTable, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const FPGM_PARSER: TableParser = TableParser {
    tag: Tag::FPGM,
    requires: &[],
    optional: &[],
    parse,
};

pub const PREP_PARSER: TableParser = TableParser {
    tag: Tag::PREP,
    requires: &[],
    optional: &[],
    parse,
};

pub const CVT_PARSER: TableParser = TableParser {
    tag: Tag::CVT,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(OpaqueTable::from_context(ctx).into())
}

/// A table kept as uninterpreted bytes: the TrueType instruction tables
/// `fpgm` and `prep`, and the control values in `cvt `.
#[derive(Debug, Clone)]
pub struct OpaqueTable {
    pub metadata: TableMetadata,
    pub data: Vec<u8>,
}

impl OpaqueTable {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Self {
        Self {
            metadata: ctx.metadata(),
            data: ctx.data().to_vec(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.metadata.tag
    }

    /// `cvt ` entries as signed FUnits; a trailing odd byte is ignored
    pub fn control_values(&self) -> impl Iterator<Item = i16> + '_ {
        self.data
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn keeps_bytes_verbatim() {
        let data = [0x00, 0x64, 0xFF, 0x9C, 0x07];
        let mut diagnostics = Diagnostics::default();
        let table = OpaqueTable::from_context(&mut ParseContext::standalone(Tag::CVT, &data, &mut diagnostics));

        assert_eq!(table.data, data);
        assert_eq!(table.control_values().collect::<Vec<_>>(), vec![100, -100]);
        assert!(diagnostics.is_empty());
    }
}
