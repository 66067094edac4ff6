use super::{FontTable, TableEncodingError, TableMetadata, maxp::Maxp};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::LTSH,
    requires: &[Tag::MAXP],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Ltsh::from_context(ctx)?.into())
}

/// The [LTSH table](https://learn.microsoft.com/en-us/typography/opentype/spec/ltsh):
/// the pixel size from which each glyph scales linearly
#[derive(Debug, Clone)]
pub struct Ltsh {
    pub metadata: TableMetadata,
    pub version: u16,
    pub y_pels: Vec<u8>,
}

impl Ltsh {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let expected = ctx.require::<Maxp>()?.num_glyphs;

        let mut reader = ctx.reader();
        let version = reader.read_u16()?;
        let num_glyphs = reader.read_u16()?;
        if num_glyphs != expected {
            ctx.report(TableEncodingError::InvalidData("LTSH glyph count differs from maxp"));
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            y_pels: reader.read_bytes(usize::from(num_glyphs))?.to_vec(),
        })
    }

    pub fn y_pel(&self, glyph: GlyphId) -> Option<u8> {
        self.y_pels.get(usize::from(glyph)).copied()
    }
}
