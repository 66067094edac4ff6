use super::{
    FontTable, TableEncodingError, TableMetadata,
    head::{Head, IndexToLocFormat},
    maxp::Maxp,
};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::LOCA,
    requires: &[Tag::HEAD, Tag::MAXP],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Loca::from_context(ctx)?.into())
}

/// The [loca table](https://learn.microsoft.com/en-us/typography/opentype/spec/loca)
#[derive(Debug, Clone)]
pub struct Loca {
    pub metadata: TableMetadata,
    pub format: IndexToLocFormat,
    /// `numGlyphs + 1` byte offsets into `glyf`, already scaled for the
    /// short format
    pub offsets: Vec<u32>,
}

impl Loca {
    /// Reads `numGlyphs + 1` offsets in the format `head` declares.
    ///
    /// Offsets that go backwards are kept as read and reported once.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let format = ctx.require::<Head>()?.loca_format();
        let count = usize::from(ctx.require::<Maxp>()?.num_glyphs) + 1;

        let mut reader = ctx.reader();
        let offsets = match format {
            IndexToLocFormat::Short => reader
                .read_array::<u16>(count)?
                .into_iter()
                .map(|offset| u32::from(offset) * 2)
                .collect(),
            IndexToLocFormat::Long => reader.read_array::<u32>(count)?,
        };

        if offsets.windows(2).any(|pair| pair[1] < pair[0]) {
            ctx.report(TableEncodingError::InvalidData("loca offsets are not sorted"));
        }

        Ok(Self {
            metadata: ctx.metadata(),
            format,
            offsets,
        })
    }

    /// Number of glyphs covered
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `[start, end)` byte range of a glyph in `glyf`
    pub fn glyph_range(&self, glyph: GlyphId) -> Option<(u32, u32)> {
        let index = usize::from(glyph);
        let start = *self.offsets.get(index)?;
        let end = *self.offsets.get(index + 1)?;

        Some((start, end))
    }
}
