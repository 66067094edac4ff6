use super::{FontTable, TableEncodingError, TableMetadata, hhea::Hhea, maxp::Maxp};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::HMTX,
    requires: &[Tag::HHEA, Tag::MAXP],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Hmtx::from_context(ctx)?.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LongHorMetric {
    pub advance_width: u16,
    pub left_side_bearing: i16,
}

impl ReadBe for LongHorMetric {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            advance_width: reader.read_u16()?,
            left_side_bearing: reader.read_i16()?,
        })
    }
}

/// The [hmtx table](https://learn.microsoft.com/en-us/typography/opentype/spec/hmtx),
/// expanded to one metric per glyph
#[derive(Debug, Clone)]
pub struct Hmtx {
    pub metadata: TableMetadata,
    /// Indexed by glyph id. Glyphs past `numberOfHMetrics` repeat the last
    /// explicit advance with their own side bearing.
    pub metrics: Vec<LongHorMetric>,
}

impl Hmtx {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let num_h_metrics = usize::from(ctx.require::<Hhea>()?.number_of_h_metrics);
        let num_glyphs = usize::from(ctx.require::<Maxp>()?.num_glyphs);

        if num_h_metrics == 0 && num_glyphs > 0 {
            return Err(TableEncodingError::InvalidData("hhea.numberOfHMetrics is zero").into());
        }

        let mut reader = ctx.reader();
        let mut metrics = reader.read_array::<LongHorMetric>(num_h_metrics)?;
        let last_advance = metrics.last().map_or(0, |m| m.advance_width);

        let trailing = num_glyphs.saturating_sub(num_h_metrics);
        let available = trailing.min(reader.remaining() / 2);
        let bearings = reader.read_array::<i16>(available)?;
        if available < trailing {
            ctx.report(TableEncodingError::InvalidData(
                "left side bearing array is truncated",
            ));
        }

        metrics.extend(
            bearings
                .into_iter()
                .chain(std::iter::repeat(0))
                .take(trailing)
                .map(|left_side_bearing| LongHorMetric {
                    advance_width: last_advance,
                    left_side_bearing,
                }),
        );

        Ok(Self {
            metadata: ctx.metadata(),
            metrics,
        })
    }

    pub fn metric(&self, glyph: GlyphId) -> Option<LongHorMetric> {
        self.metrics.get(usize::from(glyph)).copied()
    }
}
