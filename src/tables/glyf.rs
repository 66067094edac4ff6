use super::{FontTable, TableEncodingError, TableMetadata, loca::Loca, maxp::Maxp};
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::GLYF,
    requires: &[Tag::LOCA, Tag::MAXP],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Glyf::from_context(ctx)?.into())
}

/// The fixed header in front of every non-empty glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphHeader {
    /// Negative for composite glyphs
    pub number_of_contours: i16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl GlyphHeader {
    pub fn is_composite(&self) -> bool {
        self.number_of_contours < 0
    }
}

/// The [glyf table](https://learn.microsoft.com/en-us/typography/opentype/spec/glyf),
/// split into per-glyph byte ranges using `loca`.
///
/// Outlines are not decoded.
#[derive(Debug, Clone)]
pub struct Glyf {
    pub metadata: TableMetadata,
    data: Vec<u8>,
    /// One `[start, end)` range per glyph; ranges `loca` got wrong are empty
    ranges: Vec<(usize, usize)>,
}

impl Glyf {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let loca = ctx.require::<Loca>()?;
        let num_glyphs = ctx.require::<Maxp>()?.num_glyphs;
        let data = ctx.data();

        let mut bad_ranges = 0usize;
        let ranges = (0..num_glyphs)
            .map(|glyph| match loca.glyph_range(glyph) {
                Some((start, end)) if start <= end && end as usize <= data.len() => {
                    (start as usize, end as usize)
                }
                _ => {
                    bad_ranges += 1;
                    (0, 0)
                }
            })
            .collect();

        if bad_ranges > 0 {
            log::debug!("{bad_ranges} glyphs have unusable loca ranges");
            ctx.report(TableEncodingError::InvalidData(
                "loca range outside of the glyf table",
            ));
        }

        Ok(Self {
            metadata: ctx.metadata(),
            data: data.to_vec(),
            ranges,
        })
    }

    pub fn num_glyphs(&self) -> usize {
        self.ranges.len()
    }

    /// The glyph's own bytes, empty for glyphs without an outline
    pub fn raw_glyph_data(&self, glyph: GlyphId) -> Option<&[u8]> {
        let &(start, end) = self.ranges.get(usize::from(glyph))?;

        self.data.get(start..end)
    }

    /// The glyph's outline bytes. A glyph without an outline resolves to
    /// glyph 0's bytes.
    pub fn glyph_data(&self, glyph: GlyphId) -> Option<&[u8]> {
        let data = self.raw_glyph_data(glyph)?;
        if data.is_empty() && glyph != 0 {
            return self.raw_glyph_data(0);
        }

        Some(data)
    }

    /// The header of the glyph returned by [`Glyf::glyph_data`]
    pub fn glyph_header(&self, glyph: GlyphId) -> Option<GlyphHeader> {
        let mut reader = VeroBufReader::new(self.glyph_data(glyph)?);

        Some(GlyphHeader {
            number_of_contours: reader.read_i16().ok()?,
            x_min: reader.read_i16().ok()?,
            y_min: reader.read_i16().ok()?,
            x_max: reader.read_i16().ok()?,
            y_max: reader.read_i16().ok()?,
        })
    }
}
