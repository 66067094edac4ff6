use super::{FontTable, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{Fixed, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::HHEA,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Hhea::from_context(ctx)?.into())
}

/// The [hhea table](https://learn.microsoft.com/en-us/typography/opentype/spec/hhea)
#[derive(Debug, Clone)]
pub struct Hhea {
    pub metadata: TableMetadata,
    pub version: Fixed,
    /// Distance from baseline to highest ascender
    pub ascender: i16,
    /// Distance from baseline to lowest descender
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub metric_data_format: i16,
    /// Number of advance/bearing pairs in `hmtx`
    pub number_of_h_metrics: u16,
}

impl Hhea {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_fixed()?;
        let ascender = reader.read_i16()?;
        let descender = reader.read_i16()?;
        let line_gap = reader.read_i16()?;
        let advance_width_max = reader.read_u16()?;
        let min_left_side_bearing = reader.read_i16()?;
        let min_right_side_bearing = reader.read_i16()?;
        let x_max_extent = reader.read_i16()?;
        let caret_slope_rise = reader.read_i16()?;
        let caret_slope_run = reader.read_i16()?;
        let caret_offset = reader.read_i16()?;
        // four reserved words
        reader.skip(8)?;

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            ascender,
            descender,
            line_gap,
            advance_width_max,
            min_left_side_bearing,
            min_right_side_bearing,
            x_max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            metric_data_format: reader.read_i16()?,
            number_of_h_metrics: reader.read_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn reads_metrics_header() {
        let mut data = vec![0, 1, 0, 0];
        for v in [800i16, -200, 90, 1200, -50, -30, 1100, 1, 0, 0, 0, 0, 0, 0, 0] {
            data.extend(v.to_be_bytes());
        }
        data.extend(7u16.to_be_bytes());

        let mut diagnostics = Diagnostics::default();
        let hhea = Hhea::from_context(&mut ParseContext::standalone(Tag::HHEA, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(data.len(), 36);
        assert_eq!((hhea.ascender, hhea.descender, hhea.line_gap), (800, -200, 90));
        assert_eq!(hhea.advance_width_max, 1200);
        assert_eq!(hhea.caret_slope_rise, 1);
        assert_eq!(hhea.number_of_h_metrics, 7);
    }
}
