use super::{FontTable, TableEncodingError, TableMetadata, maxp::Maxp};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::HDMX,
    requires: &[Tag::MAXP],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Hdmx::from_context(ctx)?.into())
}

/// The [hdmx table](https://learn.microsoft.com/en-us/typography/opentype/spec/hdmx):
/// hinted advance widths at specific pixel sizes
#[derive(Debug, Clone)]
pub struct Hdmx {
    pub metadata: TableMetadata,
    pub version: u16,
    pub records: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub pixel_size: u8,
    pub max_width: u8,
    /// One width per glyph
    pub widths: Vec<u8>,
}

impl Hdmx {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let num_glyphs = usize::from(ctx.require::<Maxp>()?.num_glyphs);

        let mut reader = ctx.reader();
        let version = reader.read_u16()?;
        let count = usize::try_from(reader.read_i16()?)
            .map_err(|_| TableEncodingError::InvalidData("negative hdmx record count"))?;
        let record_size = reader.read_i32()? as usize;
        if record_size < num_glyphs + 2 {
            return Err(TableEncodingError::InvalidData("hdmx records too small for numGlyphs").into());
        }
        reader.check_remaining(count, record_size)?;

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let start = reader.position();
            records.push(DeviceRecord {
                pixel_size: reader.read_u8()?,
                max_width: reader.read_u8()?,
                widths: reader.read_bytes(num_glyphs)?.to_vec(),
            });
            reader.seek_to(start + record_size)?;
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            records,
        })
    }

    /// The hinted advance of `glyph` at `pixel_size`, if that size is listed
    pub fn width(&self, pixel_size: u8, glyph: GlyphId) -> Option<u8> {
        self.records
            .iter()
            .find(|record| record.pixel_size == pixel_size)?
            .widths
            .get(usize::from(glyph))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn padded_device_records() {
        let maxp: FontTable = {
            let mut scratch = Diagnostics::default();
            Maxp::from_context(&mut ParseContext::standalone(Tag::MAXP, &[0, 0, 0x50, 0, 0, 3], &mut scratch))
                .unwrap()
                .into()
        };
        let data = [
            0, 0, 0, 2, 0, 0, 0, 8, //
            12, 9, 6, 7, 9, 0, 0, 0, //
            16, 12, 8, 9, 12, 0, 0, 0,
        ];

        let mut diagnostics = Diagnostics::default();
        let hdmx = {
            let mut ctx = ParseContext::standalone(Tag::HDMX, &data, &mut diagnostics).with_dependency(&maxp);
            Hdmx::from_context(&mut ctx).unwrap()
        };

        assert_eq!(hdmx.records.len(), 2);
        assert_eq!(hdmx.records[1].max_width, 12);
        assert_eq!(hdmx.width(12, 2), Some(9));
        assert_eq!(hdmx.width(16, 0), Some(8));
        assert_eq!(hdmx.width(14, 0), None);
    }
}
