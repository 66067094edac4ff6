use bitflags::bitflags;

use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{Fixed, LongDateTime, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::HEAD,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Head::from_context(ctx)?.into())
}

/// Expected value of `magic_number`
pub const HEAD_MAGIC: u32 = 0x5F0F_3CF5;

bitflags! {
    /// Represents the flags field of the 'head' table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeadFlags: u16 {
        /// Bit 0: The Y value of 0 specifies the baseline.
        const Y_VALUE_ZERO_IS_BASELINE = 1 << 0;
        /// Bit 1: x position of left most black bit is LSB.
        const X_POS_LEFTMOST_BLACK_BIT_LSB = 1 << 1;
        /// Bit 2: Scaled point size and actual point size will differ
        /// (e.g. for hinting purposes).
        const SCALED_POINT_SIZE_DIFFERS = 1 << 2;
        /// Bit 3: Use integer scaling instead of fractional.
        const USE_INTEGER_SCALING = 1 << 3;
        /// Bit 4: Used by the Microsoft implementation of the TrueType scaler.
        const MICROSOFT_SCALER = 1 << 4;
        /// Bit 5: The font is intended to be laid out vertically and x = 0
        /// is the vertical baseline.
        const VERTICAL_LAYOUT = 1 << 5;
        /// Bit 7: The font requires layout for correct linguistic rendering
        /// (e.g. Arabic fonts).
        const REQUIRES_LINGUISTIC_LAYOUT = 1 << 7;
        /// Bit 8: An AAT font with metamorphosis effects on by default.
        const AAT_DEFAULT_METAMORPHOSIS = 1 << 8;
        /// Bit 9: The font contains strong right-to-left glyphs.
        const STRONG_RTL_GLYPHS = 1 << 9;
        /// Bit 10: The font contains Indic-style rearrangement effects.
        const INDIC_REARRANGEMENT = 1 << 10;
        /// Bit 11: Font data is lossless compressed.
        const LOSSLESS = 1 << 11;
        /// Bit 12: Font converted, producing compatible metrics.
        const CONVERTED = 1 << 12;
        /// Bit 13: Font optimized for ClearType.
        const CLEARTYPE_OPTIMIZED = 1 << 13;
        /// Bit 14: The glyphs are generic symbols for code point ranges,
        /// such as in a last resort font.
        const LAST_RESORT = 1 << 14;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MacStyle: u16 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const OUTLINE = 1 << 3;
        const SHADOW = 1 << 4;
        const CONDENSED = 1 << 5;
        const EXTENDED = 1 << 6;
    }
}

/// Format of the `loca` offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexToLocFormat {
    /// Offsets are u16 values holding half the real offset
    Short,
    Long,
}

/// A representation of the [head table](https://learn.microsoft.com/en-us/typography/opentype/spec/head)
#[derive(Debug, Clone)]
pub struct Head {
    pub metadata: TableMetadata,

    /// The version of the head table, 1.0
    pub version: Fixed,

    /// Font revision set by the font author/manufacturer
    pub font_revision: Fixed,

    /// To compute: set it to 0, sum the entire font as a uint32,
    /// then store 0xB1B0AFBA - sum.
    pub checksum_adjustment: u32,

    /// Magic number, always set to 0x5F0F3CF5
    pub magic_number: u32,

    /// The flags which guide font rendering and processing
    pub flags: HeadFlags,

    /// Units per em (ranges from 16 to 16384)
    pub units_per_em: u16,

    /// Date the font was created
    pub created: LongDateTime,

    /// Date the font was last modified
    pub modified: LongDateTime,

    /// Bounding box over all glyphs
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,

    pub mac_style: MacStyle,

    /// Smallest readable size in pixels
    pub lowest_rec_ppem: u16,

    /// Deprecated, set to 2
    pub font_direction_hint: i16,

    /// 0 for short offsets and 1 for long
    pub index_to_loc_format: i16,

    /// 0 for the current format
    pub glyph_data_format: i16,
}

impl Head {
    /// Reads the head table.
    ///
    /// A wrong magic number is reported but the table is still returned.
    ///
    /// # Errors
    ///
    /// Fails on a major version other than 1 or when the table is shorter
    /// than its 54 bytes.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();

        let version = reader.read_fixed()?;
        if version.to_bits() >> 16 != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::HEAD,
                version: version.to_bits() as u32,
            }
            .into());
        }

        let head = Self {
            metadata: ctx.metadata(),
            version,
            font_revision: reader.read_fixed()?,
            checksum_adjustment: reader.read_u32()?,
            magic_number: reader.read_u32()?,
            flags: HeadFlags::from_bits_retain(reader.read_u16()?),
            units_per_em: reader.read_u16()?,
            created: reader.read_i64()?,
            modified: reader.read_i64()?,
            x_min: reader.read_i16()?,
            y_min: reader.read_i16()?,
            x_max: reader.read_i16()?,
            y_max: reader.read_i16()?,
            mac_style: MacStyle::from_bits_retain(reader.read_u16()?),
            lowest_rec_ppem: reader.read_u16()?,
            font_direction_hint: reader.read_i16()?,
            index_to_loc_format: reader.read_i16()?,
            glyph_data_format: reader.read_i16()?,
        };

        if head.magic_number != HEAD_MAGIC {
            ctx.report(TableEncodingError::InvalidMagicNumber {
                expected: HEAD_MAGIC,
                found: head.magic_number,
            });
        }

        Ok(head)
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// `loca` offset format; anything other than 0 is treated as long
    pub fn loca_format(&self) -> IndexToLocFormat {
        match self.index_to_loc_format {
            0 => IndexToLocFormat::Short,
            _ => IndexToLocFormat::Long,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    pub(crate) fn head_bytes(units_per_em: u16, magic: u32, loca_format: i16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(0x0001_0000u32.to_be_bytes());
        data.extend(0x0002_8000u32.to_be_bytes());
        data.extend(0u32.to_be_bytes());
        data.extend(magic.to_be_bytes());
        data.extend(0x000Bu16.to_be_bytes());
        data.extend(units_per_em.to_be_bytes());
        data.extend([0u8; 16]);
        for v in [-10i16, -200, 900, 800] {
            data.extend(v.to_be_bytes());
        }
        data.extend(0x0003u16.to_be_bytes());
        data.extend(8u16.to_be_bytes());
        data.extend(2i16.to_be_bytes());
        data.extend(loca_format.to_be_bytes());
        data.extend(0i16.to_be_bytes());
        data
    }

    #[test]
    fn reads_all_fields() {
        let data = head_bytes(1000, HEAD_MAGIC, 1);
        let mut diagnostics = Diagnostics::default();
        let head = Head::from_context(&mut ParseContext::standalone(Tag::HEAD, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(data.len(), 54);
        assert_eq!(head.units_per_em(), 1000);
        assert_eq!(head.font_revision.to_f32(), 2.5);
        assert!(head.flags.contains(HeadFlags::Y_VALUE_ZERO_IS_BASELINE | HeadFlags::USE_INTEGER_SCALING));
        assert_eq!(head.mac_style, MacStyle::BOLD | MacStyle::ITALIC);
        assert_eq!((head.x_min, head.y_min, head.x_max, head.y_max), (-10, -200, 900, 800));
        assert_eq!(head.lowest_rec_ppem, 8);
        assert_eq!(head.loca_format(), IndexToLocFormat::Long);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn bad_magic_is_reported_not_fatal() {
        let data = head_bytes(2048, 0xDEAD_BEEF, 0);
        let mut diagnostics = Diagnostics::default();
        let head = Head::from_context(&mut ParseContext::standalone(Tag::HEAD, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(head.units_per_em(), 2048);
        assert_eq!(head.loca_format(), IndexToLocFormat::Short);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.tag, Tag::HEAD);
        assert_eq!(
            diagnostic.error,
            TableEncodingError::InvalidMagicNumber {
                expected: HEAD_MAGIC,
                found: 0xDEAD_BEEF
            }
            .into()
        );
    }

    #[test]
    fn truncated_table_fails() {
        let data = head_bytes(1000, HEAD_MAGIC, 0);
        let mut diagnostics = Diagnostics::default();
        let result = Head::from_context(&mut ParseContext::standalone(
            Tag::HEAD,
            &data[..40],
            &mut diagnostics,
        ));

        assert!(result.is_err());
    }
}
