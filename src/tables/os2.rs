use bitflags::bitflags;

use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::OS2,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Os2::from_context(ctx)?.into())
}

bitflags! {
    /// Font selection flags (`fsSelection`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FsSelection: u16 {
        const ITALIC = 1 << 0;
        const UNDERSCORE = 1 << 1;
        const NEGATIVE = 1 << 2;
        const OUTLINED = 1 << 3;
        const STRIKEOUT = 1 << 4;
        const BOLD = 1 << 5;
        const REGULAR = 1 << 6;
        /// The typo metrics are the ones to use for line layout
        const USE_TYPO_METRICS = 1 << 7;
        const WWS = 1 << 8;
        const OBLIQUE = 1 << 9;
    }
}

/// The [OS/2 table](https://learn.microsoft.com/en-us/typography/opentype/spec/os2).
///
/// Fields introduced after version 0 are grouped and only present when the
/// table version carries them.
#[derive(Debug, Clone)]
pub struct Os2 {
    pub metadata: TableMetadata,
    pub version: u16,
    pub x_avg_char_width: i16,
    pub weight_class: u16,
    pub width_class: u16,
    /// Embedding licensing rights
    pub fs_type: u16,
    pub subscript_x_size: i16,
    pub subscript_y_size: i16,
    pub subscript_x_offset: i16,
    pub subscript_y_offset: i16,
    pub superscript_x_size: i16,
    pub superscript_y_size: i16,
    pub superscript_x_offset: i16,
    pub superscript_y_offset: i16,
    pub strikeout_size: i16,
    pub strikeout_position: i16,
    pub family_class: i16,
    pub panose: [u8; 10],
    pub unicode_range: [u32; 4],
    pub vendor_id: Tag,
    pub fs_selection: FsSelection,
    pub first_char_index: u16,
    pub last_char_index: u16,
    pub typo_ascender: i16,
    pub typo_descender: i16,
    pub typo_line_gap: i16,
    pub win_ascent: u16,
    pub win_descent: u16,
    /// Version 1 and later
    pub code_page_range: Option<[u32; 2]>,
    /// Version 2 and later
    pub v2: Option<Os2V2>,
    /// Version 5: `(lower, upper)` optical size range in TWIPs
    pub optical_point_size: Option<(u16, u16)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Os2V2 {
    pub x_height: i16,
    pub cap_height: i16,
    pub default_char: u16,
    pub break_char: u16,
    pub max_context: u16,
}

impl Os2 {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u16()?;
        if version > 5 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::OS2,
                version: u32::from(version),
            }
            .into());
        }

        let mut os2 = Self {
            metadata: ctx.metadata(),
            version,
            x_avg_char_width: reader.read_i16()?,
            weight_class: reader.read_u16()?,
            width_class: reader.read_u16()?,
            fs_type: reader.read_u16()?,
            subscript_x_size: reader.read_i16()?,
            subscript_y_size: reader.read_i16()?,
            subscript_x_offset: reader.read_i16()?,
            subscript_y_offset: reader.read_i16()?,
            superscript_x_size: reader.read_i16()?,
            superscript_y_size: reader.read_i16()?,
            superscript_x_offset: reader.read_i16()?,
            superscript_y_offset: reader.read_i16()?,
            strikeout_size: reader.read_i16()?,
            strikeout_position: reader.read_i16()?,
            family_class: reader.read_i16()?,
            panose: reader.read_array_fixed::<10>()?,
            unicode_range: [
                reader.read_u32()?,
                reader.read_u32()?,
                reader.read_u32()?,
                reader.read_u32()?,
            ],
            vendor_id: reader.read_tag()?,
            fs_selection: FsSelection::from_bits_retain(reader.read_u16()?),
            first_char_index: reader.read_u16()?,
            last_char_index: reader.read_u16()?,
            typo_ascender: reader.read_i16()?,
            typo_descender: reader.read_i16()?,
            typo_line_gap: reader.read_i16()?,
            win_ascent: reader.read_u16()?,
            win_descent: reader.read_u16()?,
            code_page_range: None,
            v2: None,
            optical_point_size: None,
        };

        if version >= 1 {
            os2.code_page_range = Some([reader.read_u32()?, reader.read_u32()?]);
        }
        if version >= 2 {
            os2.v2 = Some(Os2V2 {
                x_height: reader.read_i16()?,
                cap_height: reader.read_i16()?,
                default_char: reader.read_u16()?,
                break_char: reader.read_u16()?,
                max_context: reader.read_u16()?,
            });
        }
        if version >= 5 {
            os2.optical_point_size = Some((reader.read_u16()?, reader.read_u16()?));
        }

        Ok(os2)
    }

    pub fn use_typo_metrics(&self) -> bool {
        self.fs_selection.contains(FsSelection::USE_TYPO_METRICS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    fn os2_bytes(version: u16) -> Vec<u8> {
        let mut data = version.to_be_bytes().to_vec();
        data.extend(500i16.to_be_bytes());
        data.extend(700u16.to_be_bytes());
        data.extend(5u16.to_be_bytes());
        data.extend([0; 24]);
        data.extend([2, 0, 5, 3, 0, 0, 0, 0, 0, 0]);
        data.extend([0; 16]);
        data.extend(b"ABCD");
        data.extend(0x00A0u16.to_be_bytes());
        data.extend([0, 0x20, 0xFF, 0xFF]);
        for v in [800i16, -200, 100] {
            data.extend(v.to_be_bytes());
        }
        data.extend([0x03, 0xE8, 0x01, 0x2C]);
        if version >= 1 {
            data.extend([0; 8]);
        }
        if version >= 2 {
            for v in [480u16, 700, 0, 32, 3] {
                data.extend(v.to_be_bytes());
            }
        }
        if version >= 5 {
            data.extend([0, 10, 0x03, 0xE8]);
        }
        data
    }

    fn read(data: &[u8]) -> Result<Os2, VeroTypeError> {
        let mut diagnostics = Diagnostics::default();
        Os2::from_context(&mut ParseContext::standalone(Tag::OS2, data, &mut diagnostics))
    }

    #[test]
    fn version_0() {
        let data = os2_bytes(0);
        let os2 = read(&data).unwrap();

        assert_eq!(data.len(), 78);
        assert_eq!(os2.weight_class, 700);
        assert_eq!(os2.panose[2], 5);
        assert_eq!(os2.vendor_id, Tag::new(*b"ABCD"));
        assert!(os2.use_typo_metrics());
        assert!(os2.fs_selection.contains(FsSelection::BOLD));
        assert_eq!((os2.typo_ascender, os2.typo_descender, os2.typo_line_gap), (800, -200, 100));
        assert_eq!((os2.win_ascent, os2.win_descent), (1000, 300));
        assert_eq!(os2.code_page_range, None);
        assert_eq!(os2.v2, None);
    }

    #[test]
    fn version_5_has_every_group() {
        let os2 = read(&os2_bytes(5)).unwrap();

        assert_eq!(os2.code_page_range, Some([0, 0]));
        assert_eq!(os2.v2.unwrap().cap_height, 700);
        assert_eq!(os2.v2.unwrap().max_context, 3);
        assert_eq!(os2.optical_point_size, Some((10, 1000)));
    }

    #[test]
    fn version_2_truncated_fails() {
        let data = os2_bytes(2);

        assert!(read(&data[..data.len() - 2]).is_err());
        assert!(matches!(
            read(&os2_bytes(6)),
            Err(VeroTypeError::TableEncodingError(
                TableEncodingError::UnsupportedTableVersion { .. }
            ))
        ));
    }
}
