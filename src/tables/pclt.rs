use super::{FontTable, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{Fixed, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::PCLT,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Pclt::from_context(ctx)?.into())
}

/// The [PCLT table](https://learn.microsoft.com/en-us/typography/opentype/spec/pclt)
#[derive(Debug, Clone)]
pub struct Pclt {
    pub metadata: TableMetadata,
    pub version: Fixed,
    pub font_number: u32,
    pub pitch: u16,
    pub x_height: u16,
    pub style: u16,
    pub type_family: u16,
    pub cap_height: u16,
    pub symbol_set: u16,
    pub typeface: [u8; 16],
    pub character_complement: [u8; 8],
    pub file_name: [u8; 6],
    pub stroke_weight: i8,
    pub width_type: i8,
    pub serif_style: u8,
}

impl Pclt {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();

        let pclt = Self {
            metadata: ctx.metadata(),
            version: reader.read_fixed()?,
            font_number: reader.read_u32()?,
            pitch: reader.read_u16()?,
            x_height: reader.read_u16()?,
            style: reader.read_u16()?,
            type_family: reader.read_u16()?,
            cap_height: reader.read_u16()?,
            symbol_set: reader.read_u16()?,
            typeface: reader.read_array_fixed::<16>()?,
            character_complement: reader.read_array_fixed::<8>()?,
            file_name: reader.read_array_fixed::<6>()?,
            stroke_weight: reader.read_i8()?,
            width_type: reader.read_i8()?,
            serif_style: reader.read_u8()?,
        };
        // trailing reserved byte
        reader.skip(1)?;

        Ok(pclt)
    }

    /// The typeface name with trailing padding removed
    pub fn typeface_name(&self) -> String {
        self.typeface
            .iter()
            .map(|&b| char::from(b))
            .collect::<String>()
            .trim_end_matches(['\0', ' '])
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn reads_fixed_layout() {
        let mut data = vec![0, 1, 0, 0, 0, 0, 0, 7];
        data.extend([0, 100, 0, 50, 0, 0, 0, 3, 0, 70, 0, 0]);
        data.extend(b"Courier         ");
        data.extend([0; 14]);
        data.extend([0xFE, 0, 1, 0]);

        let mut diagnostics = Diagnostics::default();
        let pclt = Pclt::from_context(&mut ParseContext::standalone(Tag::PCLT, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(data.len(), 54);
        assert_eq!(pclt.font_number, 7);
        assert_eq!(pclt.cap_height, 70);
        assert_eq!(pclt.typeface_name(), "Courier");
        assert_eq!(pclt.stroke_weight, -2);
        assert_eq!(pclt.serif_style, 1);
    }
}
