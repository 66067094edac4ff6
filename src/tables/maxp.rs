use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::MAXP,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Maxp::from_context(ctx)?.into())
}

const VERSION_0_5: u32 = 0x0000_5000;
const VERSION_1_0: u32 = 0x0001_0000;

/// The [maxp table](https://learn.microsoft.com/en-us/typography/opentype/spec/maxp)
#[derive(Debug, Clone)]
pub struct Maxp {
    pub metadata: TableMetadata,
    pub version: u32,
    /// The number of glyphs in the font
    pub num_glyphs: u16,
    /// Only present in version 1.0 (TrueType outlines)
    pub truetype: Option<MaxpTrueType>,
}

/// The version 1.0 limits used by TrueType outlines and hinting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxpTrueType {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

impl Maxp {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u32()?;
        let num_glyphs = reader.read_u16()?;

        let truetype = match version {
            VERSION_0_5 => None,
            VERSION_1_0 => Some(MaxpTrueType {
                max_points: reader.read_u16()?,
                max_contours: reader.read_u16()?,
                max_composite_points: reader.read_u16()?,
                max_composite_contours: reader.read_u16()?,
                max_zones: reader.read_u16()?,
                max_twilight_points: reader.read_u16()?,
                max_storage: reader.read_u16()?,
                max_function_defs: reader.read_u16()?,
                max_instruction_defs: reader.read_u16()?,
                max_stack_elements: reader.read_u16()?,
                max_size_of_instructions: reader.read_u16()?,
                max_component_elements: reader.read_u16()?,
                max_component_depth: reader.read_u16()?,
            }),
            _ => {
                return Err(TableEncodingError::UnsupportedTableVersion {
                    tag: Tag::MAXP,
                    version,
                }
                .into());
            }
        };

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            num_glyphs,
            truetype,
        })
    }
}
