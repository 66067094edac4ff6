use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::META,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Meta::from_context(ctx)?.into())
}

const DESIGN_LANGUAGES: Tag = Tag::new(*b"dlng");
const SUPPORTED_LANGUAGES: Tag = Tag::new(*b"slng");

/// The [meta table](https://learn.microsoft.com/en-us/typography/opentype/spec/meta)
#[derive(Debug, Clone)]
pub struct Meta {
    pub metadata: TableMetadata,
    pub version: u32,
    pub flags: u32,
    /// Data maps in table order
    pub data_maps: Vec<(Tag, Vec<u8>)>,
}

impl Meta {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u32()?;
        if version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::META,
                version,
            }
            .into());
        }
        let flags = reader.read_u32()?;
        let _reserved = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        reader.check_remaining(count, 12)?;

        let mut maps = Vec::with_capacity(count);
        for _ in 0..count {
            maps.push((reader.read_tag()?, reader.read_u32()?, reader.read_u32()?));
        }

        let data = ctx.data();
        let mut data_maps = Vec::with_capacity(count);
        for (tag, offset, length) in maps {
            let start = offset as usize;
            match data.get(start..start.saturating_add(length as usize)) {
                Some(bytes) => data_maps.push((tag, bytes.to_vec())),
                None => ctx.report(TableEncodingError::InvalidData("meta data map out of bounds")),
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            flags,
            data_maps,
        })
    }

    pub fn get(&self, tag: Tag) -> Option<&[u8]> {
        self.data_maps
            .iter()
            .find(|(map_tag, _)| *map_tag == tag)
            .map(|(_, data)| data.as_slice())
    }

    /// The comma separated `dlng` script tags
    pub fn design_languages(&self) -> Vec<&str> {
        self.language_list(DESIGN_LANGUAGES)
    }

    /// The comma separated `slng` script tags
    pub fn supported_languages(&self) -> Vec<&str> {
        self.language_list(SUPPORTED_LANGUAGES)
    }

    fn language_list(&self, tag: Tag) -> Vec<&str> {
        self.get(tag)
            .and_then(|data| std::str::from_utf8(data).ok())
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
