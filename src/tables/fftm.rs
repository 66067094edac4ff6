use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{LongDateTime, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::FFTM,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Fftm::from_context(ctx)?.into())
}

/// FontForge's timestamp table
#[derive(Debug, Clone)]
pub struct Fftm {
    pub metadata: TableMetadata,
    pub version: u32,
    /// Build date of the FontForge that wrote the font
    pub fontforge_timestamp: LongDateTime,
    pub source_created: LongDateTime,
    pub source_modified: LongDateTime,
}

impl Fftm {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u32()?;
        if version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::FFTM,
                version,
            }
            .into());
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            fontforge_timestamp: reader.read_i64()?,
            source_created: reader.read_i64()?,
            source_modified: reader.read_i64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn timestamps() {
        let mut data = 1u32.to_be_bytes().to_vec();
        for v in [3_600i64, 60, 120] {
            data.extend(v.to_be_bytes());
        }

        let mut diagnostics = Diagnostics::default();
        let fftm = Fftm::from_context(&mut ParseContext::standalone(Tag::FFTM, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(fftm.fontforge_timestamp, 3_600);
        assert_eq!(fftm.source_modified, 120);
    }
}
