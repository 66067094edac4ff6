use super::{FontTable, TableMetadata};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::DSIG,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Dsig::from_context(ctx)?.into())
}

/// The [DSIG table](https://learn.microsoft.com/en-us/typography/opentype/spec/dsig).
/// Signatures are kept as their PKCS#7 bytes, never verified.
#[derive(Debug, Clone)]
pub struct Dsig {
    pub metadata: TableMetadata,
    pub version: u32,
    pub flags: u16,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub format: u32,
    pub data: Vec<u8>,
}

impl Dsig {
    /// A signature block that cannot be read is reported and left out
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u32()?;
        let count = usize::from(reader.read_u16()?);
        let flags = reader.read_u16()?;
        reader.check_remaining(count, 12)?;

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push((reader.read_u32()?, reader.read_u32()?, reader.read_u32()?));
        }

        let mut signatures = Vec::with_capacity(count);
        for (format, _length, offset) in records {
            let block = (|| -> Result<Signature, VeroTypeError> {
                reader.seek_to(offset as usize)?;
                // two reserved words
                reader.skip(4)?;
                let length = reader.read_u32()? as usize;

                Ok(Signature {
                    format,
                    data: reader.read_bytes(length)?.to_vec(),
                })
            })();
            match block {
                Ok(signature) => signatures.push(signature),
                Err(err) => ctx.report(err),
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            flags,
            signatures,
        })
    }
}
