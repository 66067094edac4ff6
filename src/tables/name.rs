use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    registry::{ParseContext, TableParser},
    types::Tag,
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::NAME,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Name::from_context(ctx)?.into())
}

/// Well known name identifiers
pub mod name_id {
    pub const COPYRIGHT: u16 = 0;
    pub const FAMILY: u16 = 1;
    pub const SUBFAMILY: u16 = 2;
    pub const UNIQUE_ID: u16 = 3;
    pub const FULL_NAME: u16 = 4;
    pub const VERSION: u16 = 5;
    pub const POSTSCRIPT_NAME: u16 = 6;
    pub const TYPOGRAPHIC_FAMILY: u16 = 16;
    pub const TYPOGRAPHIC_SUBFAMILY: u16 = 17;
}

const ENGLISH_US: u16 = 0x0409;

/// Represents the [name table](https://learn.microsoft.com/en-us/typography/opentype/spec/name)
#[derive(Debug, Clone)]
pub struct Name {
    pub metadata: TableMetadata,

    /// The format of the name table
    pub format: TableFormat,

    /// The name records, in table order
    pub records: Vec<NameRecord>,

    /// Format 1 language tags; record language ids from 0x8000 index into it
    pub lang_tags: Vec<String>,
}

impl Name {
    /// Reads the records and decodes their strings.
    ///
    /// A record pointing outside the string storage is reported and kept
    /// without a value.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let format = TableFormat::from(reader.read_u16()?);
        if let TableFormat::Unknown(version) = format {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::NAME,
                version: u32::from(version),
            }
            .into());
        }

        let count = usize::from(reader.read_u16()?);
        let storage_offset = usize::from(reader.read_u16()?);
        let raw_records = reader.read_array::<RawNameRecord>(count)?;

        let raw_lang_tags = match format {
            TableFormat::LangTagged => {
                let count = usize::from(reader.read_u16()?);
                reader.read_array::<LangTagRecord>(count)?
            }
            _ => Vec::new(),
        };

        let data = ctx.data();
        let storage = data.get(storage_offset..).unwrap_or_default();

        let mut records = Vec::with_capacity(raw_records.len());
        for raw in raw_records {
            let bytes = string_bytes(storage, raw.offset, raw.length);
            if bytes.is_none() {
                ctx.report(TableEncodingError::InvalidData(
                    "name record outside of string storage",
                ));
            }

            records.push(NameRecord {
                platform_id: PlatformId::from(raw.platform_id),
                encoding_id: raw.encoding_id,
                language_id: raw.language_id,
                name_id: raw.name_id,
                bytes: bytes.unwrap_or_default().to_vec(),
                value: bytes.and_then(|bytes| decode(raw.platform_id, raw.encoding_id, bytes)),
            });
        }

        let mut lang_tags = Vec::with_capacity(raw_lang_tags.len());
        for tag in raw_lang_tags {
            match string_bytes(storage, tag.offset, tag.length) {
                Some(bytes) => lang_tags.push(decode_utf16_be(bytes)),
                None => {
                    ctx.report(TableEncodingError::InvalidData(
                        "language tag outside of string storage",
                    ));
                    lang_tags.push(String::new());
                }
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            format,
            records,
            lang_tags,
        })
    }

    /// The decoded string for `name_id`, preferring the Windows English (US)
    /// record and then the first record that decoded
    pub fn get(&self, name_id: u16) -> Option<&str> {
        let mut candidates = self
            .records
            .iter()
            .filter(|record| record.name_id == name_id && record.value.is_some());

        let first = candidates.clone().next();
        candidates
            .find(|record| {
                record.platform_id == PlatformId::Microsoft && record.language_id == ENGLISH_US
            })
            .or(first)
            .and_then(NameRecord::value)
    }

    pub fn family_name(&self) -> Option<&str> {
        self.get(name_id::TYPOGRAPHIC_FAMILY)
            .or_else(|| self.get(name_id::FAMILY))
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get(name_id::FULL_NAME)
    }

    pub fn postscript_name(&self) -> Option<&str> {
        self.get(name_id::POSTSCRIPT_NAME)
    }

    /// The language tag of a format 1 record language id
    pub fn lang_tag(&self, language_id: u16) -> Option<&str> {
        let index = usize::from(language_id.checked_sub(0x8000)?);

        self.lang_tags.get(index).map(String::as_str)
    }
}

fn string_bytes(storage: &[u8], offset: u16, length: u16) -> Option<&[u8]> {
    let start = usize::from(offset);

    storage.get(start..start + usize::from(length))
}

/// UTF-16BE for Unicode and Windows Unicode records, Latin-1 for Macintosh
/// Roman; anything else stays undecoded
fn decode(platform_id: u16, encoding_id: u16, bytes: &[u8]) -> Option<String> {
    match (PlatformId::from(platform_id), encoding_id) {
        (PlatformId::Unicode, _) | (PlatformId::Microsoft, 0 | 1 | 10) => {
            Some(decode_utf16_be(bytes))
        }
        (PlatformId::Macintosh, 0) => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        _ => None,
    }
}

fn decode_utf16_be(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

struct RawNameRecord {
    platform_id: u16,
    encoding_id: u16,
    language_id: u16,
    name_id: u16,
    length: u16,
    offset: u16,
}

impl ReadBe for RawNameRecord {
    const SIZE: usize = 12;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            platform_id: reader.read_u16()?,
            encoding_id: reader.read_u16()?,
            language_id: reader.read_u16()?,
            name_id: reader.read_u16()?,
            length: reader.read_u16()?,
            offset: reader.read_u16()?,
        })
    }
}

struct LangTagRecord {
    length: u16,
    offset: u16,
}

impl ReadBe for LangTagRecord {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            length: reader.read_u16()?,
            offset: reader.read_u16()?,
        })
    }
}

/// Represents a name record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// Platform identifier code
    pub platform_id: PlatformId,

    /// Platform-specific encoding identifier
    pub encoding_id: u16,

    /// Language identifier, not enumed because there are dozens of them
    pub language_id: u16,

    /// Name identifier, see [`name_id`]
    pub name_id: u16,

    /// The encoded string
    pub bytes: Vec<u8>,

    /// The decoded string, when the encoding is one we can decode
    pub value: Option<String>,
}

impl NameRecord {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Represents the platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformId {
    Unicode,
    Macintosh,
    Reserved,
    Microsoft,
    Unknown(u16),
}

impl From<u16> for PlatformId {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Unicode,
            1 => Self::Macintosh,
            2 => Self::Reserved,
            3 => Self::Microsoft,
            _ => Self::Unknown(value),
        }
    }
}

/// Represents a table format.
/// Format 1 adds language tag records after the name records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Standard,
    LangTagged,
    Unknown(u16),
}

impl From<u16> for TableFormat {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Standard,
            1 => Self::LangTagged,
            _ => Self::Unknown(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;
    use pretty_assertions::assert_eq;

    fn record(platform: u16, encoding: u16, language: u16, name: u16, length: u16, offset: u16) -> Vec<u8> {
        [platform, encoding, language, name, length, offset]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect()
    }

    fn read(data: &[u8]) -> (Name, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let name = Name::from_context(&mut ParseContext::standalone(Tag::NAME, data, &mut diagnostics))
            .unwrap();
        (name, diagnostics)
    }

    #[test]
    fn decodes_mac_and_windows_records() {
        let mut data = vec![0, 0, 0, 3, 0, 42];
        data.extend(record(1, 0, 0, 1, 4, 0));
        data.extend(record(3, 1, 0x0409, 1, 8, 4));
        data.extend(record(3, 1, 0x0409, 4, 200, 0));
        data.extend(b"Mono");
        data.extend([0, b'V', 0, b'e', 0, b'r', 0, b'o']);

        let (name, diagnostics) = read(&data);

        assert_eq!(name.format, TableFormat::Standard);
        assert_eq!(name.records.len(), 3);
        assert_eq!(name.records[0].value(), Some("Mono"));
        assert_eq!(name.family_name(), Some("Vero"));
        assert_eq!(name.full_name(), None);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn format_1_language_tags() {
        let mut data = vec![0, 1, 0, 1, 0, 24];
        data.extend(record(0, 4, 0x8000, 6, 2, 0));
        data.extend([0, 1, 0, 4, 0, 2]);
        data.extend([0, b'P', 0, b'e', 0, b'n']);

        let (name, diagnostics) = read(&data);

        assert!(diagnostics.is_empty());
        assert_eq!(name.postscript_name(), Some("P"));
        assert_eq!(name.lang_tag(0x8000), Some("en"));
        assert_eq!(name.lang_tag(0x0409), None);
    }

    #[test]
    fn unknown_format_is_unsupported() {
        let mut diagnostics = Diagnostics::default();
        let result = Name::from_context(&mut ParseContext::standalone(
            Tag::NAME,
            &[0, 2, 0, 0, 0, 6],
            &mut diagnostics,
        ));

        assert!(result.is_err());
    }
}
