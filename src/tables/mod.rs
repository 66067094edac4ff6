use std::collections::{BTreeMap, btree_map};

use thiserror::Error;

use crate::{
    VeroTypeError,
    buffer::{VeroBufReader, VeroBufReaderError},
    types::Tag,
};

pub mod cff;
pub mod cmap;
pub mod dsig;
pub mod fftm;
pub mod gdef;
pub mod glyf;
pub mod gpos;
pub mod gsub;
pub mod hdmx;
pub mod head;
pub mod hhea;
pub mod hmtx;
pub mod jstf;
pub mod kern;
pub mod loca;
pub mod ltsh;
pub mod maxp;
pub mod meta;
pub mod name;
pub mod opaque;
pub mod os2;
pub mod pclt;
pub mod post;

/// Represents the error messages which may occur when trying
/// to parse tables from raw binary buffers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableEncodingError {
    #[error("The required buffer length for this table is {0} bytes, got {1} bytes")]
    InvalidBufferLength(usize, usize),

    #[error("unrecognized sfnt version 0x{0:08X}")]
    InvalidSfntVersion(u32),

    #[error("magic number mismatch: expected 0x{expected:08X}, found 0x{found:08X}")]
    InvalidMagicNumber { expected: u32, found: u32 },

    #[error("unsupported {tag} table version 0x{version:08X}")]
    UnsupportedTableVersion { tag: Tag, version: u32 },

    #[error("unsupported {kind} format {format}")]
    UnsupportedSubtableFormat { kind: &'static str, format: u16 },

    #[error("{tag} requires {dependency}, which is missing or failed to parse")]
    UnresolvedDependency { tag: Tag, dependency: Tag },

    #[error("{0} is part of a table dependency cycle")]
    DependencyCycle(Tag),

    #[error("checksum mismatch: directory says 0x{expected:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("duplicate table directory entry for {0}")]
    DuplicateTable(Tag),

    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}

const SFNT_TRUETYPE: u32 = 0x0001_0000;
const SFNT_OTTO: u32 = u32::from_be_bytes(*b"OTTO");
const SFNT_APPLE_TRUE: u32 = u32::from_be_bytes(*b"true");
const SFNT_COLLECTION: u32 = u32::from_be_bytes(*b"ttcf");

/// Represents the offset subtable directory and it's metadata
/// providing us with important info such as the number of tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    pub sfnt_version: u32,
    pub num_tables: u16,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
    /// Number of fonts in the file when it is a `ttcf` collection
    pub collection_fonts: Option<u32>,
}

impl OffsetTable {
    /// Parses the offset table at the start of the file.
    ///
    /// For a font collection the header's first font offset is followed and
    /// the offset table of that font is returned; the reader is left right
    /// after it, at the first table record.
    pub fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(0)?;
        let mut sfnt_version = reader.read_u32()?;
        let mut collection_fonts = None;

        if sfnt_version == SFNT_COLLECTION {
            let _major = reader.read_u16()?;
            let _minor = reader.read_u16()?;
            let num_fonts = reader.read_u32()?;
            if num_fonts == 0 {
                return Err(TableEncodingError::InvalidData("font collection holds no fonts").into());
            }
            let first = reader.read_u32()? as usize;
            reader.seek_relative(0, first)?;
            sfnt_version = reader.read_u32()?;
            collection_fonts = Some(num_fonts);
        }

        if !matches!(sfnt_version, SFNT_TRUETYPE | SFNT_OTTO | SFNT_APPLE_TRUE) {
            return Err(TableEncodingError::InvalidSfntVersion(sfnt_version).into());
        }

        Ok(Self {
            sfnt_version,
            num_tables: reader.read_u16()?,
            search_range: reader.read_u16()?,
            entry_selector: reader.read_u16()?,
            range_shift: reader.read_u16()?,
            collection_fonts,
        })
    }

    /// Returns the number of tables exists in the font file
    pub fn num_tables(&self) -> u16 {
        self.num_tables
    }

    /// True for CFF-flavoured (`OTTO`) fonts
    pub fn is_cff(&self) -> bool {
        self.sfnt_version == SFNT_OTTO
    }
}

/// The sfnt header together with every table record it lists.
#[derive(Debug, Clone)]
pub struct TableDirectory {
    /// The offset table, which provides the starting offsets of other tables.
    pub offset: OffsetTable,
    pub headers: TablesHeaders,
}

impl TableDirectory {
    /// Reads the offset table followed by the table records.
    ///
    /// # Errors
    ///
    /// Fails when the header or any table record cannot be read; without a
    /// directory there is nothing else to parse.
    pub fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroTypeError> {
        let offset = OffsetTable::from_reader(reader)?;
        let headers = TablesHeaders::from_reader(reader, offset.num_tables())?;

        Ok(Self { offset, headers })
    }
}

/// Represents the table headers and maps a table tag to it's offset
/// in the file / buffer
#[derive(Debug, Clone, Default)]
pub struct TablesHeaders {
    inner: BTreeMap<Tag, TableMetadata>,
    /// Tags listed more than once; only the first record is kept
    duplicates: Vec<Tag>,
}

impl TablesHeaders {
    pub fn from_reader(
        reader: &mut VeroBufReader<'_>,
        num_tables: u16,
    ) -> Result<Self, VeroTypeError> {
        // a table record is 16 bytes
        reader.check_remaining(usize::from(num_tables), 16)?;

        let mut headers = Self::default();
        for _ in 0..num_tables {
            let metadata = TableMetadata::from_reader(reader)?;
            match headers.inner.entry(metadata.tag) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(metadata);
                }
                btree_map::Entry::Occupied(_) => headers.duplicates.push(metadata.tag),
            }
        }

        Ok(headers)
    }

    pub fn get(&self, tag: Tag) -> Option<&TableMetadata> {
        self.inner.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.inner.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Table records ordered by tag
    pub fn iter(&self) -> impl Iterator<Item = &TableMetadata> + '_ {
        self.inner.values()
    }

    pub fn duplicates(&self) -> &[Tag] {
        &self.duplicates
    }
}

impl IntoIterator for TablesHeaders {
    type Item = (Tag, TableMetadata);

    type IntoIter = btree_map::IntoIter<Tag, TableMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// Represents metadata for a table within a larger data structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMetadata {
    pub tag: Tag,
    /// The checksum of the table. This value can be used to verify the
    /// integrity of the table data.
    pub checksum: u32,
    /// The offset of the table, in bytes, from the beginning of the file
    pub offset: u32,
    /// The length of this table in bytes, not counting padding
    pub length: u32,
}

impl TableMetadata {
    /// Reads one 16 byte table record
    pub fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            tag: reader.read_tag()?,
            checksum: reader.read_u32()?,
            offset: reader.read_u32()?,
            length: reader.read_u32()?,
        })
    }

    /// The table's bytes, if the record lies inside `data`
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], VeroBufReaderError> {
        let start = self.offset as usize;
        let end = start.checked_add(self.length as usize);
        match end {
            Some(end) if end <= data.len() => Ok(&data[start..end]),
            _ => Err(VeroBufReaderError::UnexpectedEndOfData {
                position: start,
                needed: self.length as usize,
                len: data.len(),
            }),
        }
    }

    /// Computes the table checksum over `table` (the bytes returned by
    /// [`slice`](Self::slice)). For `head` the checksumAdjustment field is
    /// treated as zero.
    pub fn compute_checksum(&self, table: &[u8]) -> u32 {
        let mut sum = 0u32;
        for (i, chunk) in table.chunks(4).enumerate() {
            if self.tag == Tag::HEAD && i == 2 {
                continue;
            }
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum = sum.wrapping_add(u32::from_be_bytes(word));
        }
        sum
    }
}

/// A table implementation that can be looked up by tag
pub trait TableVariant: Sized {
    const TAG: Tag;

    fn from_table(table: &FontTable) -> Option<&Self>;
}

macro_rules! font_tables {
    ($($variant:ident($typ:ty) = $tag:expr),* $(,)?) => {
        /// A successfully parsed table
        #[derive(Debug, Clone)]
        pub enum FontTable {
            $($variant($typ),)*
            /// Tables kept as raw bytes (`fpgm`, `prep`, `cvt `)
            Opaque(opaque::OpaqueTable),
        }

        impl FontTable {
            pub fn metadata(&self) -> &TableMetadata {
                match self {
                    $(FontTable::$variant(table) => &table.metadata,)*
                    FontTable::Opaque(table) => &table.metadata,
                }
            }
        }

        $(
            impl TableVariant for $typ {
                const TAG: Tag = $tag;

                fn from_table(table: &FontTable) -> Option<&Self> {
                    match table {
                        FontTable::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$typ> for FontTable {
                fn from(table: $typ) -> Self {
                    FontTable::$variant(table)
                }
            }
        )*
    };
}

font_tables! {
    Head(head::Head) = Tag::HEAD,
    Maxp(maxp::Maxp) = Tag::MAXP,
    Hhea(hhea::Hhea) = Tag::HHEA,
    Hmtx(hmtx::Hmtx) = Tag::HMTX,
    Loca(loca::Loca) = Tag::LOCA,
    Glyf(glyf::Glyf) = Tag::GLYF,
    Cmap(cmap::Cmap) = Tag::CMAP,
    Post(post::Post) = Tag::POST,
    Os2(os2::Os2) = Tag::OS2,
    Name(name::Name) = Tag::NAME,
    Kern(kern::Kern) = Tag::KERN,
    Hdmx(hdmx::Hdmx) = Tag::HDMX,
    Ltsh(ltsh::Ltsh) = Tag::LTSH,
    Pclt(pclt::Pclt) = Tag::PCLT,
    Dsig(dsig::Dsig) = Tag::DSIG,
    Fftm(fftm::Fftm) = Tag::FFTM,
    Meta(meta::Meta) = Tag::META,
    Gdef(gdef::Gdef) = Tag::GDEF,
    Gsub(gsub::Gsub) = Tag::GSUB,
    Gpos(gpos::Gpos) = Tag::GPOS,
    Jstf(jstf::Jstf) = Tag::JSTF,
    Cff(cff::Cff) = Tag::CFF,
}

impl From<opaque::OpaqueTable> for FontTable {
    fn from(table: opaque::OpaqueTable) -> Self {
        FontTable::Opaque(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(version: &[u8; 4], records: &[(&[u8; 4], u32, u32)]) -> Vec<u8> {
        let mut data = version.to_vec();
        data.extend((records.len() as u16).to_be_bytes());
        data.extend([0u8; 6]);
        for (tag, offset, length) in records {
            data.extend(*tag);
            data.extend(0u32.to_be_bytes());
            data.extend(offset.to_be_bytes());
            data.extend(length.to_be_bytes());
        }
        data
    }

    #[test]
    fn maps_every_tag_regardless_of_order() {
        let data = directory(
            &[0, 1, 0, 0],
            &[(b"hmtx", 100, 8), (b"zzzz", 10, 1), (b"hhea", 50, 36)],
        );
        let mut reader = VeroBufReader::new(&data);
        let dir = TableDirectory::from_reader(&mut reader).unwrap();

        assert_eq!(dir.offset.num_tables(), 3);
        assert_eq!(dir.headers.get(Tag::HMTX).unwrap().offset, 100);
        assert!(dir.headers.contains(Tag::new(*b"zzzz")));
        let tags: Vec<_> = dir.headers.iter().map(|m| m.tag).collect();
        assert_eq!(tags, vec![Tag::HHEA, Tag::HMTX, Tag::new(*b"zzzz")]);
    }

    #[test]
    fn duplicate_records_keep_the_first() {
        let data = directory(b"OTTO", &[(b"head", 1, 2), (b"head", 3, 4)]);
        let mut reader = VeroBufReader::new(&data);
        let dir = TableDirectory::from_reader(&mut reader).unwrap();

        assert!(dir.offset.is_cff());
        assert_eq!(dir.headers.get(Tag::HEAD).unwrap().offset, 1);
        assert_eq!(dir.headers.duplicates(), &[Tag::HEAD]);
    }

    #[test]
    fn rejects_unknown_sfnt_version() {
        let data = directory(b"wOFF", &[]);
        let mut reader = VeroBufReader::new(&data);

        assert!(matches!(
            TableDirectory::from_reader(&mut reader),
            Err(VeroTypeError::TableEncodingError(
                TableEncodingError::InvalidSfntVersion(_)
            ))
        ));
    }

    #[test]
    fn truncated_directory_is_fatal() {
        let mut data = directory(&[0, 1, 0, 0], &[(b"head", 0, 54)]);
        data.truncate(20);
        let mut reader = VeroBufReader::new(&data);

        assert!(TableDirectory::from_reader(&mut reader).is_err());
    }

    #[test]
    fn collection_follows_first_font() {
        let mut data = b"ttcf".to_vec();
        data.extend([0, 1, 0, 0]);
        data.extend(1u32.to_be_bytes());
        data.extend(16u32.to_be_bytes());
        data.extend(directory(&[0, 1, 0, 0], &[(b"maxp", 64, 6)]));
        let mut reader = VeroBufReader::new(&data);
        let dir = TableDirectory::from_reader(&mut reader).unwrap();

        assert_eq!(dir.offset.collection_fonts, Some(1));
        assert_eq!(dir.headers.get(Tag::MAXP).unwrap().length, 6);
    }

    #[test]
    fn checksum_skips_head_adjustment() {
        let table = [0, 0, 0, 1, 0, 0, 0, 2, 0xff, 0xff, 0xff, 0xff, 0x01];
        let head = TableMetadata { tag: Tag::HEAD, checksum: 0, offset: 0, length: 13 };
        let other = TableMetadata { tag: Tag::MAXP, ..head };

        assert_eq!(head.compute_checksum(&table), 1 + 2 + 0x0100_0000);
        assert_eq!(other.compute_checksum(&table), (1u32 + 2 + 0x0100_0000).wrapping_add(0xffff_ffff));
    }
}
