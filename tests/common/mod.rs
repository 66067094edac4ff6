//! Font builders shared by the integration tests

#![allow(dead_code)]

use vero_type::Tag;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A value that can be written big-endian
pub trait BeScalar {
    fn write(self, out: &mut Vec<u8>);
}

macro_rules! be_scalar {
    ($($typ:ty),*) => {
        $(impl BeScalar for $typ {
            fn write(self, out: &mut Vec<u8>) {
                out.extend(self.to_be_bytes());
            }
        })*
    };
}

be_scalar!(u8, i8, u16, i16, u32, i32, i64);

/// A growable buffer of big-endian bytes
#[derive(Debug, Clone, Default)]
pub struct BeBuffer(Vec<u8>);

impl BeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, value: impl BeScalar) -> Self {
        value.write(&mut self.0);
        self
    }

    pub fn extend<T: BeScalar>(mut self, values: impl IntoIterator<Item = T>) -> Self {
        for value in values {
            value.write(&mut self.0);
        }
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

/// Assembles an sfnt file with tables in the order they are added
#[derive(Debug, Default)]
pub struct FontBuilder {
    tables: Vec<(Tag, Vec<u8>)>,
}

impl FontBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, tag: Tag, data: Vec<u8>) -> Self {
        self.tables.push((tag, data));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// A `ttcf` collection holding this font as its only member
    pub fn build_collection(&self) -> Vec<u8> {
        let mut data = BeBuffer::new()
            .bytes(b"ttcf")
            .push(1u16)
            .push(0u16)
            .push(1u32)
            .push(16u32)
            .into_vec();
        data.extend(self.build_at(16));
        data
    }

    /// Table offsets are absolute, so a font placed at `base` in a larger
    /// file shifts every offset by `base`
    fn build_at(&self, base: usize) -> Vec<u8> {
        let num_tables = self.tables.len() as u16;
        let mut header = BeBuffer::new()
            .push(0x0001_0000u32)
            .push(num_tables)
            .push(0u16)
            .push(0u16)
            .push(0u16);

        let mut offset = base + 12 + 16 * self.tables.len();
        let mut body = Vec::new();
        for (tag, data) in &self.tables {
            header = header
                .bytes(&tag.to_bytes())
                .push(checksum(data))
                .push(offset as u32)
                .push(data.len() as u32);
            let padded = data.len().next_multiple_of(4);
            body.extend(data);
            body.resize(body.len() + padded - data.len(), 0);
            offset += padded;
        }

        let mut font = header.into_vec();
        font.extend(body);
        font
    }
}

pub fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Byte offset of the `index`th table record's length field
pub fn record_length_offset(index: usize) -> usize {
    12 + 16 * index + 12
}

pub fn head(units_per_em: u16, loca_format: i16) -> Vec<u8> {
    BeBuffer::new()
        .push(0x0001_0000u32)
        .push(0x0001_0000u32)
        .push(0u32)
        .push(0x5F0F_3CF5u32)
        .push(0u16)
        .push(units_per_em)
        .push(0i64)
        .push(0i64)
        .extend([0i16, -200, 1000, 800])
        .push(0u16)
        .push(8u16)
        .push(2i16)
        .push(loca_format)
        .push(0i16)
        .into_vec()
}

/// maxp version 0.5
pub fn maxp(num_glyphs: u16) -> Vec<u8> {
    BeBuffer::new().push(0x0000_5000u32).push(num_glyphs).into_vec()
}

pub fn hhea(ascender: i16, descender: i16, number_of_h_metrics: u16) -> Vec<u8> {
    BeBuffer::new()
        .push(0x0001_0000u32)
        .extend([ascender, descender, 0])
        .push(500u16)
        .extend([0i16, 0, 500, 1, 0, 0])
        .extend([0i16; 4])
        .push(0i16)
        .push(number_of_h_metrics)
        .into_vec()
}

/// Long metrics as (advance, lsb) followed by the trailing bearings
pub fn hmtx(metrics: &[(u16, i16)], bearings: &[i16]) -> Vec<u8> {
    let mut buffer = BeBuffer::new();
    for &(advance, lsb) in metrics {
        buffer = buffer.push(advance).push(lsb);
    }
    buffer.extend(bearings.iter().copied()).into_vec()
}

/// Short loca: stores half of each offset
pub fn loca_short(offsets: &[u16]) -> Vec<u8> {
    BeBuffer::new().extend(offsets.iter().map(|offset| offset / 2)).into_vec()
}

/// One (3, 1) format 4 subtable mapping `first..=last` to glyphs from 1
pub fn cmap_format4(first: u16, last: u16) -> Vec<u8> {
    let delta = 1u16.wrapping_sub(first);
    BeBuffer::new()
        .extend([0u16, 1])
        .extend([3u16, 1])
        .push(12u32)
        .extend([4u16, 32, 0, 4, 4, 1, 0])
        .extend([last, 0xFFFF])
        .push(0u16)
        .extend([first, 0xFFFF])
        .extend([delta, 1])
        .extend([0u16, 0])
        .into_vec()
}

/// A GSUB whose 'latn' default language enables 'smcp', backed by an
/// extension lookup wrapping a single substitution 21 → 30
pub fn gsub_with_extension() -> Vec<u8> {
    BeBuffer::new()
        .extend([1u16, 0, 10, 30, 44])
        .push(1u16)
        .bytes(b"latn")
        .extend([8u16, 4, 0, 0, 0xFFFF, 1, 0])
        .push(1u16)
        .bytes(b"smcp")
        .extend([8u16, 0, 1, 0])
        .extend([1u16, 4])
        .extend([7u16, 0, 1, 8])
        .extend([1u16, 1])
        .push(8u32)
        .extend([2u16, 8, 1, 30])
        .extend([1u16, 1, 21])
        .into_vec()
}

/// A GSUB or GPOS table with empty script and feature lists whose lookups
/// are all extension lookups, one per `(wrapped type, subtable)` pair
pub fn extension_lookups(extension_type: u16, lookups: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut buffer = BeBuffer::new()
        .extend([1u16, 0, 10, 12, 14])
        .extend([0u16, 0])
        .push(lookups.len() as u16);

    let mut offset = 2 + 2 * lookups.len();
    for (_, subtable) in lookups {
        buffer = buffer.push(offset as u16);
        offset += 16 + subtable.len();
    }
    for (wrapped_type, subtable) in lookups {
        buffer = buffer
            .extend([extension_type, 0, 1, 8])
            .extend([1u16, *wrapped_type])
            .push(8u32)
            .bytes(subtable);
    }
    buffer.into_vec()
}

/// head, maxp, hhea, hmtx, loca and glyf for a two-glyph font whose
/// second glyph is empty
pub fn minimal_truetype() -> FontBuilder {
    let glyph_zero = BeBuffer::new().extend([1i16, 0, 0, 100, 100]).into_vec();

    FontBuilder::new()
        .table(Tag::HEAD, head(1000, 0))
        .table(Tag::MAXP, maxp(2))
        .table(Tag::HHEA, hhea(800, -200, 1))
        .table(Tag::HMTX, hmtx(&[(500, 0)], &[0]))
        .table(Tag::LOCA, loca_short(&[0, 10, 10]))
        .table(Tag::GLYF, glyph_zero)
}
