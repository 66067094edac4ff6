use std::collections::HashMap;

use super::{FontTable, TableEncodingError, TableMetadata, maxp::Maxp};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::CMAP,
    requires: &[],
    optional: &[Tag::MAXP],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Cmap::from_context(ctx)?.into())
}

const PLATFORM_WINDOWS: u16 = 3;
const ENCODING_UNICODE_BMP: u16 = 1;

/// A representation of the [cmap table](https://learn.microsoft.com/en-us/typography/opentype/spec/cmap),
/// one parsed subtable per encoding record
#[derive(Debug, Clone)]
pub struct Cmap {
    pub metadata: TableMetadata,

    /// The version of the cmap table, always 0
    pub version: u16,

    /// Encoding records paired with the subtable they point to, in table
    /// order. Records whose subtable could not be read are left out.
    pub subtables: Vec<(EncodingRecord, CmapSubtable)>,
}

/// A cmap [encoding record](https://learn.microsoft.com/en-us/typography/opentype/spec/cmap#encoding-records-and-encodings)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRecord {
    /// The platform identifier
    pub platform_id: u16,

    /// The platform specific encoding identifier
    pub encoding_id: u16,

    /// Offset of the subtable from the start of the cmap table
    pub offset: u32,
}

impl EncodingRecord {
    fn is_windows_unicode_bmp(&self) -> bool {
        self.platform_id == PLATFORM_WINDOWS && self.encoding_id == ENCODING_UNICODE_BMP
    }
}

impl ReadBe for EncodingRecord {
    const SIZE: usize = 8;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            platform_id: reader.read_u16()?,
            encoding_id: reader.read_u16()?,
            offset: reader.read_u32()?,
        })
    }
}

/// Result of mapping a codepoint together with a variation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapVariant {
    /// The selector is ignored and the default mapping applies
    UseDefault,
    Variant(GlyphId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmapSubtable {
    /// Byte encoding table
    Format0(Format0),
    /// Segment mapping to delta values
    Format4(Format4),
    /// Trimmed table mapping
    Format6(Format6),
    /// Segmented coverage
    Format12(SegmentedGroups),
    /// Many-to-one range mappings
    Format13(SegmentedGroups),
    /// Unicode variation sequences
    Format14(Format14),
}

impl CmapSubtable {
    /// Reads the subtable at `base`.
    ///
    /// # Errors
    ///
    /// Formats 2, 8 and 10 and unknown formats give
    /// [`TableEncodingError::UnsupportedSubtableFormat`].
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;

        let subtable = match format {
            0 => Self::Format0(Format0::read(reader)?),
            4 => Self::Format4(Format4::read(reader, base)?),
            6 => Self::Format6(Format6::read(reader)?),
            12 => Self::Format12(SegmentedGroups::read(reader)?),
            13 => Self::Format13(SegmentedGroups::read(reader)?),
            14 => Self::Format14(Format14::read(reader, base)?),
            _ => {
                return Err(TableEncodingError::UnsupportedSubtableFormat {
                    kind: "cmap subtable",
                    format,
                }
                .into());
            }
        };

        Ok(subtable)
    }

    pub fn format(&self) -> u16 {
        match self {
            Self::Format0(_) => 0,
            Self::Format4(_) => 4,
            Self::Format6(_) => 6,
            Self::Format12(_) => 12,
            Self::Format13(_) => 13,
            Self::Format14(_) => 14,
        }
    }

    /// The nominal glyph for `codepoint`, 0 when unmapped
    pub fn map(&self, codepoint: u32) -> GlyphId {
        match self {
            Self::Format0(table) => table.map(codepoint),
            Self::Format4(table) => table.map(codepoint),
            Self::Format6(table) => table.map(codepoint),
            Self::Format12(table) => table.map(codepoint, true),
            Self::Format13(table) => table.map(codepoint, false),
            Self::Format14(_) => 0,
        }
    }

    /// Maps a (codepoint, selector) pair; only format 14 knows about pairs
    pub fn map_variant(&self, codepoint: u32, selector: u32) -> Option<MapVariant> {
        match self {
            Self::Format14(table) => table.map_variant(codepoint, selector),
            _ => None,
        }
    }

    /// Largest glyph id stored directly in the subtable, for formats that
    /// store glyph ids without deltas. Saturates at `u32::MAX`.
    fn max_glyph_id(&self) -> Option<u32> {
        match self {
            Self::Format0(table) => table.glyph_ids.iter().max().map(|&g| u32::from(g)),
            Self::Format6(table) => table.glyph_ids.iter().max().map(|&g| u32::from(g)),
            Self::Format12(table) => table
                .groups
                .iter()
                .map(|g| {
                    g.start_glyph_id
                        .saturating_add(g.end_char_code - g.start_char_code)
                })
                .max(),
            Self::Format13(table) => table.groups.iter().map(|g| g.start_glyph_id).max(),
            Self::Format4(_) | Self::Format14(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format0 {
    pub language: u16,
    pub glyph_ids: [u8; 256],
}

impl Format0 {
    fn read(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroTypeError> {
        let _length = reader.read_u16()?;
        let language = reader.read_u16()?;

        Ok(Self {
            language,
            glyph_ids: reader.read_array_fixed::<256>()?,
        })
    }

    pub fn map(&self, codepoint: u32) -> GlyphId {
        usize::try_from(codepoint)
            .ok()
            .and_then(|index| self.glyph_ids.get(index))
            .map_or(0, |&glyph| GlyphId::from(glyph))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format4 {
    pub language: u16,
    pub end_codes: Vec<u16>,
    pub start_codes: Vec<u16>,
    pub id_deltas: Vec<i16>,
    pub id_range_offsets: Vec<u16>,
    pub glyph_id_array: Vec<u16>,
}

impl Format4 {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        let length = usize::from(reader.read_u16()?);
        let language = reader.read_u16()?;
        let seg_count = usize::from(reader.read_u16()? / 2);
        // searchRange, entrySelector and rangeShift are recomputable
        reader.skip(6)?;

        let end_codes = reader.read_array::<u16>(seg_count)?;
        let _reserved_pad = reader.read_u16()?;
        let start_codes = reader.read_array::<u16>(seg_count)?;
        let id_deltas = reader.read_array::<i16>(seg_count)?;
        let id_range_offsets = reader.read_array::<u16>(seg_count)?;

        // Some fonts write a length that is too small or too large; the glyph
        // array runs to whichever end comes first.
        let declared_end = base.saturating_add(length).min(reader.len());
        let glyph_count = declared_end.saturating_sub(reader.position()) / 2;
        let glyph_id_array = reader.read_array::<u16>(glyph_count)?;

        Ok(Self {
            language,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets,
            glyph_id_array,
        })
    }

    /// Binary search over the segments; codepoints outside every segment map to 0
    pub fn map(&self, codepoint: u32) -> GlyphId {
        let Ok(codepoint) = u16::try_from(codepoint) else {
            return 0;
        };

        let mut lo = 0;
        let mut hi = self.end_codes.len();
        while lo < hi {
            let i = (lo + hi) / 2;
            if codepoint > self.end_codes[i] {
                lo = i + 1;
            } else if codepoint < self.start_codes[i] {
                hi = i;
            } else {
                return self.glyph_in_segment(codepoint, i);
            }
        }

        0
    }

    fn glyph_in_segment(&self, codepoint: u16, segment: usize) -> GlyphId {
        let delta = self.id_deltas[segment];
        let range_offset = usize::from(self.id_range_offsets[segment]);
        if range_offset == 0 {
            return codepoint.wrapping_add_signed(delta);
        }

        // idRangeOffset counts bytes from its own slot in the array, which
        // sits `seg_count - segment` words before glyphIdArray.
        let index = (range_offset / 2 + usize::from(codepoint - self.start_codes[segment]))
            .checked_sub(self.id_range_offsets.len() - segment);
        match index.and_then(|index| self.glyph_id_array.get(index)) {
            Some(&0) | None => 0,
            Some(&glyph) => glyph.wrapping_add_signed(delta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format6 {
    pub language: u16,
    pub first_code: u16,
    pub glyph_ids: Vec<u16>,
}

impl Format6 {
    fn read(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroTypeError> {
        let _length = reader.read_u16()?;
        let language = reader.read_u16()?;
        let first_code = reader.read_u16()?;
        let count = usize::from(reader.read_u16()?);

        Ok(Self {
            language,
            first_code,
            glyph_ids: reader.read_array(count)?,
        })
    }

    pub fn map(&self, codepoint: u32) -> GlyphId {
        codepoint
            .checked_sub(u32::from(self.first_code))
            .and_then(|index| self.glyph_ids.get(index as usize))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

impl ReadBe for SequentialMapGroup {
    const SIZE: usize = 12;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            start_char_code: reader.read_u32()?,
            end_char_code: reader.read_u32()?,
            start_glyph_id: reader.read_u32()?,
        })
    }
}

/// The group list shared by formats 12 and 13
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedGroups {
    pub language: u32,
    pub groups: Vec<SequentialMapGroup>,
}

impl SegmentedGroups {
    fn read(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroTypeError> {
        let _reserved = reader.read_u16()?;
        let _length = reader.read_u32()?;
        let language = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let mut groups = reader.read_array::<SequentialMapGroup>(count)?;
        groups.retain(|g| g.start_char_code <= g.end_char_code);

        Ok(Self { language, groups })
    }

    /// `sequential` selects format 12 (glyph ids increase along the group)
    /// over format 13 (the whole group maps to one glyph)
    fn map(&self, codepoint: u32, sequential: bool) -> GlyphId {
        let Ok(index) = self.groups.binary_search_by(|group| {
            if codepoint < group.start_char_code {
                std::cmp::Ordering::Greater
            } else if codepoint > group.end_char_code {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        }) else {
            return 0;
        };

        let group = &self.groups[index];
        let glyph = if sequential {
            group
                .start_glyph_id
                .saturating_add(codepoint - group.start_char_code)
        } else {
            group.start_glyph_id
        };
        GlyphId::try_from(glyph).unwrap_or(0)
    }
}

/// A `(startUnicodeValue, additionalCount)` range of a default UVS table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeRange {
    pub start_unicode_value: u32,
    pub additional_count: u8,
}

impl ReadBe for UnicodeRange {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            start_unicode_value: reader.read_u24()?,
            additional_count: reader.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UvsMapping {
    pub unicode_value: u32,
    pub glyph_id: GlyphId,
}

impl ReadBe for UvsMapping {
    const SIZE: usize = 5;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            unicode_value: reader.read_u24()?,
            glyph_id: reader.read_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationSelector {
    pub var_selector: u32,
    pub default_uvs: Vec<UnicodeRange>,
    pub non_default_uvs: Vec<UvsMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format14 {
    /// Sorted by `var_selector`
    pub selectors: Vec<VariationSelector>,
}

impl Format14 {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        let _length = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        reader.check_remaining(count, 11)?;

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push((reader.read_u24()?, reader.read_u32()?, reader.read_u32()?));
        }

        let selectors = records
            .into_iter()
            .map(|(var_selector, default_offset, non_default_offset)| -> Result<_, VeroTypeError> {
                let default_uvs = if default_offset == 0 {
                    Vec::new()
                } else {
                    reader.seek_relative(base, default_offset as usize)?;
                    let count = reader.read_u32()? as usize;
                    reader.read_array(count)?
                };
                let non_default_uvs = if non_default_offset == 0 {
                    Vec::new()
                } else {
                    reader.seek_relative(base, non_default_offset as usize)?;
                    let count = reader.read_u32()? as usize;
                    reader.read_array(count)?
                };

                Ok(VariationSelector {
                    var_selector,
                    default_uvs,
                    non_default_uvs,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { selectors })
    }

    pub fn map_variant(&self, codepoint: u32, selector: u32) -> Option<MapVariant> {
        let index = self
            .selectors
            .binary_search_by_key(&selector, |record| record.var_selector)
            .ok()?;
        let record = &self.selectors[index];

        let is_default = record.default_uvs.iter().any(|range| {
            codepoint >= range.start_unicode_value
                && codepoint - range.start_unicode_value <= u32::from(range.additional_count)
        });
        if is_default {
            return Some(MapVariant::UseDefault);
        }

        record
            .non_default_uvs
            .binary_search_by_key(&codepoint, |mapping| mapping.unicode_value)
            .ok()
            .map(|index| MapVariant::Variant(record.non_default_uvs[index].glyph_id))
    }
}

impl Cmap {
    /// Reads the header, the encoding records and every subtable they point
    /// to. Unreadable or unsupported subtables are reported and skipped.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u16()?;
        let count = usize::from(reader.read_u16()?);
        let records = reader.read_array::<EncodingRecord>(count)?;
        let num_glyphs = ctx.optional::<Maxp>().map(|maxp| u32::from(maxp.num_glyphs));

        let mut subtables = Vec::with_capacity(records.len());
        for record in records {
            match CmapSubtable::read(&mut reader, record.offset as usize) {
                Ok(subtable) => {
                    let out_of_range = num_glyphs.is_some_and(|num_glyphs| {
                        subtable.max_glyph_id().is_some_and(|max| max >= num_glyphs)
                    });
                    if out_of_range {
                        ctx.report(TableEncodingError::InvalidData(
                            "cmap maps to a glyph id past numGlyphs",
                        ));
                    }
                    subtables.push((record, subtable));
                }
                Err(err) => ctx.report(err),
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            subtables,
        })
    }

    /// Maps a codepoint to a glyph, 0 meaning the missing glyph.
    ///
    /// With `next_codepoint == 0` every subtable is asked and a Windows
    /// Unicode BMP (3, 1) answer beats an earlier answer from any other
    /// encoding. Otherwise `(codepoint, next_codepoint)` is treated as a
    /// variation sequence and only pair-aware subtables answer.
    pub fn lookup_index(&self, codepoint: u32, next_codepoint: u32) -> GlyphId {
        if next_codepoint != 0 {
            return self.lookup_variant(codepoint, next_codepoint);
        }

        let mut found = 0;
        for (record, subtable) in &self.subtables {
            let glyph = subtable.map(codepoint);
            if glyph == 0 {
                continue;
            }
            if record.is_windows_unicode_bmp() {
                return glyph;
            }
            if found == 0 {
                found = glyph;
            }
        }

        found
    }

    fn lookup_variant(&self, codepoint: u32, selector: u32) -> GlyphId {
        for (_, subtable) in &self.subtables {
            match subtable.map_variant(codepoint, selector) {
                Some(MapVariant::Variant(glyph)) => return glyph,
                Some(MapVariant::UseDefault) => return self.lookup_index(codepoint, 0),
                None => {}
            }
        }

        0
    }

    /// The first subtable for a platform/encoding pair
    pub fn subtable(&self, platform_id: u16, encoding_id: u16) -> Option<&CmapSubtable> {
        self.subtables
            .iter()
            .find(|(record, _)| record.platform_id == platform_id && record.encoding_id == encoding_id)
            .map(|(_, subtable)| subtable)
    }
}

/// Memoizes [`Cmap::lookup_index`] by codepoint.
///
/// Variation sequence lookups are passed straight through and never stored,
/// since the cached value for a codepoint is its default mapping.
#[derive(Debug)]
pub struct CmapCache<'a> {
    cmap: &'a Cmap,
    glyphs: HashMap<u32, GlyphId>,
}

impl<'a> CmapCache<'a> {
    pub fn new(cmap: &'a Cmap) -> Self {
        Self {
            cmap,
            glyphs: HashMap::new(),
        }
    }

    pub fn lookup_index(&mut self, codepoint: u32, next_codepoint: u32) -> GlyphId {
        if next_codepoint != 0 {
            return self.cmap.lookup_index(codepoint, next_codepoint);
        }

        *self
            .glyphs
            .entry(codepoint)
            .or_insert_with(|| self.cmap.lookup_index(codepoint, 0))
    }

    /// Number of cached codepoints
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    /// Segments 'A'..='C' → 10.. by delta, 'a'..='b' through glyphIdArray
    /// and the 0xFFFF terminator
    fn format4() -> Vec<u8> {
        let mut data = be16(&[4, 0, 0, 6, 4, 1, 2]);
        data.extend(be16(&[0x43, 0x62, 0xFFFF]));
        data.extend(be16(&[0]));
        data.extend(be16(&[0x41, 0x61, 0xFFFF]));
        data.extend(be16(&[(10i16 - 0x41) as u16, 0, 1]));
        // second segment's idRangeOffset points just past the offsets array
        data.extend(be16(&[0, 4, 0]));
        data.extend(be16(&[20, 21]));
        let length = data.len() as u16;
        data[2..4].copy_from_slice(&length.to_be_bytes());
        data
    }

    fn format0(shift: u8) -> Vec<u8> {
        let mut data = be16(&[0, 262, 0]);
        data.extend((0..=255u8).map(|b| b.wrapping_add(shift)));
        data
    }

    fn format14() -> Vec<u8> {
        let mut data = be16(&[14]);
        data.extend(0u32.to_be_bytes());
        data.extend(1u32.to_be_bytes());
        // selector U+FE00 with default and non-default tables at 21 and 29
        data.extend(&0xFE00u32.to_be_bytes()[1..]);
        data.extend(21u32.to_be_bytes());
        data.extend(29u32.to_be_bytes());
        data.extend(1u32.to_be_bytes());
        data.extend([0, 0, 0x41, 0]);
        data.extend(1u32.to_be_bytes());
        data.extend([0, 0, 0x42]);
        data.extend(77u16.to_be_bytes());
        data
    }

    fn encode(subtables: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
        let mut data = be16(&[0, subtables.len() as u16]);
        let mut offset = 4 + 8 * subtables.len();
        for (platform, encoding, subtable) in subtables {
            data.extend(be16(&[*platform, *encoding]));
            data.extend((offset as u32).to_be_bytes());
            offset += subtable.len();
        }
        for (_, _, subtable) in subtables {
            data.extend(subtable);
        }
        data
    }

    fn cmap(subtables: &[(u16, u16, Vec<u8>)]) -> Cmap {
        let data = encode(subtables);
        let mut diagnostics = Diagnostics::default();
        let cmap = Cmap::from_context(&mut ParseContext::standalone(Tag::CMAP, &data, &mut diagnostics))
            .unwrap();
        assert!(diagnostics.is_empty());
        cmap
    }

    #[test]
    fn format4_segments() {
        let cmap = cmap(&[(3, 1, format4())]);

        assert_eq!(cmap.lookup_index(0x41, 0), 10);
        assert_eq!(cmap.lookup_index(0x43, 0), 12);
        assert_eq!(cmap.lookup_index(0x61, 0), 20);
        assert_eq!(cmap.lookup_index(0x62, 0), 21);
    }

    #[test]
    fn format4_outside_every_segment_is_zero() {
        let cmap = cmap(&[(3, 1, format4())]);

        for codepoint in [0, 0x40, 0x44, 0x60, 0x63, 0x1F600] {
            assert_eq!(cmap.lookup_index(codepoint, 0), 0);
        }
    }

    #[test]
    fn format0_stops_at_256() {
        let cmap = cmap(&[(1, 0, format0(0))]);

        assert_eq!(cmap.lookup_index(0x41, 0), 0x41);
        assert_eq!(cmap.lookup_index(255, 0), 255);
        assert_eq!(cmap.lookup_index(256, 0), 0);
    }

    #[test]
    fn windows_unicode_bmp_wins_ties() {
        let cmap = cmap(&[(1, 0, format0(1)), (3, 1, format4()), (0, 3, format0(2))]);

        // only the Mac table maps this one
        assert_eq!(cmap.lookup_index(0x30, 0), 0x31);
        // both map 'A'; the (3, 1) result replaces the earlier one
        assert_eq!(cmap.lookup_index(0x41, 0), 10);
    }

    #[test]
    fn variation_sequences() {
        let cmap = cmap(&[(3, 1, format4()), (0, 5, format14())]);

        assert_eq!(cmap.lookup_index(0x42, 0xFE00), 77);
        // default UVS falls back to the nominal mapping
        assert_eq!(cmap.lookup_index(0x41, 0xFE00), 10);
        assert_eq!(cmap.lookup_index(0x43, 0xFE00), 0);
        assert_eq!(cmap.lookup_index(0x42, 0xFE01), 0);
    }

    #[test]
    fn cache_skips_variation_sequences() {
        let cmap = cmap(&[(3, 1, format4()), (0, 5, format14())]);
        let mut cache = CmapCache::new(&cmap);

        assert_eq!(cache.lookup_index(0x42, 0xFE00), 77);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup_index(0x42, 0), 11);
        assert_eq!(cache.lookup_index(0x42, 0), 11);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn segmented_coverage_formats() {
        let mut format12 = be16(&[12, 0]);
        for v in [28u32, 0, 1, 0x1F600, 0x1F602, 5] {
            format12.extend(v.to_be_bytes());
        }
        let mut format13 = format12.clone();
        format13[1] = 13;

        let cmap = cmap(&[(3, 10, format12), (0, 6, format13)]);

        assert_eq!(cmap.lookup_index(0x1F601, 0), 6);
        assert_eq!(cmap.lookup_index(0x1F603, 0), 0);
        assert_eq!(cmap.subtable(0, 6).unwrap().map(0x1F602), 5);
        assert_eq!(cmap.subtable(0, 6).unwrap().format(), 13);
    }

    #[test]
    fn group_glyph_ids_near_the_top_saturate() {
        let mut format12 = be16(&[12, 0]);
        for v in [28u32, 0, 1, 0x41, 0x42, u32::MAX] {
            format12.extend(v.to_be_bytes());
        }
        let data = encode(&[(3, 10, format12.clone())]);

        // without maxp there is no bound to check against
        let cmap = cmap(&[(3, 10, format12)]);
        assert_eq!(cmap.lookup_index(0x42, 0), 0);

        let mut diagnostics = Diagnostics::default();
        let maxp: FontTable = Maxp::from_context(&mut ParseContext::standalone(
            Tag::MAXP,
            &[0, 0, 0x50, 0, 0, 5],
            &mut diagnostics,
        ))
        .unwrap()
        .into();
        let result = {
            let mut ctx = ParseContext::standalone(Tag::CMAP, &data, &mut diagnostics).with_dependency(&maxp);
            Cmap::from_context(&mut ctx)
        };

        assert_eq!(result.unwrap().subtables.len(), 1);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn unsupported_subtable_is_reported_and_skipped() {
        let mut data = be16(&[0, 2, 3, 1, 0, 20, 3, 0, 0, 20]);
        data.extend(be16(&[6, 10, 0, 0x30, 1, 9]));
        data.extend(be16(&[8]));
        // first record points past the format 6 table: rewrite its offset
        data[6..8].copy_from_slice(&32u16.to_be_bytes());
        data.extend([0; 4]);

        let mut diagnostics = Diagnostics::default();
        let cmap = Cmap::from_context(&mut ParseContext::standalone(Tag::CMAP, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(cmap.subtables.len(), 1);
        assert_eq!(cmap.lookup_index(0x30, 0), 9);
        assert_eq!(diagnostics.len(), 1);
    }
}
