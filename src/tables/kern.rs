use bitflags::bitflags;

use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::KERN,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Kern::from_context(ctx)?.into())
}

bitflags! {
    /// The coverage byte of a kern subtable
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KernCoverage: u8 {
        const HORIZONTAL = 0x01;
        const MINIMUM = 0x02;
        const CROSS_STREAM = 0x04;
        const OVERRIDE = 0x08;
    }
}

/// The Windows (version 0) [kern table](https://learn.microsoft.com/en-us/typography/opentype/spec/kern)
#[derive(Debug, Clone)]
pub struct Kern {
    pub metadata: TableMetadata,
    pub subtables: Vec<KernSubtable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernSubtable {
    pub coverage: KernCoverage,
    pub format: KernFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernFormat {
    /// Pairs sorted by `(left, right)`
    Format0(Vec<KernPair>),
    Format2(ClassKerning),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernPair {
    pub left: GlyphId,
    pub right: GlyphId,
    pub value: i16,
}

impl ReadBe for KernPair {
    const SIZE: usize = 6;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            left: reader.read_u16()?,
            right: reader.read_u16()?,
            value: reader.read_i16()?,
        })
    }
}

/// Format 2: a two-dimensional array indexed by left and right class.
///
/// Class values are byte offsets from the start of the subtable; the left
/// ones already include the row width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassKerning {
    pub row_width: u16,
    pub left_classes: KernClassTable,
    pub right_classes: KernClassTable,
    pub array_offset: u16,
    /// The subtable's bytes, values are read from it on lookup
    data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernClassTable {
    pub first_glyph: GlyphId,
    pub values: Vec<u16>,
}

impl KernClassTable {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let first_glyph = reader.read_u16()?;
        let count = usize::from(reader.read_u16()?);

        Ok(Self {
            first_glyph,
            values: reader.read_array(count)?,
        })
    }

    fn class_of(&self, glyph: GlyphId) -> u16 {
        glyph
            .checked_sub(self.first_glyph)
            .and_then(|index| self.values.get(usize::from(index)))
            .copied()
            .unwrap_or(0)
    }
}

impl ClassKerning {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, end: usize) -> Result<Self, VeroTypeError> {
        let row_width = reader.read_u16()?;
        let left_offset = usize::from(reader.read_u16()?);
        let right_offset = usize::from(reader.read_u16()?);
        let array_offset = reader.read_u16()?;

        let left_base = reader.resolve(base, left_offset)?;
        let right_base = reader.resolve(base, right_offset)?;
        let left_classes = KernClassTable::read(reader, left_base)?;
        let right_classes = KernClassTable::read(reader, right_base)?;

        Ok(Self {
            row_width,
            left_classes,
            right_classes,
            array_offset,
            data: reader.data().get(base..end).unwrap_or_default().to_vec(),
        })
    }

    pub fn kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let index = usize::from(self.left_classes.class_of(left))
            + usize::from(self.right_classes.class_of(right));
        if index < usize::from(self.array_offset) {
            return None;
        }

        let bytes = self.data.get(index..index + 2)?;
        Some(i16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl KernSubtable {
    pub fn kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        match &self.format {
            KernFormat::Format0(pairs) => pairs
                .binary_search_by_key(&(left, right), |pair| (pair.left, pair.right))
                .ok()
                .map(|index| pairs[index].value),
            KernFormat::Format2(classes) => classes.kerning(left, right),
        }
    }
}

impl Kern {
    /// Reads a version 0 table. Subtables in formats other than 0 and 2 are
    /// reported and skipped.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_u16()?;
        if version != 0 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::KERN,
                version: u32::from(version),
            }
            .into());
        }

        let count = reader.read_u16()?;
        let mut subtables = Vec::new();
        for _ in 0..count {
            let base = reader.position();
            let _version = reader.read_u16()?;
            let length = usize::from(reader.read_u16()?);
            let format = reader.read_u8()?;
            let coverage = KernCoverage::from_bits_retain(reader.read_u8()?);

            let mut end = base.saturating_add(length).min(reader.len());
            match format {
                0 => {
                    let pair_count = usize::from(reader.read_u16()?);
                    reader.skip(6)?;
                    let mut pairs = reader.read_array::<KernPair>(pair_count)?;
                    pairs.sort_unstable_by_key(|pair| (pair.left, pair.right));
                    // the u16 length overflows on large pair lists
                    end = end.max(reader.position());
                    subtables.push(KernSubtable {
                        coverage,
                        format: KernFormat::Format0(pairs),
                    });
                }
                2 => match ClassKerning::read(&mut reader, base, end) {
                    Ok(classes) => subtables.push(KernSubtable {
                        coverage,
                        format: KernFormat::Format2(classes),
                    }),
                    Err(err) => ctx.report(err),
                },
                _ => ctx.report(TableEncodingError::UnsupportedSubtableFormat {
                    kind: "kern subtable",
                    format: u16::from(format),
                }),
            }

            if end <= base {
                break;
            }
            reader.seek_to(end)?;
        }

        Ok(Self {
            metadata: ctx.metadata(),
            subtables,
        })
    }

    /// Horizontal kerning between two glyphs, summed over the subtables
    /// that apply. An override subtable replaces the running value.
    pub fn pair_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let mut total = None;
        for subtable in &self.subtables {
            let coverage = subtable.coverage;
            if !coverage.contains(KernCoverage::HORIZONTAL)
                || coverage.intersects(KernCoverage::MINIMUM | KernCoverage::CROSS_STREAM)
            {
                continue;
            }
            let Some(value) = subtable.kerning(left, right) else {
                continue;
            };

            total = Some(if coverage.contains(KernCoverage::OVERRIDE) {
                value
            } else {
                total.unwrap_or(0i16).saturating_add(value)
            });
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn format0(coverage: u16, pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let length = 14 + 6 * pairs.len() as u16;
        let mut data = be16(&[0, length, coverage, pairs.len() as u16, 0, 0, 0]);
        for &(left, right, value) in pairs {
            data.extend(be16(&[left, right, value as u16]));
        }
        data
    }

    fn format2() -> Vec<u8> {
        // header 14, left classes at 14, right classes at 22, array at 30
        let mut data = be16(&[0, 36, 0x0201, 4, 14, 22, 30]);
        // glyphs 5 and 6: rows 0 and 1 (pre-multiplied by the row width)
        data.extend(be16(&[5, 2, 30, 34]));
        // glyphs 8 and 9: columns 0 and 1
        data.extend(be16(&[8, 2, 0, 2]));
        data.extend(be16(&[(-10i16) as u16, (-20i16) as u16, (-30i16) as u16]));
        data
    }

    fn read(subtables: &[Vec<u8>]) -> (Kern, Diagnostics) {
        let mut data = be16(&[0, subtables.len() as u16]);
        for subtable in subtables {
            data.extend(subtable);
        }

        let mut diagnostics = Diagnostics::default();
        let kern = Kern::from_context(&mut ParseContext::standalone(Tag::KERN, &data, &mut diagnostics))
            .unwrap();
        (kern, diagnostics)
    }

    #[test]
    fn format0_pairs_are_searchable() {
        let (kern, diagnostics) = read(&[format0(0x0001, &[(3, 4, -50), (1, 2, 20)])]);

        assert!(diagnostics.is_empty());
        assert_eq!(kern.pair_kerning(1, 2), Some(20));
        assert_eq!(kern.pair_kerning(3, 4), Some(-50));
        assert_eq!(kern.pair_kerning(2, 1), None);
    }

    #[test]
    fn format2_class_array() {
        let (kern, diagnostics) = read(&[format2()]);

        assert!(diagnostics.is_empty());
        assert_eq!(kern.pair_kerning(5, 8), Some(-10));
        assert_eq!(kern.pair_kerning(5, 9), Some(-20));
        assert_eq!(kern.pair_kerning(6, 8), Some(-30));
        // glyph 7 has no left class
        assert_eq!(kern.pair_kerning(7, 8), None);
    }

    #[test]
    fn subtables_add_up_unless_overriding() {
        let (kern, _) = read(&[
            format0(0x0001, &[(1, 2, 20)]),
            format0(0x0001, &[(1, 2, 5)]),
            format0(0x0005, &[(1, 2, 100)]),
        ]);
        assert_eq!(kern.pair_kerning(1, 2), Some(25));

        let (kern, _) = read(&[format0(0x0001, &[(1, 2, 20)]), format0(0x0009, &[(1, 2, 7)])]);
        assert_eq!(kern.pair_kerning(1, 2), Some(7));
    }

    #[test]
    fn unknown_subtable_format_is_skipped() {
        let (kern, diagnostics) = read(&[be16(&[0, 6, 0x0301]), format0(0x0001, &[(1, 2, 20)])]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(kern.subtables.len(), 1);
        assert_eq!(kern.pair_kerning(1, 2), Some(20));
    }
}
