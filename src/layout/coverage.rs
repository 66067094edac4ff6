use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    tables::TableEncodingError,
    types::GlyphId,
};

/// The set of glyphs a layout rule applies to, with each glyph's position
/// in that set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageTable {
    /// Sorted glyph array; the coverage index is the array index
    Format1 { glyphs: Vec<GlyphId> },
    /// Sorted, non-overlapping glyph ranges
    Format2 { ranges: Vec<RangeRecord> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRecord {
    pub start_glyph_id: GlyphId,
    pub end_glyph_id: GlyphId,
    pub start_coverage_index: u16,
}

impl ReadBe for RangeRecord {
    const SIZE: usize = 6;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            start_glyph_id: reader.read_u16()?,
            end_glyph_id: reader.read_u16()?,
            start_coverage_index: reader.read_u16()?,
        })
    }
}

impl CoverageTable {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;
        let count = usize::from(reader.read_u16()?);

        match format {
            1 => Ok(Self::Format1 {
                glyphs: reader.read_array(count)?,
            }),
            2 => Ok(Self::Format2 {
                ranges: reader.read_array(count)?,
            }),
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "coverage",
                format,
            }
            .into()),
        }
    }

    /// Position of `glyph` in the covered set, `None` if not covered
    pub fn coverage_index(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            Self::Format1 { glyphs } => glyphs.binary_search(&glyph).ok().map(|i| i as u16),
            Self::Format2 { ranges } => {
                let i = ranges.partition_point(|range| range.end_glyph_id < glyph);
                let range = ranges.get(i)?;
                (range.start_glyph_id <= glyph).then(|| {
                    range
                        .start_coverage_index
                        .wrapping_add(glyph - range.start_glyph_id)
                })
            }
        }
    }

    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.coverage_index(glyph).is_some()
    }

    /// Covered glyphs in coverage order
    pub fn iter(&self) -> impl Iterator<Item = GlyphId> + '_ {
        let (glyphs, ranges) = match self {
            Self::Format1 { glyphs } => (Some(glyphs.iter().copied()), None),
            Self::Format2 { ranges } => (
                None,
                Some(
                    ranges
                        .iter()
                        .flat_map(|r| r.start_glyph_id..=r.end_glyph_id),
                ),
            ),
        };

        glyphs.into_iter().flatten().chain(ranges.into_iter().flatten())
    }

    /// Number of covered glyphs
    pub fn len(&self) -> usize {
        match self {
            Self::Format1 { glyphs } => glyphs.len(),
            Self::Format2 { ranges } => ranges
                .iter()
                .map(|r| usize::from(r.end_glyph_id.saturating_sub(r.start_glyph_id)) + 1)
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format1(glyphs: &[GlyphId]) -> Vec<u8> {
        let mut data = vec![0, 1];
        data.extend((glyphs.len() as u16).to_be_bytes());
        for g in glyphs {
            data.extend(g.to_be_bytes());
        }
        data
    }

    fn format2(glyphs: &[GlyphId]) -> Vec<u8> {
        let mut ranges: Vec<(u16, u16, u16)> = Vec::new();
        for (i, &g) in glyphs.iter().enumerate() {
            match ranges.last_mut() {
                Some(last) if last.1 + 1 == g => last.1 = g,
                _ => ranges.push((g, g, i as u16)),
            }
        }
        let mut data = vec![0, 2];
        data.extend((ranges.len() as u16).to_be_bytes());
        for (start, end, index) in ranges {
            data.extend(start.to_be_bytes());
            data.extend(end.to_be_bytes());
            data.extend(index.to_be_bytes());
        }
        data
    }

    fn read(data: &[u8]) -> CoverageTable {
        CoverageTable::read(&mut VeroBufReader::new(data), 0).unwrap()
    }

    #[test]
    fn formats_agree_on_every_glyph() {
        let sets: [&[GlyphId]; 4] = [
            &[],
            &[7],
            &[1, 2, 3, 10, 11, 40, 41, 42, 43, 100],
            &[0, 2, 4, 6, 8, 9, 10, 500],
        ];

        for set in sets {
            let one = read(&format1(set));
            let two = read(&format2(set));
            assert!(matches!(one, CoverageTable::Format1 { .. }));
            assert!(matches!(two, CoverageTable::Format2 { .. }));

            for glyph in 0..600 {
                let expected = set.iter().position(|&g| g == glyph).map(|i| i as u16);
                assert_eq!(one.coverage_index(glyph), expected, "format 1, glyph {glyph}");
                assert_eq!(two.coverage_index(glyph), expected, "format 2, glyph {glyph}");
            }
            assert_eq!(one.len(), set.len());
            assert_eq!(two.len(), set.len());
            assert_eq!(two.iter().collect::<Vec<_>>(), set.to_vec());
        }
    }

    #[test]
    fn reads_relative_to_base() {
        let mut data = vec![0xAA; 6];
        data.extend(format1(&[5, 9]));
        let table = CoverageTable::read(&mut VeroBufReader::new(&data), 6).unwrap();

        assert_eq!(table.coverage_index(9), Some(1));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let data = [0, 3, 0, 0];
        assert!(CoverageTable::read(&mut VeroBufReader::new(&data), 0).is_err());
    }

    #[test]
    fn oversized_count_fails_before_reading() {
        let data = [0, 2, 0xff, 0xff, 0, 1];
        assert!(CoverageTable::read(&mut VeroBufReader::new(&data), 0).is_err());
    }
}
