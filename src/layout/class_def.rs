use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    tables::TableEncodingError,
    types::GlyphId,
};

/// Maps glyphs to a class value; glyphs not listed are in class 0.
///
/// `T` is the class representation, `u16` for plain class numbers or an
/// enum such as GDEF's glyph classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDefinitionTable<T = u16> {
    /// Consecutive class values starting at `start_glyph_id`
    Format1 {
        start_glyph_id: GlyphId,
        classes: Vec<T>,
    },
    /// Sorted, non-overlapping glyph ranges sharing a class
    Format2 { ranges: Vec<ClassRangeRecord<T>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRangeRecord<T = u16> {
    pub start_glyph_id: GlyphId,
    pub end_glyph_id: GlyphId,
    pub class: T,
}

impl<T: From<u16>> ReadBe for ClassRangeRecord<T> {
    const SIZE: usize = 6;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            start_glyph_id: reader.read_u16()?,
            end_glyph_id: reader.read_u16()?,
            class: T::from(reader.read_u16()?),
        })
    }
}

impl<T: From<u16> + Copy> ClassDefinitionTable<T> {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;

        match format {
            1 => {
                let start_glyph_id = reader.read_u16()?;
                let count = usize::from(reader.read_u16()?);
                let classes = reader.read_array::<u16>(count)?;
                Ok(Self::Format1 {
                    start_glyph_id,
                    classes: classes.into_iter().map(T::from).collect(),
                })
            }
            2 => {
                let count = usize::from(reader.read_u16()?);
                Ok(Self::Format2 {
                    ranges: reader.read_array(count)?,
                })
            }
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "class definition",
                format,
            }
            .into()),
        }
    }

    /// A table that puts every glyph in class 0, used where an optional
    /// class definition offset is null
    pub fn empty() -> Self {
        Self::Format2 { ranges: Vec::new() }
    }

    pub fn class_of(&self, glyph: GlyphId) -> T {
        let class = match self {
            Self::Format1 {
                start_glyph_id,
                classes,
            } => glyph
                .checked_sub(*start_glyph_id)
                .and_then(|i| classes.get(usize::from(i)))
                .copied(),
            Self::Format2 { ranges } => {
                let i = ranges.partition_point(|range| range.end_glyph_id < glyph);
                ranges
                    .get(i)
                    .filter(|range| range.start_glyph_id <= glyph)
                    .map(|range| range.class)
            }
        };

        class.unwrap_or_else(|| T::from(0))
    }
}

impl<T: From<u16> + Copy> ClassDefinitionTable<T>
where
    u16: From<T>,
{
    /// The raw class number of `glyph`, 0 when it is not listed
    pub fn class_value(&self, glyph: GlyphId) -> u16 {
        u16::from(self.class_of(glyph))
    }
}
