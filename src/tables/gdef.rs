use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    layout::{ClassDefinitionTable, CoverageTable, DeviceTable, read_counted, read_reported},
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::GDEF,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Gdef::from_context(ctx)?.into())
}

/// Glyph classes from the GDEF glyph class definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphClass {
    Unclassified,
    /// Single character, spacing glyph
    Base,
    /// Multiple character, spacing glyph
    Ligature,
    /// Non-spacing combining glyph
    Mark,
    /// Part of a single character, spacing glyph
    Component,
    Unknown(u16),
}

impl From<u16> for GlyphClass {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Unclassified,
            1 => Self::Base,
            2 => Self::Ligature,
            3 => Self::Mark,
            4 => Self::Component,
            other => Self::Unknown(other),
        }
    }
}

impl From<GlyphClass> for u16 {
    fn from(class: GlyphClass) -> Self {
        match class {
            GlyphClass::Unclassified => 0,
            GlyphClass::Base => 1,
            GlyphClass::Ligature => 2,
            GlyphClass::Mark => 3,
            GlyphClass::Component => 4,
            GlyphClass::Unknown(other) => other,
        }
    }
}

/// Contour points used for attachment, per covered glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachList {
    pub coverage: CoverageTable,
    /// Indexed by coverage index
    pub attach_points: Vec<Vec<u16>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaretValue {
    /// X or Y in design units
    Coordinate(i16),
    /// A contour point on the glyph
    ContourPoint(u16),
    /// A coordinate plus a device or variation adjustment
    DeviceCoordinate {
        coordinate: i16,
        device: Option<DeviceTable>,
    },
}

impl CaretValue {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;

        match format {
            1 => Ok(Self::Coordinate(reader.read_i16()?)),
            2 => Ok(Self::ContourPoint(reader.read_u16()?)),
            3 => {
                let coordinate = reader.read_i16()?;
                let device_offset = reader.read_u16()?;
                let device = match device_offset {
                    0 => None,
                    offset => {
                        let pos = reader.resolve(base, usize::from(offset))?;
                        Some(DeviceTable::read(reader, pos)?)
                    }
                };
                Ok(Self::DeviceCoordinate { coordinate, device })
            }
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "caret value",
                format,
            }
            .into()),
        }
    }
}

/// Caret positions inside ligatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigCaretList {
    pub coverage: CoverageTable,
    /// Indexed by coverage index; carets are in writing order
    pub lig_glyphs: Vec<Vec<CaretValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkGlyphSets {
    pub coverages: Vec<CoverageTable>,
}

/// The [GDEF table](https://learn.microsoft.com/en-us/typography/opentype/spec/gdef),
/// versions 1.0, 1.2 and 1.3.
///
/// Every sub-table is optional; one that fails to read is reported and
/// left as `None`.
#[derive(Debug, Clone)]
pub struct Gdef {
    pub metadata: TableMetadata,
    pub major_version: u16,
    pub minor_version: u16,
    pub glyph_class_def: Option<ClassDefinitionTable<GlyphClass>>,
    pub attach_list: Option<AttachList>,
    pub lig_caret_list: Option<LigCaretList>,
    pub mark_attach_class_def: Option<ClassDefinitionTable>,
    /// Version 1.2 and later
    pub mark_glyph_sets: Option<MarkGlyphSets>,
    /// Version 1.3; the variation store itself is not read
    pub item_var_store_offset: Option<u32>,
}

impl Gdef {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if major_version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::GDEF,
                version: u32::from(major_version) << 16 | u32::from(minor_version),
            }
            .into());
        }

        let glyph_class_offset = usize::from(reader.read_u16()?);
        let attach_list_offset = usize::from(reader.read_u16()?);
        let lig_caret_offset = usize::from(reader.read_u16()?);
        let mark_attach_offset = usize::from(reader.read_u16()?);
        let mark_sets_offset = match minor_version {
            2.. => usize::from(reader.read_u16()?),
            _ => 0,
        };
        let item_var_store_offset = match minor_version {
            3.. => Some(reader.read_u32()?),
            _ => None,
        };

        let glyph_class_def = read_reported(&mut reader, 0, glyph_class_offset, ctx, |r, pos, _| {
            ClassDefinitionTable::read(r, pos)
        });
        let attach_list = read_reported(&mut reader, 0, attach_list_offset, ctx, |r, pos, _| {
            read_attach_list(r, pos)
        });
        let lig_caret_list = read_reported(&mut reader, 0, lig_caret_offset, ctx, |r, pos, _| {
            read_lig_caret_list(r, pos)
        });
        let mark_attach_class_def = read_reported(&mut reader, 0, mark_attach_offset, ctx, |r, pos, _| {
            ClassDefinitionTable::read(r, pos)
        });
        let mark_glyph_sets = read_reported(&mut reader, 0, mark_sets_offset, ctx, |r, pos, _| {
            read_mark_glyph_sets(r, pos)
        });

        Ok(Self {
            metadata: ctx.metadata(),
            major_version,
            minor_version,
            glyph_class_def,
            attach_list,
            lig_caret_list,
            mark_attach_class_def,
            mark_glyph_sets,
            item_var_store_offset,
        })
    }

    /// The glyph's class; `Unclassified` without a class definition
    pub fn glyph_class(&self, glyph: GlyphId) -> GlyphClass {
        self.glyph_class_def
            .as_ref()
            .map_or(GlyphClass::Unclassified, |def| def.class_of(glyph))
    }

    /// The mark attachment class compared against a lookup's
    /// `MARK_ATTACHMENT_CLASS_FILTER`
    pub fn mark_attach_class(&self, glyph: GlyphId) -> u16 {
        self.mark_attach_class_def
            .as_ref()
            .map_or(0, |def| def.class_of(glyph))
    }

    /// Whether `glyph` is in mark filtering set `set`
    pub fn is_mark_in_set(&self, set: u16, glyph: GlyphId) -> bool {
        self.mark_glyph_sets
            .as_ref()
            .and_then(|sets| sets.coverages.get(usize::from(set)))
            .is_some_and(|coverage| coverage.contains(glyph))
    }

    pub fn attach_points(&self, glyph: GlyphId) -> Option<&[u16]> {
        let list = self.attach_list.as_ref()?;
        let index = list.coverage.coverage_index(glyph)?;

        list.attach_points.get(usize::from(index)).map(Vec::as_slice)
    }

    pub fn lig_carets(&self, glyph: GlyphId) -> Option<&[CaretValue]> {
        let list = self.lig_caret_list.as_ref()?;
        let index = list.coverage.coverage_index(glyph)?;

        list.lig_glyphs.get(usize::from(index)).map(Vec::as_slice)
    }
}

fn read_attach_list(reader: &mut VeroBufReader<'_>, base: usize) -> Result<AttachList, VeroTypeError> {
    reader.seek_to(base)?;
    let coverage_offset = usize::from(reader.read_u16()?);
    let coverage = reader.resolve(base, coverage_offset)?;
    let offsets = read_counted::<u16>(reader)?;

    let attach_points = offsets
        .into_iter()
        .map(|offset| -> Result<_, VeroTypeError> {
            reader.seek_relative(base, usize::from(offset))?;
            read_counted::<u16>(reader)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AttachList {
        coverage: CoverageTable::read(reader, coverage)?,
        attach_points,
    })
}

fn read_lig_caret_list(reader: &mut VeroBufReader<'_>, base: usize) -> Result<LigCaretList, VeroTypeError> {
    reader.seek_to(base)?;
    let coverage_offset = usize::from(reader.read_u16()?);
    let coverage = reader.resolve(base, coverage_offset)?;
    let offsets = read_counted::<u16>(reader)?;

    let lig_glyphs = offsets
        .into_iter()
        .map(|offset| -> Result<_, VeroTypeError> {
            let lig_glyph = reader.resolve(base, usize::from(offset))?;
            reader.seek_to(lig_glyph)?;
            let caret_offsets = read_counted::<u16>(reader)?;
            caret_offsets
                .into_iter()
                .map(|caret| {
                    let pos = reader.resolve(lig_glyph, usize::from(caret))?;
                    CaretValue::read(reader, pos)
                })
                .collect()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LigCaretList {
        coverage: CoverageTable::read(reader, coverage)?,
        lig_glyphs,
    })
}

fn read_mark_glyph_sets(reader: &mut VeroBufReader<'_>, base: usize) -> Result<MarkGlyphSets, VeroTypeError> {
    reader.seek_to(base)?;
    let format = reader.read_u16()?;
    if format != 1 {
        return Err(TableEncodingError::UnsupportedSubtableFormat {
            kind: "mark glyph sets",
            format,
        }
        .into());
    }
    let count = usize::from(reader.read_u16()?);
    let offsets = reader.read_array::<u32>(count)?;

    let coverages = offsets
        .into_iter()
        .map(|offset| {
            let pos = reader.resolve(base, offset as usize)?;
            CoverageTable::read(reader, pos)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MarkGlyphSets { coverages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;
    use pretty_assertions::assert_eq;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn read(data: &[u8]) -> (Gdef, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let gdef = Gdef::from_context(&mut ParseContext::standalone(Tag::GDEF, data, &mut diagnostics))
            .unwrap();
        (gdef, diagnostics)
    }

    #[test]
    fn version_1_2_sections() {
        // header 14 bytes, then:
        // 14: glyph class def (format 2): [10..=12] base, [20..=20] mark
        // 30: lig caret list
        // 56: mark attach class def (format 1): glyph 20 -> 2
        // 64: mark glyph sets
        let mut data = be16(&[1, 2, 14, 0, 30, 56, 64]);
        data.extend(be16(&[2, 2, 10, 12, 1, 20, 20, 3]));
        // lig caret list: coverage at +20, one LigGlyph at +6
        data.extend(be16(&[20, 1, 6]));
        // LigGlyph: two carets at +6 and +10
        data.extend(be16(&[2, 6, 10]));
        data.extend(be16(&[1, 500]));
        data.extend(be16(&[2, 7]));
        // coverage: glyph 11
        data.extend(be16(&[1, 1, 11]));
        data.extend(be16(&[1, 20, 1, 2]));
        // mark glyph sets: one set at +8 covering glyph 20
        data.extend(be16(&[1, 1, 0, 8]));
        data.extend(be16(&[1, 1, 20]));

        let (gdef, diagnostics) = read(&data);

        assert!(diagnostics.is_empty());
        assert_eq!(gdef.glyph_class(11), GlyphClass::Base);
        assert_eq!(gdef.glyph_class(20), GlyphClass::Mark);
        assert_eq!(gdef.glyph_class(15), GlyphClass::Unclassified);
        assert_eq!(gdef.glyph_class_def.as_ref().unwrap().class_value(20), 3);
        assert_eq!(
            gdef.lig_carets(11),
            Some(&[CaretValue::Coordinate(500), CaretValue::ContourPoint(7)][..])
        );
        assert_eq!(gdef.lig_carets(10), None);
        assert_eq!(gdef.mark_attach_class(20), 2);
        assert!(gdef.is_mark_in_set(0, 20));
        assert!(!gdef.is_mark_in_set(1, 20));
        assert!(gdef.attach_list.is_none());
        assert_eq!(gdef.item_var_store_offset, None);
    }

    #[test]
    fn broken_section_is_reported() {
        // glyph class def points past the end
        let data = be16(&[1, 0, 200, 0, 0, 0]);
        let (gdef, diagnostics) = read(&data);

        assert!(gdef.glyph_class_def.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn attach_points() {
        // attach list at 12: coverage at +6, one AttachPoint at +12
        let mut data = be16(&[1, 0, 0, 12, 0, 0]);
        data.extend(be16(&[6, 1, 12]));
        data.extend(be16(&[1, 1, 4]));
        data.extend(be16(&[2, 3, 9]));

        let (gdef, _) = read(&data);

        assert_eq!(gdef.attach_points(4), Some(&[3, 9][..]));
        assert_eq!(gdef.attach_points(5), None);
    }
}
