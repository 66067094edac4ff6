use super::{FontTable, TableEncodingError, TableMetadata, gdef::Gdef, gsub::check_mark_filtering_sets};
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    layout::{
        ChainedSequenceContext, ClassDefinitionTable, CoverageTable, DeviceTable, LayoutTable,
        LookupKind, SequenceContext, SubtableConstructor, ValueFormat, ValueRecord, expect_format,
        read_counted, read_coverage_offset, read_reported, resolve_nullable,
    },
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::GPOS,
    requires: &[],
    optional: &[Tag::GDEF],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Gpos::from_context(ctx)?.into())
}

/// The [GPOS table](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos)
#[derive(Debug, Clone)]
pub struct Gpos {
    pub metadata: TableMetadata,
    pub layout: LayoutTable<PositioningSubtable>,
}

impl Gpos {
    /// Reads the header and every list, checking mark filtering sets
    /// against GDEF when it is available.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let layout = LayoutTable::read(ctx)?;
        if let Some(gdef) = ctx.optional::<Gdef>() {
            let filters = layout
                .lookup_list
                .iter()
                .map(|(_, lookup)| (lookup.flag(), lookup.mark_filtering_set()));
            check_mark_filtering_sets(ctx, gdef, filters);
        }

        Ok(Self {
            metadata: ctx.metadata(),
            layout,
        })
    }
}

/// A GPOS subtable. Extension subtables (type 9) are resolved into the type
/// they wrap.
#[derive(Debug, Clone, PartialEq)]
pub enum PositioningSubtable {
    /// Type 1
    Single(SinglePos),
    /// Type 2
    Pair(PairPos),
    /// Type 3
    Cursive(CursivePos),
    /// Type 4
    MarkToBase(MarkBasePos),
    /// Type 5
    MarkToLigature(MarkLigaturePos),
    /// Type 6
    MarkToMark(MarkBasePos),
    /// Type 7
    Context(SequenceContext),
    /// Type 8
    ChainContext(ChainedSequenceContext),
}

impl LookupKind for PositioningSubtable {
    const EXTENSION_TYPE: u16 = 9;
    const NAME: &'static str = "GPOS lookup type";

    fn constructor(lookup_type: u16) -> Option<SubtableConstructor<Self>> {
        let constructor: SubtableConstructor<Self> = match lookup_type {
            1 => |r, pos, ctx| Ok(Self::Single(SinglePos::read(r, pos, ctx)?)),
            2 => |r, pos, ctx| Ok(Self::Pair(PairPos::read(r, pos, ctx)?)),
            3 => |r, pos, ctx| Ok(Self::Cursive(CursivePos::read(r, pos, ctx)?)),
            4 => |r, pos, ctx| Ok(Self::MarkToBase(MarkBasePos::read(r, pos, ctx)?)),
            5 => |r, pos, ctx| Ok(Self::MarkToLigature(MarkLigaturePos::read(r, pos, ctx)?)),
            6 => |r, pos, ctx| Ok(Self::MarkToMark(MarkBasePos::read(r, pos, ctx)?)),
            7 => |r, pos, _| Ok(Self::Context(SequenceContext::read(r, pos)?)),
            8 => |r, pos, _| Ok(Self::ChainContext(ChainedSequenceContext::read(r, pos)?)),
            _ => return None,
        };

        Some(constructor)
    }
}

impl PositioningSubtable {
    pub fn lookup_type(&self) -> u16 {
        match self {
            Self::Single(_) => 1,
            Self::Pair(_) => 2,
            Self::Cursive(_) => 3,
            Self::MarkToBase(_) => 4,
            Self::MarkToLigature(_) => 5,
            Self::MarkToMark(_) => 6,
            Self::Context(_) => 7,
            Self::ChainContext(_) => 8,
        }
    }
}

/// An attachment point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// 1, 2 or 3
    pub format: u16,
    pub x: i16,
    pub y: i16,
    /// Format 2: the outline point to snap to when hinting
    pub anchor_point: Option<u16>,
    /// Format 3
    pub x_device: Option<DeviceTable>,
    pub y_device: Option<DeviceTable>,
}

impl Anchor {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;
        let x = reader.read_i16()?;
        let y = reader.read_i16()?;

        let mut anchor = Self {
            format,
            x,
            y,
            anchor_point: None,
            x_device: None,
            y_device: None,
        };
        match format {
            1 => {}
            2 => anchor.anchor_point = Some(reader.read_u16()?),
            3 => {
                let x_offset = usize::from(reader.read_u16()?);
                let y_offset = usize::from(reader.read_u16()?);
                anchor.x_device = read_reported(reader, base, x_offset, ctx, |r, pos, _| DeviceTable::read(r, pos));
                anchor.y_device = read_reported(reader, base, y_offset, ctx, |r, pos, _| DeviceTable::read(r, pos));
            }
            _ => {
                return Err(TableEncodingError::UnsupportedSubtableFormat {
                    kind: "anchor",
                    format,
                }
                .into());
            }
        }

        Ok(anchor)
    }
}

/// Reads the anchor behind a nullable offset from `base`
fn read_anchor_offset(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offset: u16,
    ctx: &mut ParseContext<'_>,
) -> Result<Option<Anchor>, VeroTypeError> {
    if offset == 0 {
        return Ok(None);
    }
    let pos = reader.resolve(base, usize::from(offset))?;

    Ok(Some(Anchor::read(reader, pos, ctx)?))
}

/// A null offset puts every glyph in class 0
fn read_class_def_offset(reader: &mut VeroBufReader<'_>, base: usize) -> Result<ClassDefinitionTable, VeroTypeError> {
    let offset = reader.read_u16()?;
    let end = reader.position();
    let Some(pos) = resolve_nullable(reader, base, offset)? else {
        return Ok(ClassDefinitionTable::empty());
    };
    let class_def = ClassDefinitionTable::read(reader, pos)?;
    reader.seek_to(end)?;

    Ok(class_def)
}

/// What a pair adjustment with two empty value formats reads as
static NO_ADJUSTMENT: ValueRecord = ValueRecord {
    format: ValueFormat::empty(),
    x_placement: 0,
    y_placement: 0,
    x_advance: 0,
    y_advance: 0,
    x_placement_device_offset: 0,
    y_placement_device_offset: 0,
    x_advance_device_offset: 0,
    y_advance_device_offset: 0,
    devices: [None, None, None, None],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinglePos {
    /// One adjustment for every covered glyph
    Format1 {
        coverage: CoverageTable,
        value: ValueRecord,
    },
    /// One adjustment per coverage index
    Format2 {
        coverage: CoverageTable,
        values: Vec<ValueRecord>,
    },
}

impl SinglePos {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;
        let coverage = read_coverage_offset(reader, base)?;
        let value_format = ValueFormat::from_bits_retain(reader.read_u16()?);

        match format {
            1 => Ok(Self::Format1 {
                coverage,
                value: ValueRecord::read_resolved(reader, value_format, base, ctx)?,
            }),
            2 => {
                let count = reader.read_u16()?;
                let values = (0..count)
                    .map(|_| ValueRecord::read_resolved(reader, value_format, base, ctx))
                    .collect::<Result<_, _>>()?;
                Ok(Self::Format2 { coverage, values })
            }
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "single positioning",
                format,
            }
            .into()),
        }
    }

    pub fn adjustment(&self, glyph: GlyphId) -> Option<&ValueRecord> {
        match self {
            Self::Format1 { coverage, value } => coverage.contains(glyph).then_some(value),
            Self::Format2 { coverage, values } => values.get(usize::from(coverage.coverage_index(glyph)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairValueRecord {
    pub second_glyph: GlyphId,
    pub value1: ValueRecord,
    pub value2: ValueRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairPos {
    /// Explicit pairs, one set per first-glyph coverage index
    Format1 {
        coverage: CoverageTable,
        pair_sets: Vec<Vec<PairValueRecord>>,
    },
    /// Adjustments indexed by the classes of both glyphs
    Format2 {
        coverage: CoverageTable,
        class_def1: ClassDefinitionTable,
        class_def2: ClassDefinitionTable,
        class1_count: u16,
        class2_count: u16,
        /// `class2_count` records per first class. Left empty when both
        /// value formats are empty, as every record would be zero-sized.
        class_records: Vec<Vec<(ValueRecord, ValueRecord)>>,
    },
}

impl PairPos {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;
        let coverage = read_coverage_offset(reader, base)?;
        let format1 = ValueFormat::from_bits_retain(reader.read_u16()?);
        let format2 = ValueFormat::from_bits_retain(reader.read_u16()?);

        match format {
            1 => {
                let set_offsets = read_counted::<u16>(reader)?;
                let mut pair_sets = Vec::with_capacity(set_offsets.len());
                for offset in set_offsets {
                    // device offsets in a pair set are relative to the set
                    let set_base = reader.resolve(base, usize::from(offset))?;
                    reader.seek_to(set_base)?;
                    let count = reader.read_u16()?;
                    let pairs = (0..count)
                        .map(|_| -> Result<_, VeroTypeError> {
                            Ok(PairValueRecord {
                                second_glyph: reader.read_u16()?,
                                value1: ValueRecord::read_resolved(reader, format1, set_base, ctx)?,
                                value2: ValueRecord::read_resolved(reader, format2, set_base, ctx)?,
                            })
                        })
                        .collect::<Result<_, _>>()?;
                    pair_sets.push(pairs);
                }
                Ok(Self::Format1 { coverage, pair_sets })
            }
            2 => {
                let class_def1 = read_class_def_offset(reader, base)?;
                let class_def2 = read_class_def_offset(reader, base)?;
                let class1_count = reader.read_u16()?;
                let class2_count = reader.read_u16()?;
                let record_size = format1.record_size() + format2.record_size();
                let rows = if record_size == 0 { 0 } else { class1_count };
                reader.check_remaining(usize::from(rows) * usize::from(class2_count), record_size)?;

                let mut class_records = Vec::with_capacity(usize::from(rows));
                for _ in 0..rows {
                    let row = (0..class2_count)
                        .map(|_| -> Result<_, VeroTypeError> {
                            Ok((
                                ValueRecord::read_resolved(reader, format1, base, ctx)?,
                                ValueRecord::read_resolved(reader, format2, base, ctx)?,
                            ))
                        })
                        .collect::<Result<_, _>>()?;
                    class_records.push(row);
                }
                Ok(Self::Format2 {
                    coverage,
                    class_def1,
                    class_def2,
                    class1_count,
                    class2_count,
                    class_records,
                })
            }
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "pair positioning",
                format,
            }
            .into()),
        }
    }

    /// Adjustments for `first` followed by `second`, or `None` when the
    /// subtable does not cover the pair
    pub fn adjustment(&self, first: GlyphId, second: GlyphId) -> Option<(&ValueRecord, &ValueRecord)> {
        match self {
            Self::Format1 { coverage, pair_sets } => {
                let set = pair_sets.get(usize::from(coverage.coverage_index(first)?))?;
                set.binary_search_by_key(&second, |pair| pair.second_glyph)
                    .ok()
                    .map(|i| (&set[i].value1, &set[i].value2))
            }
            Self::Format2 {
                coverage,
                class_def1,
                class_def2,
                class1_count,
                class2_count,
                class_records,
            } => {
                coverage.coverage_index(first)?;
                let class1 = class_def1.class_of(first);
                let class2 = class_def2.class_of(second);
                if class1 >= *class1_count || class2 >= *class2_count {
                    return None;
                }
                match class_records.get(usize::from(class1)) {
                    Some(row) => row.get(usize::from(class2)).map(|(value1, value2)| (value1, value2)),
                    None => Some((&NO_ADJUSTMENT, &NO_ADJUSTMENT)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursivePos {
    pub coverage: CoverageTable,
    /// Entry and exit anchors per coverage index
    pub entry_exits: Vec<(Option<Anchor>, Option<Anchor>)>,
}

impl CursivePos {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "cursive positioning")?;
        let coverage = read_coverage_offset(reader, base)?;
        let count = usize::from(reader.read_u16()?);
        let offsets = reader.read_array::<u16>(count * 2)?;

        let entry_exits = offsets
            .chunks_exact(2)
            .map(|pair| -> Result<_, VeroTypeError> {
                Ok((
                    read_anchor_offset(reader, base, pair[0], ctx)?,
                    read_anchor_offset(reader, base, pair[1], ctx)?,
                ))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { coverage, entry_exits })
    }

    pub fn entry_exit(&self, glyph: GlyphId) -> Option<&(Option<Anchor>, Option<Anchor>)> {
        self.entry_exits.get(usize::from(self.coverage.coverage_index(glyph)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRecord {
    pub class: u16,
    pub anchor: Anchor,
}

fn read_mark_array(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    ctx: &mut ParseContext<'_>,
) -> Result<Vec<MarkRecord>, VeroTypeError> {
    reader.seek_to(base)?;
    let count = usize::from(reader.read_u16()?);
    let records = reader.read_array::<u16>(count * 2)?;

    records
        .chunks_exact(2)
        .map(|record| -> Result<_, VeroTypeError> {
            let pos = reader.resolve(base, usize::from(record[1]))?;
            Ok(MarkRecord {
                class: record[0],
                anchor: Anchor::read(reader, pos, ctx)?,
            })
        })
        .collect()
}

/// A BaseArray, Mark2Array or LigatureAttach: rows of `class_count`
/// nullable anchor offsets from `base`
fn read_anchor_matrix(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    class_count: u16,
    ctx: &mut ParseContext<'_>,
) -> Result<Vec<Vec<Option<Anchor>>>, VeroTypeError> {
    reader.seek_to(base)?;
    let rows = usize::from(reader.read_u16()?);
    let columns = usize::from(class_count);
    let offsets = reader.read_array::<u16>(rows.saturating_mul(columns))?;

    if columns == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    offsets
        .chunks_exact(columns)
        .map(|row| {
            row.iter()
                .map(|&offset| read_anchor_offset(reader, base, offset, ctx))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Mark-to-base (type 4) and mark-to-mark (type 6) attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkBasePos {
    pub mark_coverage: CoverageTable,
    /// Coverage of the base glyphs, or of the preceding marks for type 6
    pub base_coverage: CoverageTable,
    pub mark_class_count: u16,
    pub marks: Vec<MarkRecord>,
    /// One anchor per mark class, per base coverage index
    pub bases: Vec<Vec<Option<Anchor>>>,
}

impl MarkBasePos {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "mark attachment positioning")?;
        let mark_coverage = read_coverage_offset(reader, base)?;
        let base_coverage = read_coverage_offset(reader, base)?;
        let mark_class_count = reader.read_u16()?;
        let mark_array_offset = usize::from(reader.read_u16()?);
        let base_array_offset = usize::from(reader.read_u16()?);

        let mark_array = reader.resolve(base, mark_array_offset)?;
        let marks = read_mark_array(reader, mark_array, ctx)?;
        let base_array = reader.resolve(base, base_array_offset)?;
        let bases = read_anchor_matrix(reader, base_array, mark_class_count, ctx)?;

        Ok(Self {
            mark_coverage,
            base_coverage,
            mark_class_count,
            marks,
            bases,
        })
    }

    /// The mark's anchor and the matching anchor on the base
    pub fn attachment(&self, mark: GlyphId, base: GlyphId) -> Option<(&Anchor, &Anchor)> {
        let mark = self.marks.get(usize::from(self.mark_coverage.coverage_index(mark)?))?;
        let row = self.bases.get(usize::from(self.base_coverage.coverage_index(base)?))?;
        let base_anchor = row.get(usize::from(mark.class))?.as_ref()?;

        Some((&mark.anchor, base_anchor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLigaturePos {
    pub mark_coverage: CoverageTable,
    pub ligature_coverage: CoverageTable,
    pub mark_class_count: u16,
    pub marks: Vec<MarkRecord>,
    /// Per ligature coverage index, per component, one anchor per mark class
    pub ligatures: Vec<Vec<Vec<Option<Anchor>>>>,
}

impl MarkLigaturePos {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "mark-to-ligature positioning")?;
        let mark_coverage = read_coverage_offset(reader, base)?;
        let ligature_coverage = read_coverage_offset(reader, base)?;
        let mark_class_count = reader.read_u16()?;
        let mark_array_offset = usize::from(reader.read_u16()?);
        let ligature_array_offset = usize::from(reader.read_u16()?);

        let mark_array = reader.resolve(base, mark_array_offset)?;
        let marks = read_mark_array(reader, mark_array, ctx)?;

        let ligature_array = reader.resolve(base, ligature_array_offset)?;
        reader.seek_to(ligature_array)?;
        let attach_offsets = read_counted::<u16>(reader)?;
        let ligatures = attach_offsets
            .into_iter()
            .map(|offset| -> Result<_, VeroTypeError> {
                let attach = reader.resolve(ligature_array, usize::from(offset))?;
                read_anchor_matrix(reader, attach, mark_class_count, ctx)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            mark_coverage,
            ligature_coverage,
            mark_class_count,
            marks,
            ligatures,
        })
    }

    /// The mark's anchor and the matching anchor on one ligature component
    pub fn attachment(&self, mark: GlyphId, ligature: GlyphId, component: usize) -> Option<(&Anchor, &Anchor)> {
        let mark = self.marks.get(usize::from(self.mark_coverage.coverage_index(mark)?))?;
        let components = self
            .ligatures
            .get(usize::from(self.ligature_coverage.coverage_index(ligature)?))?;
        let anchor = components.get(component)?.get(usize::from(mark.class))?.as_ref()?;

        Some((&mark.anchor, anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;
    use pretty_assertions::assert_eq;

    fn be16(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|&v| (v as u16).to_be_bytes()).collect()
    }

    fn read_with<T>(
        data: &[u8],
        read: fn(&mut VeroBufReader<'_>, usize, &mut ParseContext<'_>) -> Result<T, VeroTypeError>,
    ) -> (T, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let value = {
            let mut ctx = ParseContext::standalone(Tag::GPOS, data, &mut diagnostics);
            let mut reader = ctx.reader();
            read(&mut reader, 0, &mut ctx).unwrap()
        };
        (value, diagnostics)
    }

    #[test]
    fn pair_sets_are_searched_by_second_glyph() {
        let mut data = be16(&[1, 12, 0x0004, 0, 1, 18]);
        data.extend(be16(&[1, 1, 10]));
        data.extend(be16(&[2, 20, -50, 21, -30]));

        let (pair, diagnostics) = read_with(&data, PairPos::read);

        assert!(diagnostics.is_empty());
        let (first, second) = pair.adjustment(10, 21).unwrap();
        assert_eq!(first.x_advance, -30);
        assert!(second.is_empty());
        assert_eq!(pair.adjustment(10, 20).unwrap().0.x_advance, -50);
        assert!(pair.adjustment(10, 22).is_none());
        assert!(pair.adjustment(11, 20).is_none());
    }

    #[test]
    fn class_pairs_use_both_class_definitions() {
        let mut data = be16(&[2, 24, 0x0004, 0, 32, 42, 2, 2]);
        data.extend(be16(&[0, 0, 0, -40]));
        data.extend(be16(&[1, 2, 10, 11]));
        // class def 1: glyph 11 is class 1
        data.extend(be16(&[2, 1, 11, 11, 1]));
        // class def 2: glyph 21 is class 1
        data.extend(be16(&[1, 20, 2, 0, 1]));

        let (pair, _) = read_with(&data, PairPos::read);

        assert_eq!(pair.adjustment(11, 21).unwrap().0.x_advance, -40);
        assert_eq!(pair.adjustment(11, 20).unwrap().0.x_advance, 0);
        assert_eq!(pair.adjustment(10, 21).unwrap().0.x_advance, 0);
        assert!(pair.adjustment(12, 21).is_none());
    }

    #[test]
    fn null_class_def_puts_every_glyph_in_class_zero() {
        let mut data = be16(&[2, 20, 0x0004, 0, 26, 0, 2, 1]);
        data.extend(be16(&[0, -25]));
        data.extend(be16(&[1, 1, 7]));
        data.extend(be16(&[2, 1, 7, 7, 1]));

        let (pair, diagnostics) = read_with(&data, PairPos::read);

        assert!(diagnostics.is_empty());
        assert_eq!(pair.adjustment(7, 40).unwrap().0.x_advance, -25);
        assert_eq!(pair.adjustment(7, u16::MAX).unwrap().0.x_advance, -25);
    }

    #[test]
    fn empty_value_formats_skip_the_class_matrix() {
        let mut data = be16(&[2, 16, 0, 0, 22, 0, 3000, 3000]);
        data.extend(be16(&[1, 1, 5]));
        data.extend(be16(&[2, 1, 5, 5, 2]));

        let (pair, diagnostics) = read_with(&data, PairPos::read);

        assert!(diagnostics.is_empty());
        let PairPos::Format2 {
            class_records,
            class1_count,
            class2_count,
            ..
        } = &pair
        else {
            panic!("expected class pairs");
        };
        assert!(class_records.is_empty());
        assert_eq!((*class1_count, *class2_count), (3000, 3000));

        let (first, second) = pair.adjustment(5, 999).unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert!(pair.adjustment(6, 999).is_none());
    }

    #[test]
    fn mark_attaches_to_base_anchor() {
        let mut data = be16(&[1, 12, 18, 1, 24, 36]);
        data.extend(be16(&[1, 1, 30]));
        data.extend(be16(&[1, 1, 5]));
        // mark array at 24, anchor format 1 at 30
        data.extend(be16(&[1, 0, 6]));
        data.extend(be16(&[1, 100, 200]));
        // base array at 36, anchor format 2 at 40
        data.extend(be16(&[1, 4]));
        data.extend(be16(&[2, 300, 400, 7]));

        let (mark_base, _) = read_with(&data, MarkBasePos::read);
        let (mark, base) = mark_base.attachment(30, 5).unwrap();

        assert_eq!((mark.format, mark.x, mark.y), (1, 100, 200));
        assert_eq!((base.x, base.y, base.anchor_point), (300, 400, Some(7)));
        assert!(mark_base.attachment(30, 6).is_none());
        assert!(mark_base.attachment(31, 5).is_none());
    }

    #[test]
    fn anchor_devices_resolve_from_the_anchor() {
        let mut data = be16(&[3, -5, 10, 10, 0]);
        data.extend(be16(&[12, 12, 3, 0x0300]));

        let (anchor, diagnostics) = read_with(&data, Anchor::read);

        assert!(diagnostics.is_empty());
        assert_eq!((anchor.x, anchor.y), (-5, 10));
        assert_eq!(anchor.x_device.unwrap().delta(12), 3);
        assert!(anchor.y_device.is_none());
    }

    #[test]
    fn single_pos_formats() {
        let mut data = be16(&[2, 12, 0x0001, 2, 10, -10]);
        data.extend(be16(&[1, 2, 3, 4]));

        let (single, _) = read_with(&data, SinglePos::read);

        assert_eq!(single.adjustment(3).unwrap().x_placement, 10);
        assert_eq!(single.adjustment(4).unwrap().x_placement, -10);
        assert!(single.adjustment(5).is_none());
    }

    #[test]
    fn undefined_mark_filtering_set_is_reported() {
        let gdef_data = be16(&[1, 0, 0, 0, 0, 0]);
        let mut scratch = Diagnostics::default();
        let gdef: FontTable = Gdef::from_context(&mut ParseContext::standalone(Tag::GDEF, &gdef_data, &mut scratch))
            .unwrap()
            .into();

        let mut data = be16(&[1, 0, 10, 12, 14]);
        data.extend(be16(&[0]));
        data.extend(be16(&[0]));
        data.extend(be16(&[1, 4]));
        // lookup at 18: type 1, USE_MARK_FILTERING_SET, set 0
        data.extend(be16(&[1, 0x0010, 1, 10, 0]));
        data.extend(be16(&[1, 8, 0x0004, -10]));
        data.extend(be16(&[1, 1, 3]));

        let mut diagnostics = Diagnostics::default();
        let gpos = {
            let mut ctx = ParseContext::standalone(Tag::GPOS, &data, &mut diagnostics).with_dependency(&gdef);
            Gpos::from_context(&mut ctx).unwrap()
        };

        let lookup = gpos.layout.lookup_list.get(0).unwrap();
        assert_eq!(lookup.mark_filtering_set(), Some(0));
        let PositioningSubtable::Single(single) = &lookup.subtables()[0] else {
            panic!("expected a single positioning subtable");
        };
        assert_eq!(single.adjustment(3).unwrap().x_advance, -10);
        assert_eq!(diagnostics.len(), 1);
    }
}
