use super::{FontTable, TableEncodingError, TableMetadata, gdef::Gdef};
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    layout::{
        ChainedSequenceContext, CoverageTable, LayoutTable, LookupFlag, LookupKind,
        SequenceContext, SubtableConstructor, expect_format, read_counted, read_coverage_offset,
        read_coverages,
    },
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::GSUB,
    requires: &[],
    optional: &[Tag::GDEF],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Gsub::from_context(ctx)?.into())
}

/// The [GSUB table](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub)
#[derive(Debug, Clone)]
pub struct Gsub {
    pub metadata: TableMetadata,
    pub layout: LayoutTable<SubstitutionSubtable>,
}

impl Gsub {
    /// Reads the header and every list. When GDEF is available, lookups
    /// naming a mark filtering set it does not define are reported.
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

/// Reports lookups that filter on a mark glyph set GDEF does not define
pub(crate) fn check_mark_filtering_sets(
    ctx: &mut ParseContext<'_>,
    gdef: &Gdef,
    lookups: impl Iterator<Item = (LookupFlag, Option<u16>)>,
) {
    let defined = gdef
        .mark_glyph_sets
        .as_ref()
        .map_or(0, |sets| sets.coverages.len());

    let missing = lookups
        .filter_map(|(flag, set)| flag.contains(LookupFlag::USE_MARK_FILTERING_SET).then_some(set?))
        .any(|set| usize::from(set) >= defined);
    if missing {
        ctx.report(TableEncodingError::InvalidData(
            "lookup uses a mark filtering set missing from GDEF",
        ));
    }
}

/// A GSUB subtable. Extension subtables (type 7) are resolved into the type
/// they wrap and never appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum SubstitutionSubtable {
    /// Type 1
    Single(SingleSubst),
    /// Type 2
    Multiple(MultipleSubst),
    /// Type 3
    Alternate(AlternateSubst),
    /// Type 4
    Ligature(LigatureSubst),
    /// Type 5
    Context(SequenceContext),
    /// Type 6
    ChainContext(ChainedSequenceContext),
    /// Type 8
    ReverseChainSingle(ReverseChainSingleSubst),
}

impl LookupKind for SubstitutionSubtable {
    const EXTENSION_TYPE: u16 = 7;
    const NAME: &'static str = "GSUB lookup type";

    fn constructor(lookup_type: u16) -> Option<SubtableConstructor<Self>> {
        let constructor: SubtableConstructor<Self> = match lookup_type {
            1 => |r, pos, _| Ok(Self::Single(SingleSubst::read(r, pos)?)),
            2 => |r, pos, _| Ok(Self::Multiple(MultipleSubst::read(r, pos)?)),
            3 => |r, pos, _| Ok(Self::Alternate(AlternateSubst::read(r, pos)?)),
            4 => |r, pos, _| Ok(Self::Ligature(LigatureSubst::read(r, pos)?)),
            5 => |r, pos, _| Ok(Self::Context(SequenceContext::read(r, pos)?)),
            6 => |r, pos, _| Ok(Self::ChainContext(ChainedSequenceContext::read(r, pos)?)),
            8 => |r, pos, _| Ok(Self::ReverseChainSingle(ReverseChainSingleSubst::read(r, pos)?)),
            _ => return None,
        };

        Some(constructor)
    }
}

impl SubstitutionSubtable {
    /// The GSUB lookup type this subtable belongs to
    pub fn lookup_type(&self) -> u16 {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(_) => 2,
            Self::Alternate(_) => 3,
            Self::Ligature(_) => 4,
            Self::Context(_) => 5,
            Self::ChainContext(_) => 6,
            Self::ReverseChainSingle(_) => 8,
        }
    }
}

/// Reads counted u16 offsets and then the counted glyph array behind each,
/// offsets being relative to `base`
fn read_sequences(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Vec<Vec<GlyphId>>, VeroTypeError> {
    let offsets = read_counted::<u16>(reader)?;

    offsets
        .into_iter()
        .map(|offset| -> Result<_, VeroTypeError> {
            reader.seek_relative(base, usize::from(offset))?;
            read_counted(reader)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleSubst {
    /// Adds a delta to every covered glyph
    Format1 {
        coverage: CoverageTable,
        delta_glyph_id: i16,
    },
    /// One substitute per coverage index
    Format2 {
        coverage: CoverageTable,
        substitutes: Vec<GlyphId>,
    },
}

impl SingleSubst {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;
        let coverage = read_coverage_offset(reader, base)?;

        match format {
            1 => Ok(Self::Format1 {
                coverage,
                delta_glyph_id: reader.read_i16()?,
            }),
            2 => Ok(Self::Format2 {
                coverage,
                substitutes: read_counted(reader)?,
            }),
            _ => Err(TableEncodingError::UnsupportedSubtableFormat {
                kind: "single substitution",
                format,
            }
            .into()),
        }
    }

    pub fn substitute(&self, glyph: GlyphId) -> Option<GlyphId> {
        match self {
            Self::Format1 {
                coverage,
                delta_glyph_id,
            } => coverage
                .contains(glyph)
                .then(|| glyph.wrapping_add_signed(*delta_glyph_id)),
            Self::Format2 {
                coverage,
                substitutes,
            } => substitutes
                .get(usize::from(coverage.coverage_index(glyph)?))
                .copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipleSubst {
    pub coverage: CoverageTable,
    /// The replacement sequence per coverage index
    pub sequences: Vec<Vec<GlyphId>>,
}

impl MultipleSubst {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "multiple substitution")?;

        Ok(Self {
            coverage: read_coverage_offset(reader, base)?,
            sequences: read_sequences(reader, base)?,
        })
    }

    pub fn sequence(&self, glyph: GlyphId) -> Option<&[GlyphId]> {
        let index = self.coverage.coverage_index(glyph)?;

        self.sequences.get(usize::from(index)).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateSubst {
    pub coverage: CoverageTable,
    /// The alternates per coverage index, in designer order
    pub alternate_sets: Vec<Vec<GlyphId>>,
}

impl AlternateSubst {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "alternate substitution")?;

        Ok(Self {
            coverage: read_coverage_offset(reader, base)?,
            alternate_sets: read_sequences(reader, base)?,
        })
    }

    pub fn alternates(&self, glyph: GlyphId) -> Option<&[GlyphId]> {
        let index = self.coverage.coverage_index(glyph)?;

        self.alternate_sets.get(usize::from(index)).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligature {
    pub ligature_glyph: GlyphId,
    /// Components after the first, which is the covered glyph
    pub components: Vec<GlyphId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureSubst {
    pub coverage: CoverageTable,
    /// Ligatures per first-glyph coverage index, in preference order
    pub ligature_sets: Vec<Vec<Ligature>>,
}

impl LigatureSubst {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "ligature substitution")?;
        let coverage = read_coverage_offset(reader, base)?;
        let set_offsets = read_counted::<u16>(reader)?;

        let ligature_sets = set_offsets
            .into_iter()
            .map(|set_offset| -> Result<_, VeroTypeError> {
                let set_base = reader.resolve(base, usize::from(set_offset))?;
                reader.seek_to(set_base)?;
                let offsets = read_counted::<u16>(reader)?;

                offsets
                    .into_iter()
                    .map(|offset| -> Result<_, VeroTypeError> {
                        reader.seek_relative(set_base, usize::from(offset))?;
                        let ligature_glyph = reader.read_u16()?;
                        let count = usize::from(reader.read_u16()?);
                        Ok(Ligature {
                            ligature_glyph,
                            components: reader.read_array(count.saturating_sub(1))?,
                        })
                    })
                    .collect()
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            coverage,
            ligature_sets,
        })
    }

    /// The first ligature whose components follow `first` in `rest`.
    /// Returns the ligature glyph and how many glyphs of `rest` it consumes.
    pub fn ligate(&self, first: GlyphId, rest: &[GlyphId]) -> Option<(GlyphId, usize)> {
        let index = self.coverage.coverage_index(first)?;

        self.ligature_sets
            .get(usize::from(index))?
            .iter()
            .find(|ligature| rest.starts_with(&ligature.components))
            .map(|ligature| (ligature.ligature_glyph, ligature.components.len()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseChainSingleSubst {
    pub coverage: CoverageTable,
    pub backtrack_coverages: Vec<CoverageTable>,
    pub lookahead_coverages: Vec<CoverageTable>,
    /// One substitute per coverage index
    pub substitutes: Vec<GlyphId>,
}

impl ReverseChainSingleSubst {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        expect_format(reader, "reverse chaining substitution")?;
        let coverage = read_coverage_offset(reader, base)?;
        let backtrack_offsets = read_counted::<u16>(reader)?;
        let lookahead_offsets = read_counted::<u16>(reader)?;
        let substitutes = read_counted(reader)?;

        Ok(Self {
            coverage,
            backtrack_coverages: read_coverages(reader, base, &backtrack_offsets)?,
            lookahead_coverages: read_coverages(reader, base, &lookahead_offsets)?,
            substitutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;
    use pretty_assertions::assert_eq;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn gsub_with_extension() -> Vec<u8> {
        let mut data = be16(&[1, 0, 10, 30, 44]);
        // script list at 10: 'latn' -> default lang sys enabling feature 0
        data.extend(be16(&[1]));
        data.extend(b"latn");
        data.extend(be16(&[8, 4, 0, 0, 0xFFFF, 1, 0]));
        // feature list at 30: 'smcp' -> lookup 0
        data.extend(be16(&[1]));
        data.extend(b"smcp");
        data.extend(be16(&[8, 0, 1, 0]));
        // lookup list at 44: lookups at +6 and +26
        data.extend(be16(&[2, 6, 26]));
        // lookup 0 at 50: single subst format 1, delta 5, covering 20
        data.extend(be16(&[1, 0, 1, 8]));
        data.extend(be16(&[1, 6, 5]));
        data.extend(be16(&[1, 1, 20]));
        // lookup 1 at 70: extension wrapping a single subst format 2
        data.extend(be16(&[7, 0, 1, 8]));
        data.extend(be16(&[1, 1, 0, 8]));
        data.extend(be16(&[2, 8, 1, 30]));
        data.extend(be16(&[1, 1, 21]));
        data
    }

    #[test]
    fn extension_lookups_report_the_wrapped_type() {
        let data = gsub_with_extension();
        let mut diagnostics = Diagnostics::default();
        let gsub = Gsub::from_context(&mut ParseContext::standalone(Tag::GSUB, &data, &mut diagnostics))
            .unwrap();

        assert!(diagnostics.is_empty());
        let lookups = &gsub.layout.lookup_list;
        assert_eq!(lookups.len(), 2);

        let extension = lookups.get(1).unwrap();
        assert_eq!(extension.lookup_type(), 1);
        let SubstitutionSubtable::Single(single) = &extension.subtables()[0] else {
            panic!("expected a single substitution");
        };
        assert_eq!(single.substitute(21), Some(30));
        assert_eq!(single.substitute(20), None);

        let SubstitutionSubtable::Single(direct) = &lookups.get(0).unwrap().subtables()[0] else {
            panic!("expected a single substitution");
        };
        assert_eq!(direct.substitute(20), Some(25));
        assert!(lookups.iter().all(|(_, lookup)| lookup.lookup_type() != 7));
    }

    #[test]
    fn feature_lookups_follow_the_default_lang_sys() {
        let data = gsub_with_extension();
        let mut diagnostics = Diagnostics::default();
        let gsub = Gsub::from_context(&mut ParseContext::standalone(Tag::GSUB, &data, &mut diagnostics))
            .unwrap();

        let latn = Tag::new(*b"latn");
        assert_eq!(gsub.layout.feature_lookups(latn, Tag::new(*b"NLD "), Tag::new(*b"smcp")), vec![0]);
        assert!(gsub.layout.feature_lookups(latn, Tag::new(*b"NLD "), Tag::new(*b"liga")).is_empty());
        assert!(gsub.layout.feature_lookups(Tag::new(*b"grek"), latn, Tag::new(*b"smcp")).is_empty());
    }

    #[test]
    fn ligatures_prefer_the_first_match() {
        let mut data = be16(&[1, 8, 1, 14]);
        data.extend(be16(&[1, 1, 10]));
        data.extend(be16(&[2, 6, 14]));
        data.extend(be16(&[100, 3, 11, 12]));
        data.extend(be16(&[101, 2, 11]));

        let ligatures = LigatureSubst::read(&mut VeroBufReader::new(&data), 0).unwrap();

        assert_eq!(ligatures.ligate(10, &[11, 12, 13]), Some((100, 2)));
        assert_eq!(ligatures.ligate(10, &[11, 5]), Some((101, 1)));
        assert_eq!(ligatures.ligate(10, &[5]), None);
        assert_eq!(ligatures.ligate(9, &[11, 12]), None);
    }

    #[test]
    fn multiple_substitution_sequences() {
        let mut data = be16(&[1, 8, 1, 14]);
        data.extend(be16(&[1, 1, 5]));
        data.extend(be16(&[2, 7, 8]));

        let multiple = MultipleSubst::read(&mut VeroBufReader::new(&data), 0).unwrap();

        assert_eq!(multiple.sequence(5), Some(&[7, 8][..]));
        assert_eq!(multiple.sequence(6), None);
    }

    #[test]
    fn broken_lookup_keeps_its_slot() {
        let mut data = gsub_with_extension();
        // lookup 0 becomes an unknown type
        data[51] = 9;
        let mut diagnostics = Diagnostics::default();
        let gsub = Gsub::from_context(&mut ParseContext::standalone(Tag::GSUB, &data, &mut diagnostics))
            .unwrap();

        assert_eq!(gsub.layout.lookup_list.len(), 2);
        assert!(gsub.layout.lookup_list.get(0).is_none());
        assert_eq!(gsub.layout.lookup_list.get(1).unwrap().lookup_type(), 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
