//! Contextual and chained contextual rules, shared by GSUB lookup types 5/6
//! and GPOS lookup types 7/8

use super::{ClassDefinitionTable, CoverageTable, read_coverages, resolve_nullable};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    tables::TableEncodingError,
    types::GlyphId,
};

/// Applies lookup `lookup_list_index` at `sequence_index` of a matched input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLookupRecord {
    pub sequence_index: u16,
    pub lookup_list_index: u16,
}

impl ReadBe for SequenceLookupRecord {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            sequence_index: reader.read_u16()?,
            lookup_list_index: reader.read_u16()?,
        })
    }
}

/// A rule matching the glyphs (format 1) or classes (format 2) that follow
/// the covered first glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRule {
    pub input_sequence: Vec<u16>,
    pub lookup_records: Vec<SequenceLookupRecord>,
}

impl SequenceRule {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let glyph_count = usize::from(reader.read_u16()?);
        let lookup_count = usize::from(reader.read_u16()?);

        Ok(Self {
            input_sequence: reader.read_array(glyph_count.saturating_sub(1))?,
            lookup_records: reader.read_array(lookup_count)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedSequenceRule {
    pub backtrack_sequence: Vec<u16>,
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub lookup_records: Vec<SequenceLookupRecord>,
}

impl ChainedSequenceRule {
    fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let backtrack_sequence = super::read_counted(reader)?;
        let input_count = usize::from(reader.read_u16()?);
        let input_sequence = reader.read_array(input_count.saturating_sub(1))?;
        let lookahead_sequence = super::read_counted(reader)?;

        Ok(Self {
            backtrack_sequence,
            input_sequence,
            lookahead_sequence,
            lookup_records: super::read_counted(reader)?,
        })
    }
}

type RuleReader<R> = fn(&mut VeroBufReader<'_>, usize) -> Result<R, VeroTypeError>;

/// Reads rule sets (null offsets allowed) and the rules inside them
fn read_rule_sets<R>(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offsets: &[u16],
    read_rule: RuleReader<R>,
) -> Result<Vec<Option<Vec<R>>>, VeroTypeError> {
    let mut sets = Vec::with_capacity(offsets.len());
    for &offset in offsets {
        let Some(set_base) = resolve_nullable(reader, base, offset)? else {
            sets.push(None);
            continue;
        };
        reader.seek_to(set_base)?;
        let count = usize::from(reader.read_u16()?);
        let rule_offsets = reader.read_array::<u16>(count)?;
        let rules = rule_offsets
            .into_iter()
            .map(|rule| -> Result<R, VeroTypeError> {
                let pos = reader.resolve(set_base, usize::from(rule))?;
                read_rule(reader, pos)
            })
            .collect::<Result<_, VeroTypeError>>()?;
        sets.push(Some(rules));
    }

    Ok(sets)
}

fn read_class_def(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offset: u16,
) -> Result<ClassDefinitionTable, VeroTypeError> {
    match resolve_nullable(reader, base, offset)? {
        Some(pos) => ClassDefinitionTable::read(reader, pos),
        None => Ok(ClassDefinitionTable::empty()),
    }
}

fn read_coverage_at(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offset: u16,
) -> Result<CoverageTable, VeroTypeError> {
    let pos = reader.resolve(base, usize::from(offset))?;
    CoverageTable::read(reader, pos)
}

fn unsupported(kind: &'static str, format: u16) -> VeroTypeError {
    TableEncodingError::UnsupportedSubtableFormat { kind, format }.into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceContext {
    /// Glyph-sequence rules, one rule set per covered glyph
    Format1 {
        coverage: CoverageTable,
        rule_sets: Vec<Option<Vec<SequenceRule>>>,
    },
    /// Class-sequence rules, one rule set per class
    Format2 {
        coverage: CoverageTable,
        class_def: ClassDefinitionTable,
        rule_sets: Vec<Option<Vec<SequenceRule>>>,
    },
    /// One coverage per input position
    Format3 {
        coverages: Vec<CoverageTable>,
        lookup_records: Vec<SequenceLookupRecord>,
    },
}

impl SequenceContext {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;

        match format {
            1 => {
                let coverage_offset = reader.read_u16()?;
                let offsets = super::read_counted::<u16>(reader)?;
                Ok(Self::Format1 {
                    rule_sets: read_rule_sets(reader, base, &offsets, SequenceRule::read)?,
                    coverage: read_coverage_at(reader, base, coverage_offset)?,
                })
            }
            2 => {
                let coverage_offset = reader.read_u16()?;
                let class_def_offset = reader.read_u16()?;
                let offsets = super::read_counted::<u16>(reader)?;
                Ok(Self::Format2 {
                    rule_sets: read_rule_sets(reader, base, &offsets, SequenceRule::read)?,
                    coverage: read_coverage_at(reader, base, coverage_offset)?,
                    class_def: read_class_def(reader, base, class_def_offset)?,
                })
            }
            3 => {
                let glyph_count = usize::from(reader.read_u16()?);
                let lookup_count = usize::from(reader.read_u16()?);
                let coverage_offsets = reader.read_array::<u16>(glyph_count)?;
                let lookup_records = reader.read_array(lookup_count)?;
                Ok(Self::Format3 {
                    coverages: read_coverages(reader, base, &coverage_offsets)?,
                    lookup_records,
                })
            }
            _ => Err(unsupported("sequence context", format)),
        }
    }

    /// The rules to try when `glyph` starts the input sequence.
    /// Format 3 has no rule sets and always returns `None`.
    pub fn rules_for(&self, glyph: GlyphId) -> Option<&[SequenceRule]> {
        match self {
            Self::Format1 {
                coverage,
                rule_sets,
            } => {
                let index = coverage.coverage_index(glyph)?;
                rule_sets.get(usize::from(index))?.as_deref()
            }
            Self::Format2 {
                coverage,
                class_def,
                rule_sets,
            } => {
                coverage.coverage_index(glyph)?;
                let class = class_def.class_of(glyph);
                rule_sets.get(usize::from(class))?.as_deref()
            }
            Self::Format3 { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainedSequenceContext {
    Format1 {
        coverage: CoverageTable,
        rule_sets: Vec<Option<Vec<ChainedSequenceRule>>>,
    },
    Format2 {
        coverage: CoverageTable,
        backtrack_class_def: ClassDefinitionTable,
        input_class_def: ClassDefinitionTable,
        lookahead_class_def: ClassDefinitionTable,
        rule_sets: Vec<Option<Vec<ChainedSequenceRule>>>,
    },
    Format3 {
        backtrack_coverages: Vec<CoverageTable>,
        input_coverages: Vec<CoverageTable>,
        lookahead_coverages: Vec<CoverageTable>,
        lookup_records: Vec<SequenceLookupRecord>,
    },
}

impl ChainedSequenceContext {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u16()?;

        match format {
            1 => {
                let coverage_offset = reader.read_u16()?;
                let offsets = super::read_counted::<u16>(reader)?;
                Ok(Self::Format1 {
                    rule_sets: read_rule_sets(reader, base, &offsets, ChainedSequenceRule::read)?,
                    coverage: read_coverage_at(reader, base, coverage_offset)?,
                })
            }
            2 => {
                let coverage_offset = reader.read_u16()?;
                let backtrack_offset = reader.read_u16()?;
                let input_offset = reader.read_u16()?;
                let lookahead_offset = reader.read_u16()?;
                let offsets = super::read_counted::<u16>(reader)?;
                Ok(Self::Format2 {
                    rule_sets: read_rule_sets(reader, base, &offsets, ChainedSequenceRule::read)?,
                    coverage: read_coverage_at(reader, base, coverage_offset)?,
                    backtrack_class_def: read_class_def(reader, base, backtrack_offset)?,
                    input_class_def: read_class_def(reader, base, input_offset)?,
                    lookahead_class_def: read_class_def(reader, base, lookahead_offset)?,
                })
            }
            3 => {
                let backtrack = super::read_counted::<u16>(reader)?;
                let input = super::read_counted::<u16>(reader)?;
                let lookahead = super::read_counted::<u16>(reader)?;
                let lookup_records = super::read_counted(reader)?;
                Ok(Self::Format3 {
                    backtrack_coverages: read_coverages(reader, base, &backtrack)?,
                    input_coverages: read_coverages(reader, base, &input)?,
                    lookahead_coverages: read_coverages(reader, base, &lookahead)?,
                    lookup_records,
                })
            }
            _ => Err(unsupported("chained sequence context", format)),
        }
    }

    /// The rules to try when `glyph` starts the input sequence.
    /// Format 3 has no rule sets and always returns `None`.
    pub fn rules_for(&self, glyph: GlyphId) -> Option<&[ChainedSequenceRule]> {
        match self {
            Self::Format1 {
                coverage,
                rule_sets,
            } => {
                let index = coverage.coverage_index(glyph)?;
                rule_sets.get(usize::from(index))?.as_deref()
            }
            Self::Format2 {
                coverage,
                input_class_def,
                rule_sets,
                ..
            } => {
                coverage.coverage_index(glyph)?;
                let class = input_class_def.class_of(glyph);
                rule_sets.get(usize::from(class))?.as_deref()
            }
            Self::Format3 { .. } => None,
        }
    }
}
