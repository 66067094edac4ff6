use super::{FontTable, TableEncodingError, TableMetadata, gpos::{Gpos, PositioningSubtable}};
use crate::{
    VeroTypeError,
    buffer::{ReadBe, VeroBufReader, VeroBufReaderError},
    layout::{LookupTable, read_counted, read_reported},
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::JSTF,
    requires: &[],
    optional: &[Tag::GPOS],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Jstf::from_context(ctx)?.into())
}

#[derive(Debug, Clone, Copy)]
struct TagOffset {
    tag: Tag,
    offset: u16,
}

impl ReadBe for TagOffset {
    const SIZE: usize = 6;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        Ok(Self {
            tag: reader.read_tag()?,
            offset: reader.read_u16()?,
        })
    }
}

/// One justification step. Lookup lists hold indices into GSUB or GPOS;
/// the `*_max` lookups are GPOS lookups owned by JSTF itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JstfPriority {
    pub gsub_shrinkage_enable: Vec<u16>,
    pub gsub_shrinkage_disable: Vec<u16>,
    pub gpos_shrinkage_enable: Vec<u16>,
    pub gpos_shrinkage_disable: Vec<u16>,
    pub shrinkage_max: Vec<LookupTable<PositioningSubtable>>,
    pub gsub_extension_enable: Vec<u16>,
    pub gsub_extension_disable: Vec<u16>,
    pub gpos_extension_enable: Vec<u16>,
    pub gpos_extension_disable: Vec<u16>,
    pub extension_max: Vec<LookupTable<PositioningSubtable>>,
}

impl JstfPriority {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let offsets: Vec<usize> = reader.read_array::<u16>(10)?.into_iter().map(usize::from).collect();

        Ok(Self {
            gsub_shrinkage_enable: read_mod_list(reader, base, offsets[0], ctx),
            gsub_shrinkage_disable: read_mod_list(reader, base, offsets[1], ctx),
            gpos_shrinkage_enable: read_mod_list(reader, base, offsets[2], ctx),
            gpos_shrinkage_disable: read_mod_list(reader, base, offsets[3], ctx),
            shrinkage_max: read_reported(reader, base, offsets[4], ctx, read_jstf_max).unwrap_or_default(),
            gsub_extension_enable: read_mod_list(reader, base, offsets[5], ctx),
            gsub_extension_disable: read_mod_list(reader, base, offsets[6], ctx),
            gpos_extension_enable: read_mod_list(reader, base, offsets[7], ctx),
            gpos_extension_disable: read_mod_list(reader, base, offsets[8], ctx),
            extension_max: read_reported(reader, base, offsets[9], ctx, read_jstf_max).unwrap_or_default(),
        })
    }

    /// Every GPOS lookup index this priority enables or disables
    pub fn gpos_lookup_indices(&self) -> impl Iterator<Item = u16> + '_ {
        self.gpos_shrinkage_enable
            .iter()
            .chain(&self.gpos_shrinkage_disable)
            .chain(&self.gpos_extension_enable)
            .chain(&self.gpos_extension_disable)
            .copied()
    }
}

/// A JstfModList: lookup indices into GSUB or GPOS. A broken list is
/// reported and read as empty.
fn read_mod_list(reader: &mut VeroBufReader<'_>, base: usize, offset: usize, ctx: &mut ParseContext<'_>) -> Vec<u16> {
    read_reported(reader, base, offset, ctx, |r, pos, _| {
        r.seek_to(pos)?;
        read_counted::<u16>(r)
    })
    .unwrap_or_default()
}

/// A JstfMax: GPOS lookups at offsets from its own start
fn read_jstf_max(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    ctx: &mut ParseContext<'_>,
) -> Result<Vec<LookupTable<PositioningSubtable>>, VeroTypeError> {
    reader.seek_to(base)?;
    let offsets = read_counted::<u16>(reader)?;

    offsets
        .into_iter()
        .map(|offset| -> Result<_, VeroTypeError> {
            let pos = reader.resolve(base, usize::from(offset))?;
            LookupTable::read(reader, pos, ctx)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JstfLangSys {
    /// In the order they should be tried
    pub priorities: Vec<JstfPriority>,
}

impl JstfLangSys {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let offsets = read_counted::<u16>(reader)?;

        let priorities = offsets
            .into_iter()
            .map(|offset| -> Result<_, VeroTypeError> {
                let pos = reader.resolve(base, usize::from(offset))?;
                JstfPriority::read(reader, pos, ctx)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { priorities })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JstfScript {
    /// Glyphs that may be inserted to extend a line, such as kashidas
    pub extender_glyphs: Vec<GlyphId>,
    pub default_lang_sys: Option<JstfLangSys>,
    pub lang_sys: Vec<(Tag, JstfLangSys)>,
}

impl JstfScript {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let extender_offset = usize::from(reader.read_u16()?);
        let default_offset = usize::from(reader.read_u16()?);
        let records = read_counted::<TagOffset>(reader)?;

        let extender_glyphs = read_reported(reader, base, extender_offset, ctx, |r, pos, _| {
            r.seek_to(pos)?;
            read_counted::<GlyphId>(r)
        })
        .unwrap_or_default();
        let default_lang_sys = read_reported(reader, base, default_offset, ctx, JstfLangSys::read);

        let mut lang_sys = Vec::with_capacity(records.len());
        for record in records {
            if let Some(table) = read_reported(reader, base, usize::from(record.offset), ctx, JstfLangSys::read) {
                lang_sys.push((record.tag, table));
            }
        }

        Ok(Self {
            extender_glyphs,
            default_lang_sys,
            lang_sys,
        })
    }

    /// The language system for `language`, falling back to the default
    pub fn lang_sys(&self, language: Tag) -> Option<&JstfLangSys> {
        self.lang_sys
            .iter()
            .find(|(tag, _)| *tag == language)
            .map(|(_, lang_sys)| lang_sys)
            .or(self.default_lang_sys.as_ref())
    }

    fn all_lang_sys(&self) -> impl Iterator<Item = &JstfLangSys> + '_ {
        self.default_lang_sys
            .iter()
            .chain(self.lang_sys.iter().map(|(_, lang_sys)| lang_sys))
    }
}

/// The [JSTF table](https://learn.microsoft.com/en-us/typography/opentype/spec/jstf)
#[derive(Debug, Clone)]
pub struct Jstf {
    pub metadata: TableMetadata,
    pub major_version: u16,
    pub minor_version: u16,
    pub scripts: Vec<(Tag, JstfScript)>,
}

impl Jstf {
    /// Reads every script. A script that fails is reported and left out.
    ///
    /// With GPOS available, priorities referring to GPOS lookups it does
    /// not have are reported.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if major_version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::JSTF,
                version: u32::from(major_version) << 16 | u32::from(minor_version),
            }
            .into());
        }

        let records = read_counted::<TagOffset>(&mut reader)?;
        let mut scripts = Vec::with_capacity(records.len());
        for record in records {
            if let Some(script) = read_reported(&mut reader, 0, usize::from(record.offset), ctx, JstfScript::read) {
                scripts.push((record.tag, script));
            }
        }

        if let Some(gpos) = ctx.optional::<Gpos>() {
            let lookup_count = gpos.layout.lookup_list.len();
            let dangling = scripts
                .iter()
                .flat_map(|(_, script)| script.all_lang_sys())
                .flat_map(|lang_sys| &lang_sys.priorities)
                .flat_map(JstfPriority::gpos_lookup_indices)
                .any(|index| usize::from(index) >= lookup_count);
            if dangling {
                ctx.report(TableEncodingError::InvalidData(
                    "justification priority refers to a missing GPOS lookup",
                ));
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            major_version,
            minor_version,
            scripts,
        })
    }

    pub fn script(&self, script: Tag) -> Option<&JstfScript> {
        self.scripts
            .iter()
            .find(|(tag, _)| *tag == script)
            .map(|(_, script)| script)
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

    fn jstf_bytes() -> Vec<u8> {
        let mut data = be16(&[1, 0, 1]);
        data.extend(b"arab");
        data.extend(be16(&[12]));
        // script at 12: extenders at +6, default lang sys at +12
        data.extend(be16(&[6, 12, 0]));
        data.extend(be16(&[2, 100, 101]));
        // lang sys at 24 with one priority at +4
        data.extend(be16(&[1, 4]));
        // priority at 28: gsub shrinkage enable, gpos extension enable, extension max
        data.extend(be16(&[20, 0, 0, 0, 0, 0, 0, 26, 0, 30]));
        data.extend(be16(&[2, 3, 5]));
        data.extend(be16(&[1, 7]));
        // JstfMax at 58 with one lookup at +4
        data.extend(be16(&[1, 4]));
        data.extend(be16(&[1, 0, 1, 8]));
        data.extend(be16(&[1, 8, 0x0004, 25]));
        data.extend(be16(&[1, 1, 3]));
        data
    }

    #[test]
    fn reads_scripts_priorities_and_max_lookups() {
        let data = jstf_bytes();
        let mut diagnostics = Diagnostics::default();
        let jstf = Jstf::from_context(&mut ParseContext::standalone(Tag::JSTF, &data, &mut diagnostics))
            .unwrap();

        assert!(diagnostics.is_empty());
        let arab = jstf.script(Tag::new(*b"arab")).unwrap();
        assert_eq!(arab.extender_glyphs, vec![100, 101]);

        let lang_sys = arab.lang_sys(Tag::new(*b"URD ")).unwrap();
        let priority = &lang_sys.priorities[0];
        assert_eq!(priority.gsub_shrinkage_enable, vec![3, 5]);
        assert_eq!(priority.gpos_extension_enable, vec![7]);
        assert!(priority.shrinkage_max.is_empty());
        assert_eq!(priority.extension_max.len(), 1);
        assert_eq!(priority.extension_max[0].lookup_type(), 1);
        assert!(jstf.script(Tag::new(*b"latn")).is_none());
    }

    #[test]
    fn missing_gpos_lookups_are_reported() {
        // GPOS with an empty lookup list
        let gpos_data = be16(&[1, 0, 10, 12, 14, 0, 0, 0]);
        let mut scratch = Diagnostics::default();
        let gpos: FontTable = Gpos::from_context(&mut ParseContext::standalone(Tag::GPOS, &gpos_data, &mut scratch))
            .unwrap()
            .into();

        let data = jstf_bytes();
        let mut diagnostics = Diagnostics::default();
        {
            let mut ctx = ParseContext::standalone(Tag::JSTF, &data, &mut diagnostics).with_dependency(&gpos);
            Jstf::from_context(&mut ctx).unwrap();
        }

        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn unknown_major_version_fails() {
        let mut data = jstf_bytes();
        data[1] = 2;
        let mut diagnostics = Diagnostics::default();

        assert!(Jstf::from_context(&mut ParseContext::standalone(Tag::JSTF, &data, &mut diagnostics)).is_err());
    }
}
