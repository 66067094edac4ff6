//! Script and feature lists

use super::resolve_nullable;
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    registry::ParseContext,
    types::Tag,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptListTable {
    pub scripts: Vec<ScriptRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub tag: Tag,
    pub script: ScriptTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptTable {
    pub default_lang_sys: Option<LangSysTable>,
    pub lang_sys: Vec<LangSysRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSysRecord {
    pub tag: Tag,
    pub lang_sys: LangSysTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LangSysTable {
    /// Feature that must be applied for this language, if any
    pub required_feature_index: Option<u16>,
    pub feature_indices: Vec<u16>,
}

/// Reads a u16 count of (tag, offset16) records
fn read_tagged_offsets(reader: &mut VeroBufReader<'_>) -> Result<Vec<(Tag, u16)>, VeroTypeError> {
    let count = usize::from(reader.read_u16()?);
    reader.check_remaining(count, 6)?;

    (0..count)
        .map(|_| -> Result<_, VeroTypeError> { Ok((reader.read_tag()?, reader.read_u16()?)) })
        .collect()
}

impl ScriptListTable {
    /// Scripts that fail to read are reported and skipped
    pub fn read(
        reader: &mut VeroBufReader<'_>,
        base: usize,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let records = read_tagged_offsets(reader)?;

        let mut scripts = Vec::with_capacity(records.len());
        for (tag, offset) in records {
            let result = reader
                .resolve(base, usize::from(offset))
                .map_err(VeroTypeError::from)
                .and_then(|pos| ScriptTable::read(reader, pos));
            match result {
                Ok(script) => scripts.push(ScriptRecord { tag, script }),
                Err(err) => ctx.report(err),
            }
        }

        Ok(Self { scripts })
    }

    pub fn script(&self, tag: Tag) -> Option<&ScriptTable> {
        self.scripts
            .iter()
            .find(|record| record.tag == tag)
            .map(|record| &record.script)
    }
}

impl ScriptTable {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let default_offset = reader.read_u16()?;
        let records = read_tagged_offsets(reader)?;

        let default_lang_sys = resolve_nullable(reader, base, default_offset)?
            .map(|pos| LangSysTable::read(reader, pos))
            .transpose()?;
        let lang_sys = records
            .into_iter()
            .map(|(tag, offset)| -> Result<_, VeroTypeError> {
                let pos = reader.resolve(base, usize::from(offset))?;
                Ok(LangSysRecord {
                    tag,
                    lang_sys: LangSysTable::read(reader, pos)?,
                })
            })
            .collect::<Result<_, VeroTypeError>>()?;

        Ok(Self {
            default_lang_sys,
            lang_sys,
        })
    }

    /// The language system for `tag`, falling back to the default one
    pub fn lang_sys(&self, tag: Tag) -> Option<&LangSysTable> {
        self.lang_sys
            .iter()
            .find(|record| record.tag == tag)
            .map(|record| &record.lang_sys)
            .or(self.default_lang_sys.as_ref())
    }
}

impl LangSysTable {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let _lookup_order = reader.read_u16()?;
        let required = reader.read_u16()?;
        let count = usize::from(reader.read_u16()?);

        Ok(Self {
            required_feature_index: (required != 0xFFFF).then_some(required),
            feature_indices: reader.read_array(count)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureListTable {
    pub features: Vec<FeatureRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub feature: FeatureTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureTable {
    /// Offset to the feature parameters, relative to the feature table
    pub feature_params_offset: u16,
    pub lookup_list_indices: Vec<u16>,
}

impl FeatureListTable {
    /// Unlike scripts, features are addressed by index, so a feature that
    /// fails to read fails the whole list
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let records = read_tagged_offsets(reader)?;

        let features = records
            .into_iter()
            .map(|(tag, offset)| -> Result<_, VeroTypeError> {
                let pos = reader.resolve(base, usize::from(offset))?;
                Ok(FeatureRecord {
                    tag,
                    feature: FeatureTable::read(reader, pos)?,
                })
            })
            .collect::<Result<_, VeroTypeError>>()?;

        Ok(Self { features })
    }

    pub fn get(&self, index: u16) -> Option<&FeatureRecord> {
        self.features.get(usize::from(index))
    }

    /// Every feature record with this tag
    pub fn by_tag(&self, tag: Tag) -> impl Iterator<Item = &FeatureRecord> + '_ {
        self.features.iter().filter(move |record| record.tag == tag)
    }
}

impl FeatureTable {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;

        Ok(Self {
            feature_params_offset: reader.read_u16()?,
            lookup_list_indices: super::read_counted(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Diagnostics;

    #[test]
    fn script_list_with_default_and_named_lang_sys() {
        #[rustfmt::skip]
        let data = [
            // script list: 1 record, 'latn' at 8
            0, 1, b'l', b'a', b't', b'n', 0, 8,
            // script at 8: default at +10, one lang sys 'TRK ' at +20
            0, 10, 0, 1, b'T', b'R', b'K', b' ', 0, 20,
            // default lang sys at 18: required none, features [0, 1]
            0, 0, 0xff, 0xff, 0, 2, 0, 0, 0, 1,
            // TRK lang sys at 28: required 2, features [1]
            0, 0, 0, 2, 0, 1, 0, 1,
        ];
        let mut diagnostics = Diagnostics::default();
        let mut ctx = ParseContext::standalone(Tag::GSUB, &data, &mut diagnostics);
        let list = ScriptListTable::read(&mut ctx.reader(), 0, &mut ctx).unwrap();

        let latn = list.script(Tag::new(*b"latn")).unwrap();
        let default = latn.default_lang_sys.as_ref().unwrap();
        assert_eq!(default.required_feature_index, None);
        assert_eq!(default.feature_indices, vec![0, 1]);

        let trk = latn.lang_sys(Tag::new(*b"TRK ")).unwrap();
        assert_eq!(trk.required_feature_index, Some(2));
        assert_eq!(trk.feature_indices, vec![1]);

        // unknown language falls back to the default
        assert_eq!(latn.lang_sys(Tag::new(*b"DEU ")), Some(default));
        assert!(list.script(Tag::new(*b"cyrl")).is_none());
    }

    #[test]
    fn feature_list() {
        #[rustfmt::skip]
        let data = [
            0, 2,
            b'l', b'i', b'g', b'a', 0, 14,
            b'k', b'e', b'r', b'n', 0, 20,
            0, 0, 0, 1, 0, 3,
            0, 0, 0, 2, 0, 0, 0, 4,
        ];
        let list = FeatureListTable::read(&mut VeroBufReader::new(&data), 0).unwrap();

        assert_eq!(list.get(0).unwrap().feature.lookup_list_indices, vec![3]);
        assert_eq!(list.get(1).unwrap().tag, Tag::new(*b"kern"));
        assert_eq!(list.by_tag(Tag::new(*b"kern")).next().unwrap().feature.lookup_list_indices, vec![0, 4]);
    }
}
