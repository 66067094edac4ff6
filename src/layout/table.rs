//! The header shared by GSUB and GPOS

use super::{FeatureListTable, LookupKind, LookupListTable, ScriptListTable, read_reported};
use crate::{
    VeroTypeError,
    registry::ParseContext,
    tables::TableEncodingError,
    types::Tag,
};

/// Script, feature and lookup lists of a GSUB or GPOS table.
///
/// A list that fails to read is reported and left empty, so the table
/// survives a single broken list.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable<T> {
    pub major_version: u16,
    pub minor_version: u16,
    pub script_list: ScriptListTable,
    pub feature_list: FeatureListTable,
    pub lookup_list: LookupListTable<T>,
    /// Version 1.1; feature variations are not read
    pub feature_variations_offset: Option<u32>,
}

impl<T: LookupKind> LayoutTable<T> {
    pub fn read(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if major_version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: ctx.tag(),
                version: u32::from(major_version) << 16 | u32::from(minor_version),
            }
            .into());
        }

        let script_list_offset = usize::from(reader.read_u16()?);
        let feature_list_offset = usize::from(reader.read_u16()?);
        let lookup_list_offset = usize::from(reader.read_u16()?);
        let feature_variations_offset = match minor_version {
            1.. => Some(reader.read_u32()?),
            0 => None,
        };

        let script_list = read_reported(&mut reader, 0, script_list_offset, ctx, ScriptListTable::read)
            .unwrap_or_default();
        let feature_list = read_reported(&mut reader, 0, feature_list_offset, ctx, |r, pos, _| {
            FeatureListTable::read(r, pos)
        })
        .unwrap_or_default();
        let lookup_list = read_reported(&mut reader, 0, lookup_list_offset, ctx, LookupListTable::read)
            .unwrap_or_default();

        Ok(Self {
            major_version,
            minor_version,
            script_list,
            feature_list,
            lookup_list,
            feature_variations_offset,
        })
    }
}

impl<T> LayoutTable<T> {
    /// Indices of the lookups a feature enables for a script and language,
    /// the language falling back to the script's default
    pub fn feature_lookups(&self, script: Tag, language: Tag, feature: Tag) -> Vec<u16> {
        let Some(lang_sys) = self
            .script_list
            .script(script)
            .and_then(|script| script.lang_sys(language))
        else {
            return Vec::new();
        };

        let mut indices: Vec<u16> = lang_sys
            .required_feature_index
            .into_iter()
            .chain(lang_sys.feature_indices.iter().copied())
            .filter_map(|index| self.feature_list.get(index))
            .filter(|record| record.tag == feature)
            .flat_map(|record| record.feature.lookup_list_indices.iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
