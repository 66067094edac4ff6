use std::collections::BTreeMap;

use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    registry::{Diagnostic, Diagnostics, ParserRegistry},
    tables::{
        FontTable, TableDirectory, TableVariant, cmap::Cmap, glyf::Glyf, gpos::Gpos, gsub::Gsub,
        head::Head, hhea::Hhea, hmtx::Hmtx, maxp::Maxp, os2::Os2,
    },
    types::{GlyphId, Tag},
};

/// Knobs for [`FontFile::from_bytes_with_options`]
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Compare every table against its directory checksum and record a
    /// diagnostic on mismatch
    pub verify_checksums: bool,
}

/// A parsed font: the table directory, every table that parsed and the
/// diagnostics collected on the way.
///
/// The model owns copies of the bytes it keeps and offers no mutation, so it
/// can be shared between threads once built.
#[derive(Debug, Clone)]
pub struct FontFile {
    directory: TableDirectory,
    tables: BTreeMap<Tag, FontTable>,
    diagnostics: Vec<Diagnostic>,
}

impl FontFile {
    /// Parses `data` with the standard registry
    ///
    /// # Errors
    ///
    /// Only a table directory that cannot be read fails the whole file.
    /// Problems inside tables are reported through [`FontFile::diagnostics`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, VeroTypeError> {
        Self::from_bytes_with_options(data, &ParserRegistry::standard(), &ParseOptions::default())
    }

    pub fn from_bytes_with_registry(
        data: &[u8],
        registry: &ParserRegistry,
    ) -> Result<Self, VeroTypeError> {
        Self::from_bytes_with_options(data, registry, &ParseOptions::default())
    }

    pub fn from_bytes_with_options(
        data: &[u8],
        registry: &ParserRegistry,
        options: &ParseOptions,
    ) -> Result<Self, VeroTypeError> {
        let mut reader = VeroBufReader::new(data);
        let directory = TableDirectory::from_reader(&mut reader)?;

        let mut diagnostics = Diagnostics::default();
        let tables = registry.dispatch(data, &directory, options, &mut diagnostics);

        Ok(Self {
            directory,
            tables,
            diagnostics: diagnostics.into_vec(),
        })
    }

    pub fn directory(&self) -> &TableDirectory {
        &self.directory
    }

    /// A parsed table by tag
    pub fn table(&self, tag: Tag) -> Option<&FontTable> {
        self.tables.get(&tag)
    }

    /// A parsed table by type
    pub fn get<T: TableVariant>(&self) -> Option<&T> {
        self.table(T::TAG).and_then(T::from_table)
    }

    /// Tags of every table that parsed
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tables.keys().copied()
    }

    /// Non-fatal problems in the order they were found
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn units_per_em(&self) -> Option<u16> {
        self.get::<Head>().map(Head::units_per_em)
    }

    /// Typographic ascender, from hhea, falling back to OS/2
    pub fn ascender(&self) -> Option<i16> {
        self.get::<Hhea>()
            .map(|hhea| hhea.ascender)
            .or_else(|| self.get::<Os2>().map(|os2| os2.typo_ascender))
    }

    pub fn descender(&self) -> Option<i16> {
        self.get::<Hhea>()
            .map(|hhea| hhea.descender)
            .or_else(|| self.get::<Os2>().map(|os2| os2.typo_descender))
    }

    pub fn line_gap(&self) -> Option<i16> {
        self.get::<Hhea>()
            .map(|hhea| hhea.line_gap)
            .or_else(|| self.get::<Os2>().map(|os2| os2.typo_line_gap))
    }

    pub fn num_glyphs(&self) -> Option<u16> {
        self.get::<Maxp>().map(|maxp| maxp.num_glyphs)
    }

    pub fn advance_width(&self, glyph: GlyphId) -> Option<u16> {
        self.get::<Hmtx>()?.metric(glyph).map(|m| m.advance_width)
    }

    pub fn left_side_bearing(&self, glyph: GlyphId) -> Option<i16> {
        self.get::<Hmtx>()?.metric(glyph).map(|m| m.left_side_bearing)
    }

    /// The glyph's outline bytes; empty glyphs resolve to glyph 0's data
    pub fn glyph_data(&self, glyph: GlyphId) -> Option<&[u8]> {
        self.get::<Glyf>()?.glyph_data(glyph)
    }

    /// The nominal glyph for `codepoint`, 0 when unmapped
    pub fn glyph_index(&self, codepoint: u32) -> GlyphId {
        self.get::<Cmap>()
            .map(|cmap| cmap.lookup_index(codepoint, 0))
            .unwrap_or(0)
    }

    pub fn gsub(&self) -> Option<&Gsub> {
        self.get::<Gsub>()
    }

    pub fn gpos(&self) -> Option<&Gpos> {
        self.get::<Gpos>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn font_file_is_shareable() {
        assert_send_sync::<FontFile>();
    }

    #[test]
    fn empty_directory_parses_to_empty_font() {
        let data = [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let font = FontFile::from_bytes(&data).unwrap();

        assert_eq!(font.tags().count(), 0);
        assert!(font.diagnostics().is_empty());
        assert_eq!(font.units_per_em(), None);
        assert_eq!(font.glyph_index(0x41), 0);
    }
}
