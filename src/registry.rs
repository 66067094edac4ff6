//! Parser registration and dependency-ordered dispatch.
//!
//! Every table parser declares the tables it needs already parsed. The
//! registry orders the parsers of the tables present in a font by those
//! declarations alone and hands each parser a [`ParseContext`] that can only
//! see what it declared.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    font::ParseOptions,
    tables::{
        self, FontTable, TableDirectory, TableEncodingError, TableMetadata, TableVariant,
    },
    types::Tag,
};

/// Signature shared by every table parser
pub type ParseFn = fn(&mut ParseContext<'_>) -> Result<FontTable, VeroTypeError>;

/// A table parser together with its declared dependencies
#[derive(Clone, Copy)]
pub struct TableParser {
    pub tag: Tag,
    /// Tables that must have parsed before this one can be read
    pub requires: &'static [Tag],
    /// Tables this parser uses when they are available
    pub optional: &'static [Tag],
    pub parse: ParseFn,
}

impl fmt::Debug for TableParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableParser")
            .field("tag", &self.tag)
            .field("requires", &self.requires)
            .field("optional", &self.optional)
            .finish()
    }
}

impl TableParser {
    fn dependencies(&self) -> impl Iterator<Item = Tag> + '_ {
        self.requires.iter().chain(self.optional).copied()
    }
}

/// A non-fatal problem found while parsing, attributed to a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub tag: Tag,
    pub error: VeroTypeError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tag, self.error)
    }
}

/// Ordered collection of diagnostics, mirrored to the `log` facade
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn report(&mut self, tag: Tag, error: impl Into<VeroTypeError>) {
        let diagnostic = Diagnostic {
            tag,
            error: error.into(),
        };
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// What a single parser call gets to see: its own bytes, the dependencies it
/// declared and a place to report non-fatal problems.
pub struct ParseContext<'a> {
    metadata: TableMetadata,
    data: &'a [u8],
    dependencies: BTreeMap<Tag, &'a FontTable>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> ParseContext<'a> {
    pub fn new(metadata: TableMetadata, data: &'a [u8], diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            metadata,
            data,
            dependencies: BTreeMap::new(),
            diagnostics,
        }
    }

    /// A context for `data` read on its own, outside of a font file
    pub fn standalone(tag: Tag, data: &'a [u8], diagnostics: &'a mut Diagnostics) -> Self {
        let metadata = TableMetadata {
            tag,
            checksum: 0,
            offset: 0,
            length: data.len() as u32,
        };
        Self::new(metadata, data, diagnostics)
    }

    /// Makes an already parsed table visible to the parser
    pub fn with_dependency(mut self, table: &'a FontTable) -> Self {
        self.dependencies.insert(table.metadata().tag, table);
        self
    }

    pub fn tag(&self) -> Tag {
        self.metadata.tag
    }

    pub fn metadata(&self) -> TableMetadata {
        self.metadata
    }

    /// The table's bytes
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A fresh reader over the table's bytes; positions are table-relative
    pub fn reader(&self) -> VeroBufReader<'a> {
        VeroBufReader::new(self.data)
    }

    /// A declared dependency that must be present
    pub fn require<T: TableVariant>(&self) -> Result<&'a T, VeroTypeError> {
        self.optional::<T>().ok_or_else(|| {
            TableEncodingError::UnresolvedDependency {
                tag: self.metadata.tag,
                dependency: T::TAG,
            }
            .into()
        })
    }

    /// A declared dependency, if it parsed
    pub fn optional<T: TableVariant>(&self) -> Option<&'a T> {
        self.dependencies
            .get(&T::TAG)
            .and_then(|table| T::from_table(table))
    }

    /// Records a non-fatal problem against this table
    pub fn report(&mut self, error: impl Into<VeroTypeError>) {
        self.diagnostics.report(self.metadata.tag, error);
    }
}

/// The order in which a set of present tables will be parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOrder {
    pub order: Vec<Tag>,
    /// Tables dropped because they sit on a dependency cycle
    pub cyclic: Vec<Tag>,
}

/// An immutable tag → parser mapping
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    parsers: BTreeMap<Tag, TableParser>,
}

#[derive(Debug, Default)]
pub struct ParserRegistryBuilder {
    parsers: BTreeMap<Tag, TableParser>,
}

impl ParserRegistryBuilder {
    /// Adds a parser, replacing any earlier one for the same tag
    pub fn register(mut self, parser: TableParser) -> Self {
        self.parsers.insert(parser.tag, parser);
        self
    }

    pub fn build(self) -> ParserRegistry {
        ParserRegistry {
            parsers: self.parsers,
        }
    }
}

impl ParserRegistry {
    pub fn builder() -> ParserRegistryBuilder {
        ParserRegistryBuilder::default()
    }

    /// A registry holding a parser for every supported table
    pub fn standard() -> Self {
        [
            tables::head::PARSER,
            tables::maxp::PARSER,
            tables::hhea::PARSER,
            tables::hmtx::PARSER,
            tables::loca::PARSER,
            tables::glyf::PARSER,
            tables::cmap::PARSER,
            tables::post::PARSER,
            tables::os2::PARSER,
            tables::name::PARSER,
            tables::kern::PARSER,
            tables::hdmx::PARSER,
            tables::ltsh::PARSER,
            tables::pclt::PARSER,
            tables::dsig::PARSER,
            tables::fftm::PARSER,
            tables::meta::PARSER,
            tables::gdef::PARSER,
            tables::gsub::PARSER,
            tables::gpos::PARSER,
            tables::jstf::PARSER,
            tables::cff::PARSER,
            tables::opaque::FPGM_PARSER,
            tables::opaque::PREP_PARSER,
            tables::opaque::CVT_PARSER,
        ]
        .into_iter()
        .fold(Self::builder(), ParserRegistryBuilder::register)
        .build()
    }

    pub fn get(&self, tag: Tag) -> Option<&TableParser> {
        self.parsers.get(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.parsers.keys().copied()
    }

    /// Orders the registered tables among `present` so that every table
    /// comes after the tables it depends on.
    ///
    /// Only the declared dependency graph decides the order; the order of
    /// `present` is irrelevant. Tables on a dependency cycle are left out of
    /// the order and listed in [`ParseOrder::cyclic`].
    pub fn parse_order(&self, present: impl IntoIterator<Item = Tag>) -> ParseOrder {
        let nodes: BTreeSet<Tag> = present
            .into_iter()
            .filter(|tag| self.parsers.contains_key(tag))
            .collect();

        let graph: BTreeMap<Tag, Vec<Tag>> = nodes
            .iter()
            .map(|&tag| {
                let deps = self.parsers[&tag]
                    .dependencies()
                    .filter(|dep| nodes.contains(dep))
                    .collect();
                (tag, deps)
            })
            .collect();

        let cyclic: BTreeSet<Tag> = nodes
            .iter()
            .copied()
            .filter(|&tag| reaches(&graph, tag, tag))
            .collect();

        let mut pending: BTreeMap<Tag, usize> = graph
            .iter()
            .filter(|(tag, _)| !cyclic.contains(*tag))
            .map(|(&tag, deps)| (tag, deps.iter().filter(|d| !cyclic.contains(*d)).count()))
            .collect();

        let mut ready: BTreeSet<Tag> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&tag, _)| tag)
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(tag) = ready.pop_first() {
            pending.remove(&tag);
            order.push(tag);
            for (dependent, deps) in &graph {
                if !deps.contains(&tag) {
                    continue;
                }
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        ParseOrder {
            order,
            cyclic: cyclic.into_iter().collect(),
        }
    }

    /// Parses every table of `directory` this registry knows about.
    ///
    /// Failures stay with the table that produced them: the table is left
    /// out of the result and a diagnostic is recorded.
    pub(crate) fn dispatch(
        &self,
        data: &[u8],
        directory: &TableDirectory,
        options: &ParseOptions,
        diagnostics: &mut Diagnostics,
    ) -> BTreeMap<Tag, FontTable> {
        for &tag in directory.headers.duplicates() {
            diagnostics.report(tag, TableEncodingError::DuplicateTable(tag));
        }

        let mut slices = BTreeMap::new();
        for metadata in directory.headers.iter() {
            if !self.parsers.contains_key(&metadata.tag) {
                log::debug!("no parser registered for {}, skipping", metadata.tag);
                continue;
            }
            let bytes = match metadata.slice(data) {
                Ok(bytes) => bytes,
                Err(err) => {
                    diagnostics.report(metadata.tag, err);
                    continue;
                }
            };
            if options.verify_checksums {
                let computed = metadata.compute_checksum(bytes);
                if computed != metadata.checksum {
                    diagnostics.report(
                        metadata.tag,
                        TableEncodingError::ChecksumMismatch {
                            expected: metadata.checksum,
                            computed,
                        },
                    );
                }
            }
            slices.insert(metadata.tag, (*metadata, bytes));
        }

        let plan = self.parse_order(slices.keys().copied());
        for &tag in &plan.cyclic {
            diagnostics.report(tag, TableEncodingError::DependencyCycle(tag));
        }
        log::debug!("table parse order: {:?}", plan.order);

        let mut parsed: BTreeMap<Tag, FontTable> = BTreeMap::new();
        for tag in plan.order {
            let parser = &self.parsers[&tag];
            let (metadata, bytes) = slices[&tag];

            if let Some(missing) = parser.requires.iter().find(|dep| !parsed.contains_key(dep)) {
                diagnostics.report(
                    tag,
                    TableEncodingError::UnresolvedDependency {
                        tag,
                        dependency: *missing,
                    },
                );
                continue;
            }

            let result = {
                let mut ctx = parser
                    .dependencies()
                    .filter_map(|dep| parsed.get(&dep))
                    .fold(ParseContext::new(metadata, bytes, diagnostics), ParseContext::with_dependency);
                (parser.parse)(&mut ctx)
            };

            match result {
                Ok(table) => {
                    log::trace!("parsed {tag}");
                    parsed.insert(tag, table);
                }
                Err(err) => diagnostics.report(tag, err),
            }
        }

        parsed
    }
}

/// True if `target` can be reached by following dependencies from `from`
fn reaches(graph: &BTreeMap<Tag, Vec<Tag>>, from: Tag, target: Tag) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<Tag> = graph[&from].clone();

    while let Some(tag) = stack.pop() {
        if tag == target {
            return true;
        }
        if seen.insert(tag) {
            stack.extend(graph.get(&tag).into_iter().flatten().copied());
        }
    }

    false
}
