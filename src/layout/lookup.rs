use bitflags::bitflags;

use crate::{
    VeroTypeError,
    buffer::{VeroBufReader, VeroBufReaderError},
    registry::ParseContext,
    tables::TableEncodingError,
};

bitflags! {
    /// Lookup qualifiers read from every lookup table
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LookupFlag: u16 {
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_CLASS_FILTER = 0xFF00;
    }
}

impl LookupFlag {
    /// Mark attachment class to match, 0 for no filtering
    pub fn mark_attachment_type(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

/// Reads one subtable of a given lookup type at an absolute position
pub type SubtableConstructor<T> =
    fn(&mut VeroBufReader<'_>, usize, &mut ParseContext<'_>) -> Result<T, VeroTypeError>;

/// A lookup category (GSUB or GPOS): its subtable type and the
/// lookup type → constructor index used to build it.
pub trait LookupKind: Sized {
    /// Lookup type value marking an extension lookup
    const EXTENSION_TYPE: u16;

    /// Name used in diagnostics
    const NAME: &'static str;

    /// The constructor for a (non-extension) lookup type
    fn constructor(lookup_type: u16) -> Option<SubtableConstructor<Self>>;
}

/// One lookup: its type, flags and subtables.
///
/// Extension lookups never show up here: their subtables are read through
/// the 32-bit indirection and `lookup_type` is the wrapped type.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable<T> {
    lookup_type: u16,
    flag: LookupFlag,
    mark_filtering_set: Option<u16>,
    subtables: Vec<T>,
}

impl<T: LookupKind> LookupTable<T> {
    /// Reads the lookup at `base`. Subtables that fail are reported through
    /// `ctx` and left out; the lookup itself fails only when its header
    /// cannot be read or its type is unknown.
    pub fn read(
        reader: &mut VeroBufReader<'_>,
        base: usize,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let lookup_type = reader.read_u16()?;
        let flag = LookupFlag::from_bits_retain(reader.read_u16()?);
        let count = usize::from(reader.read_u16()?);
        let offsets = reader.read_array::<u16>(count)?;
        let mark_filtering_set = if flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            Some(reader.read_u16()?)
        } else {
            None
        };

        let (lookup_type, subtables) = if lookup_type == T::EXTENSION_TYPE {
            read_extension_subtables::<T>(reader, base, &offsets, ctx)?
        } else {
            let constructor = T::constructor(lookup_type).ok_or(
                TableEncodingError::UnsupportedSubtableFormat {
                    kind: T::NAME,
                    format: lookup_type,
                },
            )?;
            let mut subtables = Vec::with_capacity(offsets.len());
            for offset in offsets {
                let result = resolve_required(reader, base, offset)
                    .map_err(VeroTypeError::from)
                    .and_then(|pos| constructor(reader, pos, ctx));
                match result {
                    Ok(subtable) => subtables.push(subtable),
                    Err(err) => ctx.report(err),
                }
            }
            (lookup_type, subtables)
        };

        Ok(Self {
            lookup_type,
            flag,
            mark_filtering_set,
            subtables,
        })
    }
}

impl<T> LookupTable<T> {
    /// The lookup type; for extension lookups, the type they wrap
    pub fn lookup_type(&self) -> u16 {
        self.lookup_type
    }

    pub fn flag(&self) -> LookupFlag {
        self.flag
    }

    pub fn mark_filtering_set(&self) -> Option<u16> {
        self.mark_filtering_set
    }

    pub fn subtables(&self) -> &[T] {
        &self.subtables
    }
}

/// Follows every extension subtable to the subtable it wraps.
///
/// All extension subtables of a lookup must wrap the same type; the first
/// readable one decides it and disagreeing ones are dropped. A lookup whose
/// extension subtables are all unreadable fails, so callers never see an
/// unresolved extension lookup.
fn read_extension_subtables<T: LookupKind>(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    offsets: &[u16],
    ctx: &mut ParseContext<'_>,
) -> Result<(u16, Vec<T>), VeroTypeError> {
    let mut resolved_type = None;
    let mut subtables = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        let target = match read_extension_header(reader, base, offset) {
            Ok(target) => target,
            Err(err) => {
                ctx.report(err);
                continue;
            }
        };
        let (wrapped_type, pos) = target;

        if wrapped_type == T::EXTENSION_TYPE || resolved_type.is_some_and(|t| t != wrapped_type) {
            ctx.report(TableEncodingError::UnsupportedSubtableFormat {
                kind: "extension lookup target",
                format: wrapped_type,
            });
            continue;
        }
        let Some(constructor) = T::constructor(wrapped_type) else {
            ctx.report(TableEncodingError::UnsupportedSubtableFormat {
                kind: T::NAME,
                format: wrapped_type,
            });
            continue;
        };
        resolved_type = Some(wrapped_type);

        match constructor(reader, pos, ctx) {
            Ok(subtable) => subtables.push(subtable),
            Err(err) => ctx.report(err),
        }
    }

    let lookup_type = resolved_type.ok_or(TableEncodingError::InvalidData(
        "extension lookup has no readable subtables",
    ))?;

    Ok((lookup_type, subtables))
}

/// Reads an extension subtable header, returning the wrapped lookup type and
/// the absolute position of the wrapped subtable
fn read_extension_header(
    reader: &mut VeroBufReader<'_>,
    lookup_base: usize,
    offset: u16,
) -> Result<(u16, usize), VeroTypeError> {
    let ext_base = resolve_required(reader, lookup_base, offset)?;
    reader.seek_to(ext_base)?;

    let format = reader.read_u16()?;
    if format != 1 {
        return Err(TableEncodingError::UnsupportedSubtableFormat {
            kind: "extension subtable",
            format,
        }
        .into());
    }
    let wrapped_type = reader.read_u16()?;
    let extension_offset = reader.read_u32()? as usize;
    let pos = reader.resolve(ext_base, extension_offset)?;

    Ok((wrapped_type, pos))
}

/// Resolves a lookup or subtable offset. These offsets are never null, so
/// zero is malformed rather than "absent".
fn resolve_required(reader: &VeroBufReader<'_>, base: usize, offset: u16) -> Result<usize, VeroBufReaderError> {
    if offset == 0 {
        return Err(VeroBufReaderError::MalformedOffset {
            base,
            offset: 0,
            len: reader.len(),
        });
    }

    reader.resolve(base, usize::from(offset))
}

/// The ordered lookups of a GSUB, GPOS or JSTF table.
///
/// Slots keep their index even when a lookup fails to parse, since features
/// refer to lookups by index.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupListTable<T> {
    lookups: Vec<Option<LookupTable<T>>>,
}

impl<T> Default for LookupListTable<T> {
    fn default() -> Self {
        Self {
            lookups: Vec::new(),
        }
    }
}

impl<T: LookupKind> LookupListTable<T> {
    pub fn read(
        reader: &mut VeroBufReader<'_>,
        base: usize,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let count = usize::from(reader.read_u16()?);
        let offsets = reader.read_array::<u16>(count)?;

        let lookups = offsets
            .into_iter()
            .map(|offset| {
                let result = resolve_required(reader, base, offset)
                    .map_err(VeroTypeError::from)
                    .and_then(|pos| LookupTable::read(reader, pos, ctx));
                match result {
                    Ok(lookup) => Some(lookup),
                    Err(err) => {
                        ctx.report(err);
                        None
                    }
                }
            })
            .collect();

        Ok(Self { lookups })
    }
}

impl<T> LookupListTable<T> {
    /// Number of lookup slots, including ones that failed to parse
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&LookupTable<T>> {
        self.lookups.get(usize::from(index))?.as_ref()
    }

    /// Parsed lookups with their indices
    pub fn iter(&self) -> impl Iterator<Item = (u16, &LookupTable<T>)> + '_ {
        self.lookups
            .iter()
            .enumerate()
            .filter_map(|(i, lookup)| Some((i as u16, lookup.as_ref()?)))
    }
}
