use super::{FontTable, TableEncodingError, TableMetadata, maxp::Maxp};
use crate::{
    VeroTypeError,
    registry::{ParseContext, TableParser},
    types::{Fixed, GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::POST,
    requires: &[],
    optional: &[Tag::MAXP],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Post::from_context(ctx)?.into())
}

/// The [post table](https://learn.microsoft.com/en-us/typography/opentype/spec/post)
#[derive(Debug, Clone)]
pub struct Post {
    pub metadata: TableMetadata,
    pub version: Fixed,
    /// Counter-clockwise degrees from the vertical
    pub italic_angle: Fixed,
    pub underline_position: i16,
    pub underline_thickness: i16,
    /// Non-zero for monospaced fonts
    pub is_fixed_pitch: u32,
    pub min_mem_type42: u32,
    pub max_mem_type42: u32,
    pub min_mem_type1: u32,
    pub max_mem_type1: u32,
    pub glyph_names: GlyphNames,
}

/// Where glyph names come from, by table version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphNames {
    /// Version 3.0: the font carries no names
    None,
    /// Version 1.0: the 258 standard Macintosh names, in order
    Standard,
    /// Version 2.0: per-glyph indices into the standard names followed by
    /// the font's own names
    Indexed {
        indices: Vec<u16>,
        names: Vec<String>,
    },
    /// Version 2.5: per-glyph offsets into the standard names
    Offsets(Vec<i8>),
}

impl Post {
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let version = reader.read_fixed()?;
        let italic_angle = reader.read_fixed()?;
        let underline_position = reader.read_i16()?;
        let underline_thickness = reader.read_i16()?;
        let is_fixed_pitch = reader.read_u32()?;
        let min_mem_type42 = reader.read_u32()?;
        let max_mem_type42 = reader.read_u32()?;
        let min_mem_type1 = reader.read_u32()?;
        let max_mem_type1 = reader.read_u32()?;

        let glyph_names = match version.to_bits() {
            0x0001_0000 => GlyphNames::Standard,
            0x0002_0000 => {
                let count = usize::from(reader.read_u16()?);
                let indices = reader.read_array::<u16>(count)?;
                let mut names = Vec::new();
                while reader.remaining() > 0 {
                    match reader.read_pascal_string() {
                        Ok(name) => names.push(name),
                        Err(err) => {
                            ctx.report(err);
                            break;
                        }
                    }
                }
                GlyphNames::Indexed { indices, names }
            }
            0x0002_5000 => {
                let count = usize::from(reader.read_u16()?);
                GlyphNames::Offsets(reader.read_array::<i8>(count)?)
            }
            0x0003_0000 | 0x0004_0000 => GlyphNames::None,
            bits => {
                return Err(TableEncodingError::UnsupportedTableVersion {
                    tag: Tag::POST,
                    version: bits as u32,
                }
                .into());
            }
        };

        let named = match &glyph_names {
            GlyphNames::Indexed { indices, .. } => Some(indices.len()),
            GlyphNames::Offsets(offsets) => Some(offsets.len()),
            _ => None,
        };
        if let (Some(named), Some(maxp)) = (named, ctx.optional::<Maxp>()) {
            if named != usize::from(maxp.num_glyphs) {
                ctx.report(TableEncodingError::InvalidData(
                    "post glyph count differs from maxp",
                ));
            }
        }

        Ok(Self {
            metadata: ctx.metadata(),
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            min_mem_type42,
            max_mem_type42,
            min_mem_type1,
            max_mem_type1,
            glyph_names,
        })
    }

    pub fn is_fixed_pitch(&self) -> bool {
        self.is_fixed_pitch != 0
    }

    pub fn glyph_name(&self, glyph: GlyphId) -> Option<&str> {
        let index = usize::from(glyph);

        match &self.glyph_names {
            GlyphNames::None => None,
            GlyphNames::Standard => STANDARD_GLYPH_NAMES.get(index).copied(),
            GlyphNames::Indexed { indices, names } => {
                let name_index = usize::from(*indices.get(index)?);
                match name_index.checked_sub(STANDARD_GLYPH_NAMES.len()) {
                    None => STANDARD_GLYPH_NAMES.get(name_index).copied(),
                    Some(custom) => names.get(custom).map(String::as_str),
                }
            }
            GlyphNames::Offsets(offsets) => {
                let offset = isize::from(*offsets.get(index)?);
                let name_index = (index as isize).checked_add(offset)?;
                STANDARD_GLYPH_NAMES
                    .get(usize::try_from(name_index).ok()?)
                    .copied()
            }
        }
    }
}

/// The 258 standard Macintosh glyph names
#[rustfmt::skip]
pub static STANDARD_GLYPH_NAMES: [&str; 258] = [
    ".notdef", ".null", "nonmarkingreturn", "space", "exclam", "quotedbl", "numbersign", "dollar",
    "percent", "ampersand", "quotesingle", "parenleft", "parenright", "asterisk", "plus", "comma",
    "hyphen", "period", "slash", "zero", "one", "two", "three", "four", "five", "six", "seven",
    "eight", "nine", "colon", "semicolon", "less", "equal", "greater", "question", "at", "A", "B",
    "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U",
    "V", "W", "X", "Y", "Z", "bracketleft", "backslash", "bracketright", "asciicircum",
    "underscore", "grave", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n",
    "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar", "braceright",
    "asciitilde", "Adieresis", "Aring", "Ccedilla", "Eacute", "Ntilde", "Odieresis", "Udieresis",
    "aacute", "agrave", "acircumflex", "adieresis", "atilde", "aring", "ccedilla", "eacute",
    "egrave", "ecircumflex", "edieresis", "iacute", "igrave", "icircumflex", "idieresis", "ntilde",
    "oacute", "ograve", "ocircumflex", "odieresis", "otilde", "uacute", "ugrave", "ucircumflex",
    "udieresis", "dagger", "degree", "cent", "sterling", "section", "bullet", "paragraph",
    "germandbls", "registered", "copyright", "trademark", "acute", "dieresis", "notequal", "AE",
    "Oslash", "infinity", "plusminus", "lessequal", "greaterequal", "yen", "mu", "partialdiff",
    "summation", "product", "pi", "integral", "ordfeminine", "ordmasculine", "Omega", "ae",
    "oslash", "questiondown", "exclamdown", "logicalnot", "radical", "florin", "approxequal",
    "Delta", "guillemotleft", "guillemotright", "ellipsis", "nonbreakingspace", "Agrave", "Atilde",
    "Otilde", "OE", "oe", "endash", "emdash", "quotedblleft", "quotedblright", "quoteleft",
    "quoteright", "divide", "lozenge", "ydieresis", "Ydieresis", "fraction", "currency",
    "guilsinglleft", "guilsinglright", "fi", "fl", "daggerdbl", "periodcentered", "quotesinglbase",
    "quotedblbase", "perthousand", "Acircumflex", "Ecircumflex", "Aacute", "Edieresis", "Egrave",
    "Iacute", "Icircumflex", "Idieresis", "Igrave", "Oacute", "Ocircumflex", "apple", "Ograve",
    "Uacute", "Ucircumflex", "Ugrave", "dotlessi", "circumflex", "tilde", "macron", "breve",
    "dotaccent", "ring", "cedilla", "hungarumlaut", "ogonek", "caron", "Lslash", "lslash",
    "Scaron", "scaron", "Zcaron", "zcaron", "brokenbar", "Eth", "eth", "Yacute", "yacute", "Thorn",
    "thorn", "minus", "multiply", "onesuperior", "twosuperior", "threesuperior", "onehalf",
    "onequarter", "threequarters", "franc", "Gbreve", "gbreve", "Idotaccent", "Scedilla",
    "scedilla", "Cacute", "cacute", "Ccaron", "ccaron", "dcroat",
];
