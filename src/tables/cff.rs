//! The Compact Font Format table, version 1.
//!
//! Only the structures needed to describe the font are read: the header,
//! the four top-level INDEXes, the Top DICT, the charset, the CharStrings
//! INDEX and the Private DICT with its local subroutines. CharStrings are
//! kept as bytes and never interpreted.

use super::{FontTable, TableEncodingError, TableMetadata};
use crate::{
    VeroTypeError,
    buffer::VeroBufReader,
    layout::read_reported,
    registry::{ParseContext, TableParser},
    types::{GlyphId, Tag},
};

pub const PARSER: TableParser = TableParser {
    tag: Tag::CFF,
    requires: &[],
    optional: &[],
    parse,
};

fn parse(ctx: &mut ParseContext<'_>) -> Result<FontTable, VeroTypeError> {
    Ok(Cff::from_context(ctx)?.into())
}

/// DICT operators. Two-byte operators (escape 12) are `1200 + second byte`.
pub mod operator {
    pub const VERSION: u16 = 0;
    pub const NOTICE: u16 = 1;
    pub const FULL_NAME: u16 = 2;
    pub const FAMILY_NAME: u16 = 3;
    pub const WEIGHT: u16 = 4;
    pub const FONT_BBOX: u16 = 5;
    pub const CHARSET: u16 = 15;
    pub const ENCODING: u16 = 16;
    pub const CHAR_STRINGS: u16 = 17;
    pub const PRIVATE: u16 = 18;
    /// Private DICT: local subroutines, relative to the Private DICT
    pub const SUBRS: u16 = 19;
    pub const DEFAULT_WIDTH_X: u16 = 20;
    pub const NOMINAL_WIDTH_X: u16 = 21;
    pub const COPYRIGHT: u16 = 1200;
    pub const IS_FIXED_PITCH: u16 = 1201;
    pub const ITALIC_ANGLE: u16 = 1202;
    pub const CHARSTRING_TYPE: u16 = 1206;
    pub const FONT_MATRIX: u16 = 1207;
    pub const ROS: u16 = 1230;
    pub const FD_ARRAY: u16 = 1236;
    pub const FD_SELECT: u16 = 1237;
}

/// Operands above this count make a DICT invalid
const MAX_OPERANDS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DictOperand {
    Integer(i32),
    Real(f64),
}

impl DictOperand {
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(value) => f64::from(value),
            Self::Real(value) => value,
        }
    }

    pub fn as_integer(self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(value),
            Self::Real(_) => None,
        }
    }
}

/// A Top or Private DICT: operators in file order with their operands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(u16, Vec<DictOperand>)>,
}

impl Dict {
    pub fn parse(data: &[u8]) -> Result<Self, VeroTypeError> {
        let mut reader = VeroBufReader::new(data);
        let mut entries = Vec::new();
        let mut operands = Vec::new();

        while reader.remaining() > 0 {
            let b0 = reader.read_u8()?;
            let operand = match b0 {
                0..=11 | 13..=21 => {
                    entries.push((u16::from(b0), std::mem::take(&mut operands)));
                    continue;
                }
                12 => {
                    let b1 = reader.read_u8()?;
                    entries.push((1200 + u16::from(b1), std::mem::take(&mut operands)));
                    continue;
                }
                28 => DictOperand::Integer(i32::from(reader.read_i16()?)),
                29 => DictOperand::Integer(reader.read_i32()?),
                30 => DictOperand::Real(read_real(&mut reader)?),
                32..=246 => DictOperand::Integer(i32::from(b0) - 139),
                247..=250 => {
                    let b1 = i32::from(reader.read_u8()?);
                    DictOperand::Integer((i32::from(b0) - 247) * 256 + b1 + 108)
                }
                251..=254 => {
                    let b1 = i32::from(reader.read_u8()?);
                    DictOperand::Integer(-(i32::from(b0) - 251) * 256 - b1 - 108)
                }
                _ => return Err(TableEncodingError::InvalidData("reserved byte in CFF DICT").into()),
            };

            if operands.len() == MAX_OPERANDS {
                return Err(TableEncodingError::InvalidData("CFF DICT operand stack overflow").into());
            }
            operands.push(operand);
        }

        Ok(Self { entries })
    }

    /// Operands of the first occurrence of `op`
    pub fn get(&self, op: u16) -> Option<&[DictOperand]> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == op)
            .map(|(_, operands)| operands.as_slice())
    }

    /// The first operand of `op` when it is an integer
    pub fn integer(&self, op: u16) -> Option<i32> {
        self.get(op)?.first()?.as_integer()
    }

    pub fn contains(&self, op: u16) -> bool {
        self.get(op).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A packed BCD real, after its 30 prefix byte
fn read_real(reader: &mut VeroBufReader<'_>) -> Result<f64, VeroTypeError> {
    let mut text = String::new();

    'bytes: loop {
        let byte = reader.read_u8()?;
        for nibble in [byte >> 4, byte & 0x0F] {
            match nibble {
                0..=9 => text.push(char::from(b'0' + nibble)),
                0xA => text.push('.'),
                0xB => text.push('E'),
                0xC => text.push_str("E-"),
                0xE => text.push('-'),
                0xF => break 'bytes,
                _ => return Err(TableEncodingError::InvalidData("reserved nibble in CFF real").into()),
            }
        }
    }

    text.parse::<f64>()
        .map_err(|_| TableEncodingError::InvalidData("malformed CFF real").into())
}

/// Reads an INDEX at the cursor, leaving the cursor after its data
fn read_index(reader: &mut VeroBufReader<'_>) -> Result<Vec<Vec<u8>>, VeroTypeError> {
    let count = usize::from(reader.read_u16()?);
    if count == 0 {
        return Ok(Vec::new());
    }

    let off_size = reader.read_u8()?;
    if !(1..=4).contains(&off_size) {
        return Err(TableEncodingError::InvalidData("CFF INDEX offset size out of range").into());
    }
    reader.check_remaining(count + 1, usize::from(off_size))?;
    let offsets = (0..=count)
        .map(|_| -> Result<usize, VeroTypeError> {
            Ok(match off_size {
                1 => usize::from(reader.read_u8()?),
                2 => usize::from(reader.read_u16()?),
                3 => reader.read_u24()? as usize,
                _ => reader.read_u32()? as usize,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // offsets count from the byte before the object data
    if offsets[0] != 1 || offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(TableEncodingError::InvalidData("CFF INDEX offsets are not ascending").into());
    }
    let data = reader.read_bytes(offsets[count] - 1)?;

    Ok(offsets
        .windows(2)
        .map(|pair| data[pair[0] - 1..pair[1] - 1].to_vec())
        .collect())
}

fn dict_offset(dict: &Dict, op: u16) -> Result<Option<usize>, VeroTypeError> {
    dict.integer(op)
        .map(|value| {
            usize::try_from(value)
                .map_err(|_| VeroTypeError::from(TableEncodingError::InvalidData("negative offset in CFF DICT")))
        })
        .transpose()
}

/// Glyph to string ID (or CID) mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    IsoAdobe,
    Expert,
    ExpertSubset,
    /// One ID per glyph, starting with `.notdef` at glyph 0
    Custom(Vec<u16>),
}

impl Charset {
    fn read(reader: &mut VeroBufReader<'_>, base: usize, num_glyphs: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let format = reader.read_u8()?;

        let mut ids = Vec::with_capacity(num_glyphs);
        ids.push(0);
        match format {
            0 => ids.extend(reader.read_array::<u16>(num_glyphs.saturating_sub(1))?),
            1 | 2 => {
                while ids.len() < num_glyphs {
                    let first = reader.read_u16()?;
                    let left = match format {
                        1 => u16::from(reader.read_u8()?),
                        _ => reader.read_u16()?,
                    };
                    ids.extend((0..=left).map(|i| first.wrapping_add(i)));
                }
                ids.truncate(num_glyphs.max(1));
            }
            _ => {
                return Err(TableEncodingError::UnsupportedSubtableFormat {
                    kind: "CFF charset",
                    format: u16::from(format),
                }
                .into());
            }
        }

        Ok(Self::Custom(ids))
    }

    /// The string ID of a glyph. Only ISOAdobe among the predefined
    /// charsets is resolved.
    pub fn id(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            Self::IsoAdobe => (glyph <= 228).then_some(glyph),
            Self::Expert | Self::ExpertSubset => (glyph == 0).then_some(0),
            Self::Custom(ids) => ids.get(usize::from(glyph)).copied(),
        }
    }
}

/// The [CFF table](https://learn.microsoft.com/en-us/typography/opentype/spec/cff)
#[derive(Debug, Clone)]
pub struct Cff {
    pub metadata: TableMetadata,
    pub major_version: u8,
    pub minor_version: u8,
    pub header_size: u8,
    pub offset_size: u8,
    pub names: Vec<Vec<u8>>,
    pub top_dict: Dict,
    pub strings: Vec<Vec<u8>>,
    pub global_subrs: Vec<Vec<u8>>,
    pub char_strings: Vec<Vec<u8>>,
    pub charset: Option<Charset>,
    pub private_dict: Option<Dict>,
    pub local_subrs: Vec<Vec<u8>>,
}

impl Cff {
    /// Reads the font. A broken charset or Private DICT is reported and
    /// left out.
    ///
    /// # Errors
    ///
    /// Fails on a major version other than 1, on a broken top-level INDEX
    /// and when the Top DICT has no readable CharStrings INDEX.
    pub fn from_context(ctx: &mut ParseContext<'_>) -> Result<Self, VeroTypeError> {
        let mut reader = ctx.reader();
        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;
        if major_version != 1 {
            return Err(TableEncodingError::UnsupportedTableVersion {
                tag: Tag::CFF,
                version: u32::from(major_version) << 16 | u32::from(minor_version),
            }
            .into());
        }
        let header_size = reader.read_u8()?;
        let offset_size = reader.read_u8()?;

        reader.seek_to(usize::from(header_size))?;
        let names = read_index(&mut reader)?;
        let top_dicts = read_index(&mut reader)?;
        let strings = read_index(&mut reader)?;
        let global_subrs = read_index(&mut reader)?;

        if names.len() != 1 {
            ctx.report(TableEncodingError::InvalidData("CFF table should hold exactly one font"));
        }
        let top_dict = match top_dicts.first() {
            Some(data) => Dict::parse(data)?,
            None => return Err(TableEncodingError::InvalidData("CFF table has no Top DICT").into()),
        };

        let char_strings_offset = dict_offset(&top_dict, operator::CHAR_STRINGS)?
            .ok_or(TableEncodingError::InvalidData("CFF Top DICT has no CharStrings"))?;
        reader.seek_to(char_strings_offset)?;
        let char_strings = read_index(&mut reader)?;
        let num_glyphs = char_strings.len();

        let charset = match dict_offset(&top_dict, operator::CHARSET) {
            Ok(None | Some(0)) => Some(Charset::IsoAdobe),
            Ok(Some(1)) => Some(Charset::Expert),
            Ok(Some(2)) => Some(Charset::ExpertSubset),
            Ok(Some(offset)) => read_reported(&mut reader, 0, offset, ctx, |r, pos, _| {
                Charset::read(r, pos, num_glyphs)
            }),
            Err(err) => {
                ctx.report(err);
                None
            }
        };

        let (private_dict, local_subrs) = match top_dict.get(operator::PRIVATE) {
            Some(&[DictOperand::Integer(size), DictOperand::Integer(offset)]) => {
                match (usize::try_from(size), usize::try_from(offset)) {
                    (Ok(size), Ok(offset)) => {
                        read_reported(&mut reader, 0, offset, ctx, |r, pos, _| read_private(r, pos, size))
                            .map_or((None, Vec::new()), |(dict, subrs)| (Some(dict), subrs))
                    }
                    _ => {
                        ctx.report(TableEncodingError::InvalidData("negative Private DICT range"));
                        (None, Vec::new())
                    }
                }
            }
            Some(_) => {
                ctx.report(TableEncodingError::InvalidData("Private DICT range needs two integers"));
                (None, Vec::new())
            }
            None => (None, Vec::new()),
        };

        log::debug!("CFF font with {num_glyphs} glyphs and {} strings", strings.len());

        Ok(Self {
            metadata: ctx.metadata(),
            major_version,
            minor_version,
            header_size,
            offset_size,
            names,
            top_dict,
            strings,
            global_subrs,
            char_strings,
            charset,
            private_dict,
            local_subrs,
        })
    }

    /// Glyph count, taken from the CharStrings INDEX
    pub fn num_glyphs(&self) -> usize {
        self.char_strings.len()
    }

    pub fn char_string(&self, glyph: GlyphId) -> Option<&[u8]> {
        self.char_strings.get(usize::from(glyph)).map(Vec::as_slice)
    }

    /// PostScript name of the font
    pub fn font_name(&self) -> Option<&str> {
        std::str::from_utf8(self.names.first()?).ok()
    }

    /// A standard string or one from the String INDEX
    pub fn string(&self, sid: u16) -> Option<&str> {
        let sid = usize::from(sid);
        match sid.checked_sub(STANDARD_STRINGS.len()) {
            None => STANDARD_STRINGS.get(sid).copied(),
            Some(index) => std::str::from_utf8(self.strings.get(index)?).ok(),
        }
    }

    fn dict_string(&self, op: u16) -> Option<&str> {
        let sid = u16::try_from(self.top_dict.integer(op)?).ok()?;
        self.string(sid)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.dict_string(operator::FULL_NAME)
    }

    pub fn family_name(&self) -> Option<&str> {
        self.dict_string(operator::FAMILY_NAME)
    }

    pub fn weight(&self) -> Option<&str> {
        self.dict_string(operator::WEIGHT)
    }

    /// `[x_min, y_min, x_max, y_max]`, all zero when absent
    pub fn font_bbox(&self) -> [f64; 4] {
        let mut bbox = [0.0; 4];
        if let Some(operands) = self.top_dict.get(operator::FONT_BBOX) {
            for (slot, operand) in bbox.iter_mut().zip(operands) {
                *slot = operand.to_f64();
            }
        }
        bbox
    }

    /// CID-keyed fonts map glyphs to CIDs, not names
    pub fn is_cid(&self) -> bool {
        self.top_dict.contains(operator::ROS)
    }

    pub fn glyph_name(&self, glyph: GlyphId) -> Option<&str> {
        if self.is_cid() || usize::from(glyph) >= self.num_glyphs() {
            return None;
        }
        let sid = self.charset.as_ref()?.id(glyph)?;
        self.string(sid)
    }
}

/// The Private DICT at `base` and the local subroutines it points to
fn read_private(
    reader: &mut VeroBufReader<'_>,
    base: usize,
    size: usize,
) -> Result<(Dict, Vec<Vec<u8>>), VeroTypeError> {
    reader.seek_to(base)?;
    let dict = Dict::parse(reader.read_bytes(size)?)?;

    let subrs = match dict_offset(&dict, operator::SUBRS)? {
        Some(offset) => {
            reader.seek_relative(base, offset)?;
            read_index(reader)?
        }
        None => Vec::new(),
    };

    Ok((dict, subrs))
}

pub static STANDARD_STRINGS: [&str; 391] = [
    ".notdef", "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand",
    "quoteright", "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period",
    "slash", "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "colon", "semicolon", "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E",
    "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X",
    "Y", "Z", "bracketleft", "backslash", "bracketright", "asciicircum", "underscore", "quoteleft",
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar", "braceright", "asciitilde",
    "exclamdown", "cent", "sterling", "fraction", "yen", "florin", "section", "currency",
    "quotesingle", "quotedblleft", "guillemotleft", "guilsinglleft", "guilsinglright", "fi", "fl",
    "endash", "dagger", "daggerdbl", "periodcentered", "paragraph", "bullet", "quotesinglbase",
    "quotedblbase", "quotedblright", "guillemotright", "ellipsis", "perthousand", "questiondown",
    "grave", "acute", "circumflex", "tilde", "macron", "breve", "dotaccent", "dieresis", "ring",
    "cedilla", "hungarumlaut", "ogonek", "caron", "emdash", "AE", "ordfeminine", "Lslash",
    "Oslash", "OE", "ordmasculine", "ae", "dotlessi", "lslash", "oslash", "oe", "germandbls",
    "onesuperior", "logicalnot", "mu", "trademark", "Eth", "onehalf", "plusminus", "Thorn",
    "onequarter", "divide", "brokenbar", "degree", "thorn", "threequarters", "twosuperior",
    "registered", "minus", "eth", "multiply", "threesuperior", "copyright", "Aacute",
    "Acircumflex", "Adieresis", "Agrave", "Aring", "Atilde", "Ccedilla", "Eacute", "Ecircumflex",
    "Edieresis", "Egrave", "Iacute", "Icircumflex", "Idieresis", "Igrave", "Ntilde", "Oacute",
    "Ocircumflex", "Odieresis", "Ograve", "Otilde", "Scaron", "Uacute", "Ucircumflex", "Udieresis",
    "Ugrave", "Yacute", "Ydieresis", "Zcaron", "aacute", "acircumflex", "adieresis", "agrave",
    "aring", "atilde", "ccedilla", "eacute", "ecircumflex", "edieresis", "egrave", "iacute",
    "icircumflex", "idieresis", "igrave", "ntilde", "oacute", "ocircumflex", "odieresis", "ograve",
    "otilde", "scaron", "uacute", "ucircumflex", "udieresis", "ugrave", "yacute", "ydieresis",
    "zcaron", "exclamsmall", "Hungarumlautsmall", "dollaroldstyle", "dollarsuperior",
    "ampersandsmall", "Acutesmall", "parenleftsuperior", "parenrightsuperior", "twodotenleader",
    "onedotenleader", "zerooldstyle", "oneoldstyle", "twooldstyle", "threeoldstyle",
    "fouroldstyle", "fiveoldstyle", "sixoldstyle", "sevenoldstyle", "eightoldstyle",
    "nineoldstyle", "commasuperior", "threequartersemdash", "periodsuperior", "questionsmall",
    "asuperior", "bsuperior", "centsuperior", "dsuperior", "esuperior", "isuperior", "lsuperior",
    "msuperior", "nsuperior", "osuperior", "rsuperior", "ssuperior", "tsuperior", "ff", "ffi",
    "ffl", "parenleftinferior", "parenrightinferior", "Circumflexsmall", "hyphensuperior",
    "Gravesmall", "Asmall", "Bsmall", "Csmall", "Dsmall", "Esmall", "Fsmall", "Gsmall", "Hsmall",
    "Ismall", "Jsmall", "Ksmall", "Lsmall", "Msmall", "Nsmall", "Osmall", "Psmall", "Qsmall",
    "Rsmall", "Ssmall", "Tsmall", "Usmall", "Vsmall", "Wsmall", "Xsmall", "Ysmall", "Zsmall",
    "colonmonetary", "onefitted", "rupiah", "Tildesmall", "exclamdownsmall", "centoldstyle",
    "Lslashsmall", "Scaronsmall", "Zcaronsmall", "Dieresissmall", "Brevesmall", "Caronsmall",
    "Dotaccentsmall", "Macronsmall", "figuredash", "hypheninferior", "Ogoneksmall", "Ringsmall",
    "Cedillasmall", "questiondownsmall", "oneeighth", "threeeighths", "fiveeighths",
    "seveneighths", "onethird", "twothirds", "zerosuperior", "foursuperior", "fivesuperior",
    "sixsuperior", "sevensuperior", "eightsuperior", "ninesuperior", "zeroinferior", "oneinferior",
    "twoinferior", "threeinferior", "fourinferior", "fiveinferior", "sixinferior", "seveninferior",
    "eightinferior", "nineinferior", "centinferior", "dollarinferior", "periodinferior",
    "commainferior", "Agravesmall", "Aacutesmall", "Acircumflexsmall", "Atildesmall",
    "Adieresissmall", "Aringsmall", "AEsmall", "Ccedillasmall", "Egravesmall", "Eacutesmall",
    "Ecircumflexsmall", "Edieresissmall", "Igravesmall", "Iacutesmall", "Icircumflexsmall",
    "Idieresissmall", "Ethsmall", "Ntildesmall", "Ogravesmall", "Oacutesmall", "Ocircumflexsmall",
    "Otildesmall", "Odieresissmall", "OEsmall", "Oslashsmall", "Ugravesmall", "Uacutesmall",
    "Ucircumflexsmall", "Udieresissmall", "Yacutesmall", "Thornsmall", "Ydieresissmall", "001.000",
    "001.001", "001.002", "001.003", "Black", "Bold", "Book", "Light", "Medium", "Regular",
    "Roman", "Semibold",
];
