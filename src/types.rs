//! Scalar types shared by every table.

use std::fmt;

/// A glyph index into the font's glyph set
pub type GlyphId = u16;

/// A 4-byte table or feature identifier such as `cmap` or `liga`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const HEAD: Tag = Tag(*b"head");
    pub const MAXP: Tag = Tag(*b"maxp");
    pub const HHEA: Tag = Tag(*b"hhea");
    pub const HMTX: Tag = Tag(*b"hmtx");
    pub const LOCA: Tag = Tag(*b"loca");
    pub const GLYF: Tag = Tag(*b"glyf");
    pub const CMAP: Tag = Tag(*b"cmap");
    pub const POST: Tag = Tag(*b"post");
    pub const OS2: Tag = Tag(*b"OS/2");
    pub const NAME: Tag = Tag(*b"name");
    pub const KERN: Tag = Tag(*b"kern");
    pub const HDMX: Tag = Tag(*b"hdmx");
    pub const LTSH: Tag = Tag(*b"LTSH");
    pub const PCLT: Tag = Tag(*b"PCLT");
    pub const DSIG: Tag = Tag(*b"DSIG");
    pub const FFTM: Tag = Tag(*b"FFTM");
    pub const META: Tag = Tag(*b"meta");
    pub const GDEF: Tag = Tag(*b"GDEF");
    pub const GSUB: Tag = Tag(*b"GSUB");
    pub const GPOS: Tag = Tag(*b"GPOS");
    pub const JSTF: Tag = Tag(*b"JSTF");
    pub const CFF: Tag = Tag(*b"CFF ");
    pub const FPGM: Tag = Tag(*b"fpgm");
    pub const PREP: Tag = Tag(*b"prep");
    pub const CVT: Tag = Tag(*b"cvt ");

    pub const fn new(tag: [u8; 4]) -> Self {
        Self(tag)
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

/// 16.16 signed fixed-point number
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Fixed(i32);

impl Fixed {
    pub const ONE: Fixed = Fixed(0x10000);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 65536.0
    }
}

/// 2.14 signed fixed-point number
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct F2Dot14(i16);

impl F2Dot14 {
    pub const fn from_bits(bits: i16) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i16 {
        self.0
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 16384.0
    }
}

/// Seconds since 1904-01-01 00:00 UTC
pub type LongDateTime = i64;
