use thiserror::Error;

use crate::types::{F2Dot14, Fixed, Tag};

macro_rules! impl_read {
    ($fn_name:ident, $typ:ty) => {
        pub fn $fn_name(&mut self) -> Result<$typ, VeroBufReaderError> {
            let bytes = self.take(size_of::<$typ>())?;
            let mut buf = [0u8; size_of::<$typ>()];
            buf.copy_from_slice(bytes);

            Ok(<$typ>::from_be_bytes(buf))
        }
    };
}

/// Represents the possible errors that can occur when using `VeroBufReader`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VeroBufReaderError {
    /// A read needed more bytes than the buffer holds past the cursor.
    #[error("unexpected end of data: needed {needed} bytes at position {position}, buffer holds {len}")]
    UnexpectedEndOfData {
        position: usize,
        needed: usize,
        len: usize,
    },

    /// An embedded offset, resolved against its parent's base position,
    /// points outside the buffer.
    #[error("offset {offset} from base {base} falls outside the {len} byte buffer")]
    MalformedOffset {
        base: usize,
        offset: usize,
        len: usize,
    },
}

/// A big-endian cursor over a fixed byte buffer.
///
/// Positions are absolute indices into the wrapped slice. Offsets stored
/// inside font structures are relative to the structure that holds them and
/// must go through [`VeroBufReader::resolve`] (or
/// [`VeroBufReader::seek_relative`]) before they can be used as a position.
#[derive(Clone)]
pub struct VeroBufReader<'a> {
    inner: &'a [u8],
    position: usize,
}

impl std::fmt::Debug for VeroBufReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeroBufReader")
            .field("position", &self.position)
            .field("buffer", &format!("[ {} bytes ]", self.inner.len()))
            .finish()
    }
}

impl<'a> VeroBufReader<'a> {
    /// Returns a new reader positioned at the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            inner: buffer,
            position: 0,
        }
    }

    /// The whole underlying buffer, independent of the cursor
    pub fn data(&self) -> &'a [u8] {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The current absolute position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.inner.len().saturating_sub(self.position)
    }

    /// Seeks to an absolute position in the buffer
    ///
    /// # Examples
    ///
    /// ```
    /// use vero_type::buffer::VeroBufReader;
    ///
    /// let data = [0, 0, 0, 10, 0, 0, 0, 20];
    /// let mut reader = VeroBufReader::new(&data);
    ///
    /// reader.seek_to(4).unwrap();
    /// assert_eq!(reader.read_u32().unwrap(), 20);
    /// ```
    pub fn seek_to(&mut self, pos: usize) -> Result<(), VeroBufReaderError> {
        if pos > self.inner.len() {
            return Err(VeroBufReaderError::UnexpectedEndOfData {
                position: pos,
                needed: 0,
                len: self.inner.len(),
            });
        }
        self.position = pos;

        Ok(())
    }

    /// Skips n bytes from the CURRENT cursor position
    ///
    /// # Examples
    ///
    /// ```
    /// use vero_type::buffer::VeroBufReader;
    ///
    /// let data = [0, 0, 0, 10, 0, 0, 0, 20];
    /// let mut reader = VeroBufReader::new(&data);
    ///
    /// assert_eq!(reader.read_u32().unwrap(), 10);
    /// reader.skip(4).unwrap();
    ///
    /// // nothing left to read
    /// assert!(reader.read_u32().is_err());
    /// ```
    pub fn skip(&mut self, n: usize) -> Result<(), VeroBufReaderError> {
        self.ensure(n)?;
        self.position += n;

        Ok(())
    }

    /// Turns an offset stored inside a structure into an absolute position.
    ///
    /// `base` is the absolute position of the structure the offset belongs
    /// to. The resolved position must lie inside the buffer.
    pub fn resolve(&self, base: usize, offset: usize) -> Result<usize, VeroBufReaderError> {
        match base.checked_add(offset) {
            Some(pos) if pos < self.inner.len() => Ok(pos),
            _ => Err(VeroBufReaderError::MalformedOffset {
                base,
                offset,
                len: self.inner.len(),
            }),
        }
    }

    /// [`resolve`](Self::resolve) followed by a seek to the result
    pub fn seek_relative(&mut self, base: usize, offset: usize) -> Result<(), VeroBufReaderError> {
        self.position = self.resolve(base, offset)?;

        Ok(())
    }

    /// Checks that `count` elements of `elem_size` bytes are available past
    /// the cursor. Called before allocating for any count read from the
    /// stream.
    pub fn check_remaining(&self, count: usize, elem_size: usize) -> Result<(), VeroBufReaderError> {
        self.ensure(count.saturating_mul(elem_size))
    }

    fn ensure(&self, needed: usize) -> Result<(), VeroBufReaderError> {
        if needed > self.remaining() {
            return Err(VeroBufReaderError::UnexpectedEndOfData {
                position: self.position,
                needed,
                len: self.inner.len(),
            });
        }

        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], VeroBufReaderError> {
        self.ensure(n)?;
        let bytes = &self.inner[self.position..self.position + n];
        self.position += n;

        Ok(bytes)
    }

    impl_read!(read_u8, u8);
    impl_read!(read_i8, i8);
    impl_read!(read_u16, u16);
    impl_read!(read_i16, i16);
    impl_read!(read_u32, u32);
    impl_read!(read_i32, i32);
    impl_read!(read_u64, u64);
    impl_read!(read_i64, i64);

    /// Reads a 24-bit unsigned integer
    pub fn read_u24(&mut self) -> Result<u32, VeroBufReaderError> {
        let b = self.take(3)?;

        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Reads a 16.16 fixed-point number
    pub fn read_fixed(&mut self) -> Result<Fixed, VeroBufReaderError> {
        Ok(Fixed::from_bits(self.read_i32()?))
    }

    /// Reads a 2.14 fixed-point number
    pub fn read_f2dot14(&mut self) -> Result<F2Dot14, VeroBufReaderError> {
        Ok(F2Dot14::from_bits(self.read_i16()?))
    }

    pub fn read_tag(&mut self) -> Result<Tag, VeroBufReaderError> {
        Ok(Tag::new(self.read_array_fixed::<4>()?))
    }

    /// Borrows the next `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], VeroBufReaderError> {
        self.take(n)
    }

    /// Reads exactly `N` bytes into an array
    pub fn read_array_fixed<const N: usize>(&mut self) -> Result<[u8; N], VeroBufReaderError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);

        Ok(buf)
    }

    /// Reads a length-prefixed (one byte) string, decoding each byte as a
    /// Latin-1 character
    pub fn read_pascal_string(&mut self) -> Result<String, VeroBufReaderError> {
        let len = usize::from(self.read_u8()?);

        Ok(self.take(len)?.iter().map(|&b| char::from(b)).collect())
    }

    /// Reads `count` consecutive big-endian values.
    ///
    /// The byte length is validated before allocating, so a corrupt count
    /// fails fast instead of reserving memory for it.
    pub fn read_array<T: ReadBe>(&mut self, count: usize) -> Result<Vec<T>, VeroBufReaderError> {
        self.check_remaining(count, T::SIZE)?;
        (0..count).map(|_| T::read_be(self)).collect()
    }
}

/// A fixed-width value that can be read from a [`VeroBufReader`]
pub trait ReadBe: Sized {
    const SIZE: usize;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError>;
}

macro_rules! impl_read_be {
    ($typ:ty, $fn_name:ident) => {
        impl ReadBe for $typ {
            const SIZE: usize = size_of::<$typ>();

            fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
                reader.$fn_name()
            }
        }
    };
}

impl_read_be!(u8, read_u8);
impl_read_be!(i8, read_i8);
impl_read_be!(u16, read_u16);
impl_read_be!(i16, read_i16);
impl_read_be!(u32, read_u32);
impl_read_be!(i32, read_i32);
impl_read_be!(u64, read_u64);
impl_read_be!(i64, read_i64);

impl ReadBe for Fixed {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        reader.read_fixed()
    }
}

impl ReadBe for F2Dot14 {
    const SIZE: usize = 2;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        reader.read_f2dot14()
    }
}

impl ReadBe for Tag {
    const SIZE: usize = 4;

    fn read_be(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroBufReaderError> {
        reader.read_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_regardless_of_host() {
        let data = [0x12, 0x34, 0xff, 0xfe, 0x00, 0x01, 0x00, 0x00];
        let mut reader = VeroBufReader::new(&data);

        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_fixed().unwrap().to_f32(), 1.0);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn read_past_end_is_unexpected_end_of_data() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = VeroBufReader::new(&data);
        reader.read_u16().unwrap();

        assert_eq!(
            reader.read_u16(),
            Err(VeroBufReaderError::UnexpectedEndOfData {
                position: 2,
                needed: 2,
                len: 3
            })
        );
        // a failed read does not move the cursor
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn offsets_resolve_against_their_base() {
        let data = [0u8; 16];
        let reader = VeroBufReader::new(&data);

        assert_eq!(reader.resolve(8, 4), Ok(12));
        assert!(matches!(
            reader.resolve(8, 8),
            Err(VeroBufReaderError::MalformedOffset { base: 8, offset: 8, .. })
        ));
    }

    #[test]
    fn array_count_is_checked_before_allocation() {
        let data = [0u8; 6];
        let mut reader = VeroBufReader::new(&data);

        assert!(reader.read_array::<u16>(u16::MAX as usize).is_err());
        assert_eq!(reader.read_array::<u16>(3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn fixed_point_formats() {
        // 1.5 in 2.14 is 0x6000, -2.0 is 0x8000
        let data = [0x60, 0x00, 0x80, 0x00, 0x00, 0x02, 0x80, 0x00];
        let mut reader = VeroBufReader::new(&data);

        assert_eq!(reader.read_f2dot14().unwrap().to_f32(), 1.5);
        assert_eq!(reader.read_f2dot14().unwrap().to_f32(), -2.0);
        assert_eq!(reader.read_fixed().unwrap().to_f32(), 2.5);
    }

    #[test]
    fn pascal_strings() {
        let data = [3, b'f', b'o', b'o', 0];
        let mut reader = VeroBufReader::new(&data);

        assert_eq!(reader.read_pascal_string().unwrap(), "foo");
        assert_eq!(reader.read_pascal_string().unwrap(), "");
    }
}
