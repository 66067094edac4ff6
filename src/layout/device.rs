use crate::{VeroTypeError, buffer::VeroBufReader, tables::TableEncodingError};

/// Per-size hinting adjustments, or a reference into a variation store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTable {
    Device {
        start_size: u16,
        end_size: u16,
        /// One delta per ppem in `start_size..=end_size`
        deltas: Vec<i8>,
    },
    VariationIndex {
        outer: u16,
        inner: u16,
    },
}

const VARIATION_INDEX_FORMAT: u16 = 0x8000;

impl DeviceTable {
    pub fn read(reader: &mut VeroBufReader<'_>, base: usize) -> Result<Self, VeroTypeError> {
        reader.seek_to(base)?;
        let first = reader.read_u16()?;
        let second = reader.read_u16()?;
        let format = reader.read_u16()?;

        // delta bits per value, by format
        let bits = match format {
            1 => 2,
            2 => 4,
            3 => 8,
            VARIATION_INDEX_FORMAT => {
                return Ok(Self::VariationIndex {
                    outer: first,
                    inner: second,
                });
            }
            _ => {
                return Err(TableEncodingError::UnsupportedSubtableFormat {
                    kind: "device table",
                    format,
                }
                .into());
            }
        };

        let (start_size, end_size) = (first, second);
        let count = usize::from(end_size.saturating_add(1).saturating_sub(start_size));
        let words = reader.read_array::<u16>((count * bits).div_ceil(16))?;

        let deltas = (0..count)
            .map(|i| {
                let bit = i * bits;
                let word = words[bit / 16];
                let shift = 16 - bits - bit % 16;
                let raw = (word >> shift) & ((1 << bits) - 1);
                // sign-extend the packed value
                ((raw << (16 - bits)) as i16 >> (16 - bits)) as i8
            })
            .collect();

        Ok(Self::Device {
            start_size,
            end_size,
            deltas,
        })
    }

    /// Adjustment in pixels at `ppem`; zero outside the covered sizes and
    /// for variation indices
    pub fn delta(&self, ppem: u16) -> i16 {
        match self {
            Self::Device {
                start_size, deltas, ..
            } => ppem
                .checked_sub(*start_size)
                .and_then(|i| deltas.get(usize::from(i)))
                .map_or(0, |&d| i16::from(d)),
            Self::VariationIndex { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_bit_deltas() {
        // sizes 11..=15, deltas 1, -1, 0, -2, 1 packed as 01 11 00 10 | 01
        let data = [0, 11, 0, 15, 0, 1, 0b0111_0010, 0b0100_0000];
        let device = DeviceTable::read(&mut VeroBufReader::new(&data), 0).unwrap();

        let got: Vec<_> = (10..=16).map(|ppem| device.delta(ppem)).collect();
        assert_eq!(got, vec![0, 1, -1, 0, -2, 1, 0]);
    }

    #[test]
    fn four_bit_deltas() {
        // sizes 9..=10, deltas 7, -8
        let data = [0, 9, 0, 10, 0, 2, 0x78, 0x00];
        let device = DeviceTable::read(&mut VeroBufReader::new(&data), 0).unwrap();

        assert_eq!(device.delta(9), 7);
        assert_eq!(device.delta(10), -8);
    }

    #[test]
    fn variation_index() {
        let data = [0, 1, 0, 2, 0x80, 0x00];
        let device = DeviceTable::read(&mut VeroBufReader::new(&data), 0).unwrap();

        assert_eq!(device, DeviceTable::VariationIndex { outer: 1, inner: 2 });
        assert_eq!(device.delta(12), 0);
    }
}
