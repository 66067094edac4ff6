//! GPOS value records

use bitflags::bitflags;

use super::DeviceTable;
use crate::{VeroTypeError, buffer::VeroBufReader, registry::ParseContext};

bitflags! {
    /// Which fields a [`ValueRecord`] stores
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueFormat: u16 {
        const X_PLACEMENT = 0x0001;
        const Y_PLACEMENT = 0x0002;
        const X_ADVANCE = 0x0004;
        const Y_ADVANCE = 0x0008;
        const X_PLACEMENT_DEVICE = 0x0010;
        const Y_PLACEMENT_DEVICE = 0x0020;
        const X_ADVANCE_DEVICE = 0x0040;
        const Y_ADVANCE_DEVICE = 0x0080;
    }
}

impl ValueFormat {
    /// Bytes taken by a record in this format
    pub fn record_size(self) -> usize {
        (self & Self::all()).bits().count_ones() as usize * 2
    }
}

/// A positioning adjustment. Fields absent from the format read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub format: ValueFormat,
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
    /// Raw device/variation-index offsets, relative to the structure holding
    /// the record
    pub x_placement_device_offset: u16,
    pub y_placement_device_offset: u16,
    pub x_advance_device_offset: u16,
    pub y_advance_device_offset: u16,
    /// Device tables resolved from the offsets, in the same order
    pub devices: [Option<DeviceTable>; 4],
}

impl ValueRecord {
    /// Reads the fields selected by `format` at the cursor, in canonical
    /// order. Unselected fields consume no bytes.
    pub fn read(reader: &mut VeroBufReader<'_>, format: ValueFormat) -> Result<Self, VeroTypeError> {
        let mut record = Self {
            format,
            ..Self::default()
        };

        let mut field = |flag: ValueFormat| -> Result<u16, VeroTypeError> {
            if format.contains(flag) {
                Ok(reader.read_u16()?)
            } else {
                Ok(0)
            }
        };

        record.x_placement = field(ValueFormat::X_PLACEMENT)? as i16;
        record.y_placement = field(ValueFormat::Y_PLACEMENT)? as i16;
        record.x_advance = field(ValueFormat::X_ADVANCE)? as i16;
        record.y_advance = field(ValueFormat::Y_ADVANCE)? as i16;
        record.x_placement_device_offset = field(ValueFormat::X_PLACEMENT_DEVICE)?;
        record.y_placement_device_offset = field(ValueFormat::Y_PLACEMENT_DEVICE)?;
        record.x_advance_device_offset = field(ValueFormat::X_ADVANCE_DEVICE)?;
        record.y_advance_device_offset = field(ValueFormat::Y_ADVANCE_DEVICE)?;

        Ok(record)
    }

    /// [`read`](Self::read), then resolves the device offsets against
    /// `parent`. A device table that fails to read is reported and left
    /// out; the cursor ends up right after the record either way.
    pub fn read_resolved(
        reader: &mut VeroBufReader<'_>,
        format: ValueFormat,
        parent: usize,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Self, VeroTypeError> {
        let mut record = Self::read(reader, format)?;
        if !format.intersects(
            ValueFormat::X_PLACEMENT_DEVICE
                | ValueFormat::Y_PLACEMENT_DEVICE
                | ValueFormat::X_ADVANCE_DEVICE
                | ValueFormat::Y_ADVANCE_DEVICE,
        ) {
            return Ok(record);
        }

        let end = reader.position();
        let offsets = [
            record.x_placement_device_offset,
            record.y_placement_device_offset,
            record.x_advance_device_offset,
            record.y_advance_device_offset,
        ];
        for (slot, offset) in record.devices.iter_mut().zip(offsets) {
            if offset == 0 {
                continue;
            }
            let result = reader
                .resolve(parent, usize::from(offset))
                .map_err(VeroTypeError::from)
                .and_then(|pos| DeviceTable::read(reader, pos));
            match result {
                Ok(device) => *slot = Some(device),
                Err(err) => ctx.report(err),
            }
        }
        reader.seek_to(end)?;

        Ok(record)
    }

    pub fn is_empty(&self) -> bool {
        self.format.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::Diagnostics, types::Tag};

    #[test]
    fn fields_read_in_canonical_order() {
        // format: YPlacement | XAdvance | YAdvanceDevice
        let format = ValueFormat::from_bits_retain(0x0002 | 0x0004 | 0x0080);
        let data = [0xff, 0xf6, 0x00, 0x64, 0x00, 0x00, 0xEE];
        let mut reader = VeroBufReader::new(&data);
        let record = ValueRecord::read(&mut reader, format).unwrap();

        assert_eq!(record.x_placement, 0);
        assert_eq!(record.y_placement, -10);
        assert_eq!(record.x_advance, 100);
        assert_eq!(record.y_advance, 0);
        assert_eq!(record.y_advance_device_offset, 0);
        // three fields, six bytes
        assert_eq!(reader.position(), 6);
        assert_eq!(format.record_size(), 6);
    }

    #[test]
    fn empty_format_consumes_nothing() {
        let mut reader = VeroBufReader::new(&[1, 2, 3]);
        let record = ValueRecord::read(&mut reader, ValueFormat::empty()).unwrap();

        assert!(record.is_empty());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn device_offsets_resolve_against_parent() {
        #[rustfmt::skip]
        let data = [
            0, 5, 0, 6,                 // XAdvance 5, XAdvDevice at parent+6
            0, 0,
            0, 12, 0, 12, 0, 3, 0x05, 0x00, // device: ppem 12, 8-bit, delta 5
        ];
        let format = ValueFormat::X_ADVANCE | ValueFormat::X_ADVANCE_DEVICE;
        let mut diagnostics = Diagnostics::default();
        let mut ctx = ParseContext::standalone(Tag::GPOS, &data, &mut diagnostics);
        let mut reader = ctx.reader();
        let record = ValueRecord::read_resolved(&mut reader, format, 0, &mut ctx).unwrap();

        assert_eq!(reader.position(), 4);
        assert_eq!(record.x_advance, 5);
        assert_eq!(record.devices[2].as_ref().unwrap().delta(12), 5);
        assert!(record.devices[0].is_none());
    }
}
