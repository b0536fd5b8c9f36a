//! Structured records and the public device operations built on the chunked
//! transfer layer: operator-logo bitmaps, MIDI ringtones, vCalendar entries,
//! and vCard phonebook records.
//!
//! Storage locations are 1-based in this API and 0-based on the wire; the
//! translation happens exactly once, at command-format time, via
//! [`wire_location`]. A public location of 0 is normalized to 1 first, so a
//! wire location can never underflow.

pub mod bitmap;
pub mod calendar;
pub mod phonebook;
pub mod ringtone;

pub use bitmap::{Bitmap, BitmapKind};
pub use calendar::{CalendarEntry, CalendarKind, MAX_CALENDAR_LOCATION};
pub use phonebook::PhonebookEntry;
pub use ringtone::Ringtone;

/// Translate a public 1-based storage location to its 0-based wire form.
pub(crate) fn wire_location(location: u32) -> u32 {
    location.max(1) - 1
}

/// Format the read command for `tag` at an already-translated location.
pub(crate) fn read_command(tag: &str, wire_location: u32) -> Vec<u8> {
    format!("AT^SBNR=\"{}\",{}\r", tag, wire_location).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::{read_command, wire_location};

    #[test]
    fn public_one_is_wire_zero() {
        assert_eq!(wire_location(1), 0);
        assert_eq!(wire_location(2), 1);
    }

    #[test]
    fn public_zero_normalizes_to_one_first() {
        assert_eq!(wire_location(0), 0);
    }

    #[test]
    fn read_command_format() {
        assert_eq!(read_command("bmp", 0), b"AT^SBNR=\"bmp\",0\r".to_vec());
    }
}
