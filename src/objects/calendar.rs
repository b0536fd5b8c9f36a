//! vCalendar entries.
//!
//! Entries travel as vCalendar 1.0 text in the phone's dialect. Reads are a
//! location scan: the phone offers no "list" operation, so the engine probes
//! increasing slots until one answers or the scan bound is exceeded. The
//! last probed slot is cached on the engine so successive calls continue
//! where the previous one stopped.

use chrono::{Local, NaiveDateTime};
use log::debug;

use crate::at::engine::AtEngine;
use crate::at::reply::ReplyClass;
use crate::error::LinkError;
use crate::objects::{read_command, wire_location};
use crate::sbn::frame::extract_frame;
use crate::transport::AtTransport;

pub(crate) const CALENDAR_TAG: &str = "vcs";

/// Highest slot a scan will probe. Preserved from the original driver as a
/// plain bound; nothing device-specific is inferred from it.
pub const MAX_CALENDAR_LOCATION: u32 = 50;

const DTSTART_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Entry category, mapped to the `CATEGORIES` property on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Meeting,
    Call,
    Anniversary,
    Memo,
}

impl CalendarKind {
    fn category(self) -> &'static str {
        match self {
            CalendarKind::Meeting => "MEETING",
            CalendarKind::Call => "PHONE CALL",
            CalendarKind::Anniversary => "ANNIVERSARY",
            CalendarKind::Memo => "MISCELLANEOUS",
        }
    }

    fn from_category(value: &str) -> CalendarKind {
        let v = value.to_ascii_uppercase();
        if v.contains("MEETING") {
            CalendarKind::Meeting
        } else if v.contains("CALL") {
            CalendarKind::Call
        } else if v.contains("ANNIVERSARY") || v.contains("SPECIAL") {
            CalendarKind::Anniversary
        } else {
            CalendarKind::Memo
        }
    }
}

/// One calendar note in a numbered slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub location: u32,
    pub kind: CalendarKind,
    pub start: NaiveDateTime,
    pub text: String,
}

impl CalendarEntry {
    /// Whether the entry's start time is already behind the local clock.
    pub fn is_past(&self) -> bool {
        self.start < Local::now().naive_local()
    }
}

/// Render `entry` as vCalendar 1.0 text.
pub fn encode_vcalendar(entry: &CalendarEntry) -> Vec<u8> {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:1.0\r\nBEGIN:VEVENT\r\nCATEGORIES:{}\r\nDTSTART:{}\r\nDESCRIPTION:{}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        entry.kind.category(),
        entry.start.format(DTSTART_FORMAT),
        entry.text
    )
    .into_bytes()
}

/// Parse vCalendar text into (kind, start, text). Tolerant of bare-LF line
/// endings and property parameters; strict about DTSTART being present.
pub fn decode_vcalendar(data: &[u8]) -> Result<(CalendarKind, NaiveDateTime, String), LinkError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| LinkError::failure("calendar entry is not valid text"))?;
    let mut kind = CalendarKind::Memo;
    let mut start = None;
    let mut description = String::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        // Property parameters (DTSTART;TZID=... etc.) hang off the key.
        let base_key = key.split(';').next().unwrap_or(key).to_ascii_uppercase();
        match base_key.as_str() {
            "CATEGORIES" => kind = CalendarKind::from_category(value),
            "DTSTART" => {
                let v = value.trim().trim_end_matches('Z');
                start = Some(
                    NaiveDateTime::parse_from_str(v, DTSTART_FORMAT)
                        .map_err(|_| LinkError::failure("unparseable DTSTART"))?,
                );
            }
            "DESCRIPTION" | "SUMMARY" => {
                if description.is_empty() {
                    description = value.to_string();
                }
            }
            _ => {}
        }
    }
    let start = start.ok_or_else(|| LinkError::failure("calendar entry without DTSTART"))?;
    Ok((kind, start, description))
}

impl<T: AtTransport> AtEngine<T> {
    /// Return the next occupied calendar slot at or after the scan position.
    ///
    /// `start = Some(loc)` resets the scan base to `loc` (0 starts from the
    /// beginning); `None` continues from where the previous call stopped.
    /// `Empty` signals the end of the sequence, not a fault. A probe the
    /// phone rejects outright ends the scan as `InvalidLocation`, leaving
    /// the cached position where it was.
    pub async fn next_calendar_entry(
        &mut self,
        start: Option<u32>,
    ) -> Result<CalendarEntry, LinkError> {
        if let Some(base) = start {
            self.set_calendar_scan_pos(base);
        }
        let mut location = self.calendar_scan_pos();
        loop {
            location += 1;
            let cmd = read_command(CALENDAR_TAG, wire_location(location));
            let reply = self.send_command(&cmd).await?;
            let extracted = match reply.class() {
                ReplyClass::Ok => extract_frame(&reply, CALENDAR_TAG),
                ReplyClass::Error => Err(LinkError::InvalidLocation),
                ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
                ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
            };
            match extracted {
                Err(LinkError::Empty) => {
                    self.set_calendar_scan_pos(location);
                    if location > MAX_CALENDAR_LOCATION {
                        return Err(LinkError::Empty);
                    }
                    // vacant slot, keep probing
                }
                Err(_) => return Err(LinkError::InvalidLocation),
                Ok(data) => {
                    self.set_calendar_scan_pos(location);
                    if location > MAX_CALENDAR_LOCATION {
                        return Err(LinkError::Empty);
                    }
                    // An undecodable slot is a failed probe like any other.
                    let (kind, start, text) =
                        decode_vcalendar(&data).map_err(|_| LinkError::InvalidLocation)?;
                    debug!("calendar entry found at location {}", location);
                    return Ok(CalendarEntry {
                        location,
                        kind,
                        start,
                        text,
                    });
                }
            }
        }
    }

    /// Store `entry` at its own location (1-based; 0 is rejected).
    ///
    /// Past-dated entries are silently skipped with success unless `force`
    /// is set: the phone refuses them, and skipping is the documented
    /// behavior, not a failure.
    pub async fn add_calendar_entry(
        &mut self,
        entry: &CalendarEntry,
        force: bool,
    ) -> Result<(), LinkError> {
        if entry.location == 0 {
            return Err(LinkError::InvalidLocation);
        }
        if !force && entry.is_past() {
            debug!("skipping past-dated calendar entry for location {}", entry.location);
            return Ok(());
        }
        let payload = encode_vcalendar(entry);
        self.send_frame(&payload, CALENDAR_TAG, wire_location(entry.location))
            .await
    }

    /// Delete the entry at `location` (1-based).
    pub async fn delete_calendar_entry(&mut self, location: u32) -> Result<(), LinkError> {
        if location == 0 || location > MAX_CALENDAR_LOCATION {
            return Err(LinkError::InvalidLocation);
        }
        let cmd = format!("AT^SBNW=\"{}\",{},0\r", CALENDAR_TAG, wire_location(location));
        let reply = self.send_command(cmd.as_bytes()).await?;
        match reply.class() {
            ReplyClass::Ok => {
                debug!("calendar entry at location {} deleted", location);
                Ok(())
            }
            ReplyClass::Error => Err(LinkError::failure("device refused to delete entry")),
            ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
            ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(y: i32) -> CalendarEntry {
        CalendarEntry {
            location: 4,
            kind: CalendarKind::Meeting,
            start: NaiveDate::from_ymd_opt(y, 6, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            text: "Dentist".to_string(),
        }
    }

    #[test]
    fn vcalendar_round_trip() {
        let e = entry(2031);
        let encoded = encode_vcalendar(&e);
        let (kind, start, text) = decode_vcalendar(&encoded).unwrap();
        assert_eq!(kind, CalendarKind::Meeting);
        assert_eq!(start, e.start);
        assert_eq!(text, "Dentist");
    }

    #[test]
    fn dtstart_with_parameters_still_parses() {
        let raw = b"BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART;TZID=UTC:20310615T093000Z\nSUMMARY:x\nEND:VEVENT\nEND:VCALENDAR\n";
        let (_, start, text) = decode_vcalendar(raw).unwrap();
        assert_eq!(start, entry(2031).start);
        assert_eq!(text, "x");
    }

    #[test]
    fn missing_dtstart_is_rejected() {
        assert!(decode_vcalendar(b"BEGIN:VCALENDAR\nDESCRIPTION:x\nEND:VCALENDAR\n").is_err());
    }

    #[test]
    fn past_detection_uses_local_clock() {
        assert!(entry(1999).is_past());
        assert!(!entry(2099).is_past());
    }

    #[test]
    fn category_mapping_is_lenient() {
        assert_eq!(CalendarKind::from_category("Phone Call"), CalendarKind::Call);
        assert_eq!(CalendarKind::from_category("whatever"), CalendarKind::Memo);
    }
}
